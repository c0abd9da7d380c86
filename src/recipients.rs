//! Recipient resolution: structured lists first, flat strings second

use crate::source::MessageSource;
use crate::types::{RecipientKind, format_mailbox};
use tracing::warn;

/// Resolve the recipients of one role as display strings.
///
/// Entries come from the structured recipient list when it yields at least
/// one match for `kind`. Otherwise the flat field for the role is used as a
/// single entry, and an unset flat field gives no entries.
pub fn resolve_recipients(source: &dyn MessageSource, kind: RecipientKind) -> Vec<String> {
    let structured: Vec<String> = match source.recipients() {
        Ok(Some(list)) => list
            .iter()
            .filter(|r| kind.matches(&r.role))
            .map(|r| format_mailbox(&r.name, &r.email))
            .filter(|s| !s.is_empty())
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Structured recipients unavailable for {kind}: {e}");
            Vec::new()
        }
    };

    if !structured.is_empty() {
        return structured;
    }

    source
        .flat_recipients(kind.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .into_iter()
        .collect()
}

/// Resolve the recipients of one role joined with `", "`
pub fn resolve_joined(source: &dyn MessageSource, kind: RecipientKind) -> String {
    resolve_recipients(source, kind).join(", ")
}
