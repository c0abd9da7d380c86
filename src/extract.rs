//! Field extraction: one parsed message in, one [`NormalizedEmail`] out

use crate::date::normalize_date;
use crate::error::Result;
use crate::recipients::resolve_recipients;
use crate::source::{MessageOpener, MessageSource, SourceAttachment};
use crate::types::{Attachment, NormalizedEmail, RecipientKind};
use std::path::Path;
use tracing::{debug, warn};

/// Open `path` with `opener` and extract it.
///
/// Failing to open the file is the only hard error; every field
/// afterwards falls back to its default.
pub fn extract_from_path(opener: &dyn MessageOpener, path: &Path) -> Result<NormalizedEmail> {
    let source = opener.open(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(extract(source.as_ref(), &file_name))
}

/// Build a normalized record from an already-opened message
pub fn extract(source: &dyn MessageSource, file_name: &str) -> NormalizedEmail {
    let date_raw = text(source.date());
    let attachments = extract_attachments(source);

    let email = NormalizedEmail {
        file_name: file_name.trim().to_string(),
        subject: text(source.subject()),
        from_name: text(source.sender_name()),
        from_email: text(source.sender_email()),
        to: resolve_recipients(source, RecipientKind::To),
        cc: resolve_recipients(source, RecipientKind::Cc),
        bcc: resolve_recipients(source, RecipientKind::Bcc),
        date_normalized: normalize_date(&date_raw),
        date_raw,
        body_text: text(source.body()),
        body_html: source
            .html_body()
            .map(|bytes| decode_lossy(&bytes))
            .filter(|html| !html.trim().is_empty()),
        body_rtf: source
            .rtf_body()
            .map(|rtf| rtf.trim().to_string())
            .filter(|rtf| !rtf.is_empty()),
        raw_headers: text(source.raw_headers()),
        attachments,
    };

    debug!(
        "Extracted {}: {:?} with {} attachments",
        email.file_name,
        email.subject,
        email.attachments.len()
    );
    email
}

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Permissive UTF-8 decoding: invalid sequences are dropped
fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{FFFD}', "")
}

/// Long filename, else short filename, else the fallback name
#[must_use]
pub fn attachment_name(att: &SourceAttachment) -> String {
    [&att.long_filename, &att.short_filename]
        .into_iter()
        .flatten()
        .map(|name| name.trim())
        .find(|name| !name.is_empty())
        .unwrap_or(Attachment::FALLBACK_NAME)
        .to_string()
}

fn extract_attachments(source: &dyn MessageSource) -> Vec<Attachment> {
    match source.attachments() {
        Ok(list) => list
            .into_iter()
            .map(|att| Attachment::new(attachment_name(&att), att.data))
            .collect(),
        Err(e) => {
            warn!("Attachments unavailable: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryMessage, SourceRecipient};

    #[test]
    fn test_attachment_name_priority() {
        let both = SourceAttachment {
            long_filename: Some("Quarterly Report.docx".into()),
            short_filename: Some("QUARTE~1.DOC".into()),
            data: vec![],
        };
        assert_eq!(attachment_name(&both), "Quarterly Report.docx");

        let short_only = SourceAttachment {
            long_filename: Some("  ".into()),
            short_filename: Some("QUARTE~1.DOC".into()),
            data: vec![],
        };
        assert_eq!(attachment_name(&short_only), "QUARTE~1.DOC");

        assert_eq!(attachment_name(&SourceAttachment::default()), "attachment");
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let email = extract(&MemoryMessage::default(), "empty.msg");

        assert_eq!(email.file_name, "empty.msg");
        assert_eq!(email.subject, "");
        assert_eq!(email.from_name, "");
        assert!(email.to.is_empty());
        assert_eq!(email.date_normalized, "");
        assert!(email.body_html.is_none());
        assert!(email.body_rtf.is_none());
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn test_fields_are_trimmed() {
        let msg = MemoryMessage {
            subject: Some("  Weekly sync \n".into()),
            sender_name: Some(" Alice ".into()),
            sender_email: Some("alice@example.com ".into()),
            body: Some("\nHello\n".into()),
            ..MemoryMessage::default()
        };
        let email = extract(&msg, "sync.msg");

        assert_eq!(email.subject, "Weekly sync");
        assert_eq!(email.from_display(), "Alice <alice@example.com>");
        assert_eq!(email.body_text, "Hello");
    }

    #[test]
    fn test_html_body_decoded_permissively() {
        let msg = MemoryMessage {
            html_body: Some("<p>caf\u{e9}</p>".into()),
            ..MemoryMessage::default()
        };
        let email = extract(&msg, "html.msg");
        assert_eq!(email.body_html.as_deref(), Some("<p>caf\u{e9}</p>"));

        assert_eq!(decode_lossy(b"ok\xff!"), "ok!");
    }

    #[test]
    fn test_attachments_keep_source_order() {
        let msg = MemoryMessage {
            attachments: vec![
                SourceAttachment {
                    long_filename: Some("b.png".into()),
                    data: vec![1, 2, 3],
                    ..SourceAttachment::default()
                },
                SourceAttachment {
                    long_filename: Some("a.txt".into()),
                    data: vec![4],
                    ..SourceAttachment::default()
                },
            ],
            ..MemoryMessage::default()
        };
        let email = extract(&msg, "order.msg");

        assert_eq!(email.attachment_names(), vec!["b.png", "a.txt"]);
        assert!(email.attachments[0].is_inline_image());
        assert_eq!(email.attachments[0].size, 3);
        assert!(!email.attachments[1].is_inline_image());
    }

    #[test]
    fn test_recipients_by_role() {
        let msg = MemoryMessage {
            recipients: Some(vec![
                SourceRecipient {
                    role: "To".into(),
                    name: "Alice".into(),
                    email: "alice@x.com".into(),
                },
                SourceRecipient {
                    role: "Cc".into(),
                    name: "Bob".into(),
                    email: String::new(),
                },
            ]),
            bcc: Some("Carol <carol@x.com>".into()),
            ..MemoryMessage::default()
        };
        let email = extract(&msg, "r.msg");

        assert_eq!(email.to_joined(), "Alice <alice@x.com>");
        assert_eq!(email.cc_joined(), "Bob");
        assert_eq!(email.bcc_joined(), "Carol <carol@x.com>");
    }
}
