//! PDF emitter: styled HTML rendition of one message, handed to a renderer

use crate::error::{ConvertError, Result};
use crate::extract::extract_from_path;
use crate::headers::RawHeaders;
use crate::html;
use crate::naming::UniqueNames;
use crate::render::HtmlRenderer;
use crate::source::MessageOpener;
use crate::types::{AttachmentKind, NormalizedEmail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const UNKNOWN_SENDER: &str = "(Unknown Sender)";
pub const NO_RECIPIENT: &str = "(No Recipient)";
pub const NO_SUBJECT: &str = "(No Subject)";

const STYLESHEET: &str = r"
* { page: auto !important; }
@page { size: 8.5in 11in; margin: 0.5in; }
body { font-family: sans-serif; margin: 0; box-sizing: border-box; }
.meta-table { font-size: 0.9em; border-collapse: collapse; margin-bottom: 0.75em; width: 100%; table-layout: auto; break-after: avoid; }
.meta-table td { vertical-align: top; padding: 2px 6px 2px 0; }
.meta-label { font-weight: bold; white-space: nowrap; width: 1%; }
hr { border: none; border-top: 1px solid #ccc; margin: 6px 0 12px 0; break-inside: avoid; break-after: avoid; }
.email-body { display: block; position: relative; width: 100%; page-break-inside: auto; }
.email-normalized { width: 100%; margin: 0; padding: 0; }
.email-normalized * { max-width: 100% !important; box-sizing: border-box !important; overflow-wrap: break-word; }
.email-normalized table { width: 100% !important; }
.email-normalized img { height: auto; }
a { text-decoration: none; color: #0645ad; }
";

/// Header values shown in the metadata table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaHeaders {
    pub from: String,
    pub to: String,
    pub cc: String,
    pub reply_to: String,
    pub date: String,
    pub subject: String,
}

impl MetaHeaders {
    /// Prefer values from the stored header block, then the extracted
    /// fields, then the placeholders.
    #[must_use]
    pub fn resolve(email: &NormalizedEmail) -> Self {
        let raw = RawHeaders::parse(&email.raw_headers);
        let pick = |name: &str, fallback: String, placeholder: &str| {
            raw.get(name).map(str::to_string).unwrap_or_else(|| {
                if fallback.is_empty() {
                    placeholder.to_string()
                } else {
                    fallback
                }
            })
        };

        Self {
            from: pick("From", email.from_display(), UNKNOWN_SENDER),
            to: pick("To", email.to_joined(), NO_RECIPIENT),
            cc: pick("Cc", email.cc_joined(), ""),
            reply_to: pick("Reply-To", String::new(), ""),
            date: pick("Date", email.date_raw.clone(), ""),
            subject: pick("Subject", email.subject.clone(), NO_SUBJECT),
        }
    }
}

/// An attachment written next to the PDF and linked from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedFile {
    pub name: String,
    /// Path relative to the PDF's directory, `/`-separated
    pub href: String,
    pub size: u64,
}

impl LinkedFile {
    #[allow(clippy::cast_precision_loss)]
    fn to_html(&self) -> String {
        format!(
            "<a href='{}'>{}</a> ({:.1} KB)",
            html::escape(&self.href),
            html::escape(&self.name),
            self.size as f64 / 1024.0
        )
    }
}

/// Result of writing a message's attachments to disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedAttachments {
    /// `(original name, data URI)` for each inline image candidate
    pub inline: Vec<(String, String)>,
    /// Everything else, linked from the metadata table
    pub linked: Vec<LinkedFile>,
}

impl SavedAttachments {
    /// Comma-joined links, empty when nothing is linked
    #[must_use]
    pub fn summary(&self) -> String {
        self.linked
            .iter()
            .map(LinkedFile::to_html)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `<dir>/<stem>.attachments` for an output `<dir>/<stem>.pdf`
#[must_use]
pub fn attachments_dir(output: &Path) -> PathBuf {
    output.with_extension("attachments")
}

/// Build a `data:` URI for an image
#[must_use]
pub fn data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

fn href_escape(path: &str) -> String {
    path.replace('%', "%25")
        .replace(' ', "%20")
        .replace('#', "%23")
        .replace('?', "%3F")
}

/// Write every attachment into the sibling attachments directory and
/// classify it.
///
/// The directory is only created when there is at least one attachment.
/// Names repeated within the message get a ` (n)` suffix; files left by an
/// earlier run are overwritten.
pub fn save_attachments(email: &NormalizedEmail, output: &Path) -> Result<SavedAttachments> {
    let mut saved = SavedAttachments::default();
    if email.attachments.is_empty() {
        return Ok(saved);
    }

    let dir = attachments_dir(output);
    fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut names = UniqueNames::new();

    for attachment in &email.attachments {
        let mut file_name = sanitize_filename::sanitize(&attachment.name);
        if file_name.is_empty() {
            file_name = crate::types::Attachment::FALLBACK_NAME.to_string();
        }
        let written = names.claim(&file_name);
        let path = dir.join(&written);
        fs::write(&path, &attachment.data).map_err(|e| ConvertError::io(&path, e))?;
        debug!("Saved attachment {}", path.display());

        match attachment.kind {
            AttachmentKind::InlineImage(image) => {
                saved.inline.push((
                    attachment.name.clone(),
                    data_uri(image.mime_type(), &attachment.data),
                ));
            }
            AttachmentKind::External => {
                saved.linked.push(LinkedFile {
                    name: attachment.name.clone(),
                    href: href_escape(&format!("{dir_name}/{written}")),
                    size: attachment.data.len() as u64,
                });
            }
        }
    }

    Ok(saved)
}

/// Pick the body to render: HTML with inline images resolved, else escaped
/// RTF, else escaped plain text. Page CSS is removed in every case.
#[must_use]
pub fn render_body(email: &NormalizedEmail, inline: &[(String, String)]) -> String {
    let body = if let Some(source) = &email.body_html {
        let resolved = inline
            .iter()
            .fold(source.clone(), |acc, (name, uri)| html::replace_cid(&acc, name, uri));
        html::strip_wrapper_tags(&resolved)
    } else if let Some(rtf) = &email.body_rtf {
        html::escape(rtf)
    } else {
        html::escape(&email.body_text)
    };

    html::remove_page_rules(&body)
}

fn meta_row(label: &str, value_html: &str) -> String {
    format!("<tr><td class=\"meta-label\">{label}:</td><td>{value_html}</td></tr>\n")
}

/// Assemble the complete HTML document
#[must_use]
pub fn build_document(meta: &MetaHeaders, attachments_summary: &str, body: &str) -> String {
    let mut rows = String::new();
    rows.push_str(&meta_row("From", &html::escape(&meta.from)));
    rows.push_str(&meta_row("To", &html::escape(&meta.to)));
    if !meta.cc.is_empty() {
        rows.push_str(&meta_row("Cc", &html::escape(&meta.cc)));
    }
    if !meta.reply_to.is_empty() {
        rows.push_str(&meta_row("Reply-To", &html::escape(&meta.reply_to)));
    }
    if !meta.date.is_empty() {
        rows.push_str(&meta_row("Date", &html::escape(&meta.date)));
    }
    rows.push_str(&meta_row("Subject", &html::escape(&meta.subject)));
    if !attachments_summary.is_empty() {
        rows.push_str(&meta_row("Attachments", attachments_summary));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>{STYLESHEET}</style>\n</head>\n<body>\n\
         <table class=\"meta-table\">\n{rows}</table>\n<hr>\n\
         <div class=\"email-body\">\n<div class=\"email-normalized\">\n{body}\n</div>\n</div>\n\
         </body>\n</html>\n",
        title = html::escape(&meta.subject),
    )
}

/// Build the HTML for `email`, saving its attachments next to `output`
pub fn prepare_document(email: &NormalizedEmail, output: &Path) -> Result<String> {
    let saved = save_attachments(email, output)?;
    let meta = MetaHeaders::resolve(email);
    let body = render_body(email, &saved.inline);
    Ok(build_document(&meta, &saved.summary(), &body))
}

/// Render one normalized message to `output`
pub fn write_pdf(email: &NormalizedEmail, output: &Path, renderer: &dyn HtmlRenderer) -> Result<()> {
    let document = prepare_document(email, output)?;
    let base_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    renderer.render(&document, base_dir, output)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Open, extract and render one message file
pub fn convert_to_pdf(
    opener: &dyn MessageOpener,
    input: &Path,
    output: &Path,
    renderer: &dyn HtmlRenderer,
) -> Result<()> {
    let email = extract_from_path(opener, input)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
    }
    write_pdf(&email, output, renderer)
}
