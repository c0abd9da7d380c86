//! EML emitter: one normalized message serialized as RFC 5322 / MIME

use crate::date::mime_date;
use crate::error::{ConvertError, Result};
use crate::extract::extract_from_path;
use crate::headers::RawHeaders;
use crate::source::MessageOpener;
use crate::types::{Attachment, NormalizedEmail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as AttachmentPart, MultiPart, SinglePart};
use mailparse::{MailAddr, SingleInfo};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

const CRLF: &str = "\r\n";
const MAX_LINE: usize = 998;
/// Bytes of UTF-8 per encoded word, keeping each word under 75 chars
const WORD_CHUNK: usize = 45;

/// Characters that force a display name into a quoted string
const PHRASE_SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

static OCTET_STREAM: LazyLock<ContentType> =
    LazyLock::new(|| ContentType::parse("application/octet-stream").unwrap());

/// Serialize `email` as a MIME message
#[must_use]
pub fn build_message(email: &NormalizedEmail) -> Vec<u8> {
    let mut out = String::new();

    push_header(&mut out, "Subject", &encode_unstructured(&email.subject));
    push_header(
        &mut out,
        "From",
        &format_mailbox(&email.from_name, &email.from_email),
    );
    push_header(&mut out, "To", &format_entries(&email.to));
    if !email.cc.is_empty() {
        push_header(&mut out, "Cc", &format_entries(&email.cc));
    }

    let raw = RawHeaders::parse(&email.raw_headers);
    if let Some(reply_to) = raw.get("Reply-To") {
        push_header(&mut out, "Reply-To", &encode_address_list(reply_to));
    }

    if !email.date_raw.is_empty() {
        push_header(&mut out, "Date", &encode_unstructured(&mime_date(&email.date_raw)));
    }
    push_header(&mut out, "MIME-Version", "1.0");

    let mut message = out.into_bytes();
    message.extend(mime_body(&email.body_text, &email.attachments));

    debug!(
        "Built MIME message for {} ({} bytes)",
        email.file_name,
        message.len()
    );
    message
}

/// Body part headers and content: a text part, or multipart/mixed when
/// there are attachments
fn mime_body(body_text: &str, attachments: &[Attachment]) -> Vec<u8> {
    let text = SinglePart::plain(body_text.replace("\r\n", "\n"));
    let Some((first, rest)) = attachments.split_first() else {
        return text.formatted();
    };

    let mut mixed = MultiPart::mixed()
        .singlepart(text)
        .singlepart(attachment_part(first));
    for attachment in rest {
        mixed = mixed.singlepart(attachment_part(attachment));
    }
    mixed.formatted()
}

fn attachment_part(attachment: &Attachment) -> SinglePart {
    AttachmentPart::new(single_line(&attachment.name))
        .body(attachment.data.clone(), OCTET_STREAM.clone())
}

/// Serialize `email` and write it to `path`
pub fn write_eml(email: &NormalizedEmail, path: &Path) -> Result<()> {
    fs::write(path, build_message(email)).map_err(|e| ConvertError::io(path, e))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Open, extract and write one message file as EML
pub fn convert_to_eml(opener: &dyn MessageOpener, input: &Path, output: &Path) -> Result<()> {
    let email = extract_from_path(opener, input)?;
    write_eml(&email, output)
}

fn push_header(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, "{name}: {value}{CRLF}");
}

/// RFC 2047 encoded words, folded onto continuation lines
fn encode_words(text: &str) -> String {
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if chunk.len() + c.len_utf8() > WORD_CHUNK {
            words.push(std::mem::take(&mut chunk));
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(chunk);
    }

    words
        .iter()
        .map(|w| format!("=?utf-8?b?{}?=", STANDARD.encode(w.as_bytes())))
        .collect::<Vec<_>>()
        .join(&format!("{CRLF} "))
}

fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Free-text header value (Subject, fallback Date)
fn encode_unstructured(text: &str) -> String {
    let text = single_line(text);
    if text.is_ascii() && text.len() <= MAX_LINE - 80 {
        text
    } else {
        encode_words(&text)
    }
}

/// Display name, quoted or encoded as needed
fn encode_phrase(name: &str) -> String {
    let name = single_line(name);
    if !name.is_ascii() {
        encode_words(&name)
    } else if name.contains(PHRASE_SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name
    }
}

fn format_mailbox(name: &str, email: &str) -> String {
    let name = name.trim().trim_matches('"');
    let email = email.trim();
    match (name.is_empty(), email.is_empty()) {
        (_, true) => encode_phrase(name),
        (true, false) => email.to_string(),
        (false, false) => format!("{} <{email}>", encode_phrase(name)),
    }
}

/// Split a `Name <email>` display string; bare strings are names unless
/// they look like an address
fn split_entry(entry: &str) -> (&str, &str) {
    let entry = entry.trim();
    if let Some(inner) = entry.strip_suffix('>')
        && let Some(start) = inner.rfind('<')
    {
        return (inner[..start].trim(), inner[start + 1..].trim());
    }
    if entry.contains('@') && !entry.contains(char::is_whitespace) {
        ("", entry)
    } else {
        (entry, "")
    }
}

/// Split on `;` outside quoted strings and angle brackets
fn split_semicolons(entry: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut angle = false;
    let mut escaped = false;

    for (i, c) in entry.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '<' if !quoted => angle = true,
            '>' if !quoted => angle = false,
            ';' if !quoted && !angle => {
                parts.push(&entry[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&entry[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn format_single(info: &SingleInfo) -> String {
    format_mailbox(info.display_name.as_deref().unwrap_or(""), &info.addr)
}

fn format_addr(addr: &MailAddr) -> String {
    match addr {
        MailAddr::Single(info) => format_single(info),
        MailAddr::Group(group) => format!(
            "{}: {};",
            encode_phrase(&group.group_name),
            group
                .addrs
                .iter()
                .map(format_single)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Mailboxes of one recipient entry. An entry may hold several addresses
/// separated by `;` or `,`; a lone name with a comma stays one mailbox.
fn entry_mailboxes(entry: &str) -> Vec<String> {
    split_semicolons(entry)
        .into_iter()
        .flat_map(|part| {
            let (name, email) = split_entry(part);
            if !name.contains(['<', '>', '@']) {
                return vec![format_mailbox(name, email)];
            }
            match mailparse::addrparse(part) {
                Ok(list) => list.iter().map(format_addr).collect(),
                Err(_) => vec![format_mailbox(name, email)],
            }
        })
        .collect()
}

fn format_entries(entries: &[String]) -> String {
    entries
        .iter()
        .flat_map(|entry| entry_mailboxes(entry))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Address list taken from a stored header; only re-encoded when it has
/// non-ASCII text
fn encode_address_list(value: &str) -> String {
    let value = single_line(value);
    if value.is_ascii() {
        return value;
    }

    match mailparse::addrparse(&value) {
        Ok(list) => list.iter().map(format_addr).collect::<Vec<_>>().join(", "),
        Err(_) => encode_words(&value),
    }
}
