//! Narrow view over a parsed Outlook message.
//!
//! Every accessor carries its own default: optional scalars return `None`
//! when the underlying library has nothing, collections return `Err` when
//! the library could not decode them. The extractor applies the fallbacks.

use crate::error::{ConvertError, Result};
use crate::props::MsgProperties;
use crate::rtf::decompress_rtf;
use msg_parser::Outlook;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One entry of a structured recipient list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRecipient {
    /// Role as reported by the parser (`To`, `Cc`, `Bcc`, any case)
    pub role: String,
    pub name: String,
    pub email: String,
}

/// One attachment as reported by the parser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceAttachment {
    pub long_filename: Option<String>,
    pub short_filename: Option<String>,
    pub data: Vec<u8>,
}

/// Typed access to the fields of one parsed message
pub trait MessageSource {
    /// Subject line. Default: `None`.
    fn subject(&self) -> Option<String>;

    /// Sender display name. Default: `None`.
    fn sender_name(&self) -> Option<String>;

    /// Sender address. Default: `None`.
    fn sender_email(&self) -> Option<String>;

    /// Aggregated display string for the given role (`to`, `cc`, `bcc`).
    /// Default: `None`.
    fn flat_recipients(&self, role: &str) -> Option<String>;

    /// Structured recipient list, when the parser exposes one.
    /// `Ok(None)` means the parser has no structured list at all.
    fn recipients(&self) -> Result<Option<Vec<SourceRecipient>>>;

    /// Date string as stored, usually RFC 2822-like. Default: `None`.
    fn date(&self) -> Option<String>;

    /// Plain-text body. Default: `None`.
    fn body(&self) -> Option<String>;

    /// HTML body as raw bytes, charset unknown. Default: `None`.
    fn html_body(&self) -> Option<Vec<u8>>;

    /// RTF body. Default: `None`.
    fn rtf_body(&self) -> Option<String>;

    /// Transport header block as stored. Default: `None`.
    fn raw_headers(&self) -> Option<String>;

    /// Attachments in source order.
    fn attachments(&self) -> Result<Vec<SourceAttachment>>;
}

/// Opens message files into a [`MessageSource`]
pub trait MessageOpener {
    /// Open and parse one message file. Failure here is fatal for that file.
    fn open(&self, path: &Path) -> Result<Box<dyn MessageSource>>;
}

/// Opener backed by the `msg_parser` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlookOpener;

impl MessageOpener for OutlookOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn MessageSource>> {
        Ok(Box::new(OutlookMessage::open(path)?))
    }
}

/// A `.msg` file parsed with `msg_parser`, plus the properties it skips
#[derive(Debug)]
pub struct OutlookMessage {
    inner: Outlook,
    extra: MsgProperties,
}

impl OutlookMessage {
    /// Parse the compound file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let inner = Outlook::from_path(path).map_err(|e| ConvertError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let extra = MsgProperties::read(path).unwrap_or_else(|e| {
            warn!("Extra properties unavailable: {e}");
            MsgProperties::default()
        });
        debug!(
            "Opened {} ({} attachments, {} recipients)",
            path.display(),
            inner.attachments.len(),
            extra.recipients.len()
        );
        Ok(Self::from_parts(inner, extra))
    }

    /// Combine an already parsed message with its extra properties
    #[must_use]
    pub const fn from_parts(inner: Outlook, extra: MsgProperties) -> Self {
        Self { inner, extra }
    }

    /// Header block rebuilt from the few transport headers `msg_parser` keeps
    fn rebuilt_headers(&self) -> Option<String> {
        let headers = &self.inner.headers;
        let block: String = [
            ("Date", &headers.date),
            ("Message-ID", &headers.message_id),
            ("Reply-To", &headers.reply_to),
            ("Content-Type", &headers.content_type),
        ]
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, value)| format!("{key}: {}\r\n", value.trim()))
        .collect();

        non_empty(&block)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Binary properties come back hex encoded
fn decode_payload(name: &str, payload: &str) -> Vec<u8> {
    match hex::decode(payload.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Attachment {name}: payload is not hex ({e}), keeping raw text");
            payload.as_bytes().to_vec()
        }
    }
}

impl MessageSource for OutlookMessage {
    fn subject(&self) -> Option<String> {
        non_empty(&self.inner.subject)
    }

    fn sender_name(&self) -> Option<String> {
        non_empty(&self.inner.sender.name)
    }

    fn sender_email(&self) -> Option<String> {
        non_empty(&self.inner.sender.email)
    }

    fn flat_recipients(&self, role: &str) -> Option<String> {
        let display = match role.to_ascii_lowercase().as_str() {
            "to" => self.extra.display_to.as_deref(),
            "cc" => self.extra.display_cc.as_deref(),
            "bcc" => self
                .extra
                .display_bcc
                .as_deref()
                .or(Some(self.inner.bcc.as_str())),
            _ => None,
        };
        display.and_then(non_empty)
    }

    fn recipients(&self) -> Result<Option<Vec<SourceRecipient>>> {
        if !self.extra.recipients.is_empty() {
            return Ok(Some(self.extra.recipients.clone()));
        }

        // msg_parser lists every recipient under `to` and takes `cc` from
        // the transport headers.
        let to = self.inner.to.iter().map(|p| ("To", p));
        let cc = self.inner.cc.iter().map(|p| ("Cc", p));

        Ok(Some(
            to.chain(cc)
                .map(|(role, p)| SourceRecipient {
                    role: role.to_string(),
                    name: p.name.clone(),
                    email: p.email.clone(),
                })
                .collect(),
        ))
    }

    fn date(&self) -> Option<String> {
        non_empty(&self.inner.headers.date)
    }

    fn body(&self) -> Option<String> {
        non_empty(&self.inner.body)
    }

    fn html_body(&self) -> Option<Vec<u8>> {
        self.extra.html_body.clone()
    }

    fn rtf_body(&self) -> Option<String> {
        let compressed = non_empty(&self.inner.rtf_compressed)?;
        let bytes = match hex::decode(&compressed) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("RTF body is not hex ({e}), skipping");
                return None;
            }
        };
        let rtf = decompress_rtf(&bytes)?;
        non_empty(&String::from_utf8_lossy(&rtf))
    }

    fn raw_headers(&self) -> Option<String> {
        self.extra
            .transport_headers
            .as_deref()
            .and_then(non_empty)
            .or_else(|| self.rebuilt_headers())
    }

    fn attachments(&self) -> Result<Vec<SourceAttachment>> {
        Ok(self
            .inner
            .attachments
            .iter()
            .map(|att| SourceAttachment {
                long_filename: non_empty(&att.file_name),
                short_filename: non_empty(&att.display_name),
                data: decode_payload(&att.file_name, &att.payload),
            })
            .collect())
    }
}

/// A message held in memory, for callers that already have the fields
/// (another parser, a JSON dump) and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMessage {
    pub subject: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub recipients: Option<Vec<SourceRecipient>>,
    pub date: Option<String>,
    pub body: Option<String>,
    pub html_body: Option<String>,
    pub rtf_body: Option<String>,
    pub raw_headers: Option<String>,
    pub attachments: Vec<SourceAttachment>,
}

impl MessageSource for MemoryMessage {
    fn subject(&self) -> Option<String> {
        self.subject.clone()
    }

    fn sender_name(&self) -> Option<String> {
        self.sender_name.clone()
    }

    fn sender_email(&self) -> Option<String> {
        self.sender_email.clone()
    }

    fn flat_recipients(&self, role: &str) -> Option<String> {
        match role.to_ascii_lowercase().as_str() {
            "to" => self.to.clone(),
            "cc" => self.cc.clone(),
            "bcc" => self.bcc.clone(),
            _ => None,
        }
    }

    fn recipients(&self) -> Result<Option<Vec<SourceRecipient>>> {
        Ok(self.recipients.clone())
    }

    fn date(&self) -> Option<String> {
        self.date.clone()
    }

    fn body(&self) -> Option<String> {
        self.body.clone()
    }

    fn html_body(&self) -> Option<Vec<u8>> {
        self.html_body.clone().map(String::into_bytes)
    }

    fn rtf_body(&self) -> Option<String> {
        self.rtf_body.clone()
    }

    fn raw_headers(&self) -> Option<String> {
        self.raw_headers.clone()
    }

    fn attachments(&self) -> Result<Vec<SourceAttachment>> {
        Ok(self.attachments.clone())
    }
}
