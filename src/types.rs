//! Core types for normalized messages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// One source message, flattened into the fields every emitter needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEmail {
    /// Source file name (no directory)
    pub file_name: String,

    /// Subject line
    pub subject: String,

    /// Sender display name
    pub from_name: String,

    /// Sender address
    pub from_email: String,

    /// Primary recipients, one display string each
    pub to: Vec<String>,

    /// Carbon-copy recipients
    pub cc: Vec<String>,

    /// Blind carbon-copy recipients
    pub bcc: Vec<String>,

    /// Date exactly as stored in the source
    pub date_raw: String,

    /// ISO 8601 form of `date_raw`, or `date_raw` itself when unparseable
    pub date_normalized: String,

    /// Plain-text body
    pub body_text: String,

    /// HTML body, when the source has one
    pub body_html: Option<String>,

    /// RTF body, when the source has one
    pub body_rtf: Option<String>,

    /// Transport header block as stored in the source
    pub raw_headers: String,

    /// Attachments in source order
    pub attachments: Vec<Attachment>,
}

impl NormalizedEmail {
    /// To recipients joined for display
    #[must_use]
    pub fn to_joined(&self) -> String {
        self.to.join(", ")
    }

    /// Cc recipients joined for display
    #[must_use]
    pub fn cc_joined(&self) -> String {
        self.cc.join(", ")
    }

    /// Bcc recipients joined for display
    #[must_use]
    pub fn bcc_joined(&self) -> String {
        self.bcc.join(", ")
    }

    /// Sender as a single mailbox string
    #[must_use]
    pub fn from_display(&self) -> String {
        format_mailbox(&self.from_name, &self.from_email)
    }

    /// Attachment names in source order
    #[must_use]
    pub fn attachment_names(&self) -> Vec<&str> {
        self.attachments.iter().map(|a| a.name.as_str()).collect()
    }
}

/// Format a name/address pair as `Name <email>`, or whichever half exists
#[must_use]
pub fn format_mailbox(name: &str, email: &str) -> String {
    let name = name.trim();
    let email = email.trim();

    match (name.is_empty(), email.is_empty()) {
        (false, false) => format!("{name} <{email}>"),
        (true, false) => email.to_string(),
        _ => name.to_string(),
    }
}

/// An attachment with its resolved name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Long filename, else short filename, else `"attachment"`
    pub name: String,

    /// Raw content
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Size of `data` in bytes
    pub size: usize,

    /// How the PDF emitter treats this attachment
    pub kind: AttachmentKind,
}

impl Attachment {
    /// Fallback name when the source has neither long nor short filename
    pub const FALLBACK_NAME: &'static str = "attachment";

    /// Build an attachment, classifying it by extension
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let kind = AttachmentKind::classify(&name);
        Self {
            size: data.len(),
            name,
            data,
            kind,
        }
    }

    /// Whether the PDF emitter embeds this attachment as a `data:` URI
    #[must_use]
    pub const fn is_inline_image(&self) -> bool {
        matches!(self.kind, AttachmentKind::InlineImage(_))
    }
}

/// Image types that can be embedded directly into rendered HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
}

impl ImageType {
    /// Detect from a file extension, case-insensitive
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// MIME type for `data:` URIs
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }
}

/// Inline image candidate or externally linked file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    InlineImage(ImageType),
    #[default]
    External,
}

impl AttachmentKind {
    /// Classify a file name by its extension
    #[must_use]
    pub fn classify(name: &str) -> Self {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageType::from_extension)
            .map_or(Self::External, Self::InlineImage)
    }
}

/// Recipient role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

impl RecipientKind {
    /// Lowercase role name, as used for flat recipient fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        }
    }

    /// Whether a parser-reported role string names this kind
    #[must_use]
    pub fn matches(self, role: &str) -> bool {
        role.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
