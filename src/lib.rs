// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

//! Outlook Message Converter
//!
//! Converts Outlook `.msg` files into portable formats: a CSV summary,
//! RFC 5322 `.eml` files, rendered `.pdf` documents and `.mbox` archives.
//!
//! # Pipeline
//!
//! - A [`MessageOpener`] turns a file into a [`MessageSource`]
//! - [`extract`] flattens the source into a [`NormalizedEmail`], with
//!   recipient resolution and date normalization
//! - An emitter writes the record: [`write_csv`], [`write_eml`],
//!   [`write_pdf`], or [`append_to_mbox`] for already written EML files
//! - [`BatchConverter`] runs a whole directory and collects per-file errors
//!
//! # Example
//!
//! ```rust
//! use msg_convert::{MemoryMessage, build_message, extract};
//!
//! let msg = MemoryMessage {
//!     subject: Some("Hello".into()),
//!     sender_email: Some("sender@example.com".into()),
//!     body: Some("Body".into()),
//!     ..MemoryMessage::default()
//! };
//! let email = extract(&msg, "hello.msg");
//! let eml = String::from_utf8(build_message(&email)).unwrap();
//!
//! assert!(eml.contains("Subject: Hello\r\n"));
//! ```

mod batch;
mod date;
mod eml;
mod error;
mod extract;
mod headers;
mod html;
mod mbox;
mod naming;
mod pdf;
mod props;
mod recipients;
mod render;
mod rtf;
mod source;
mod table;
mod types;

pub use batch::{
    BatchConverter, BatchReport, CSV_FILE_NAME, FileFailure, MBOX_FILE_NAME, OutputFormat,
    PdfStrategy, discover_msg_files, output_path,
};
pub use date::{mime_date, normalize_date, parse_date};
pub use eml::{build_message, convert_to_eml, write_eml};
pub use error::{ConvertError, Result};
pub use extract::{attachment_name, extract, extract_from_path};
pub use headers::RawHeaders;
pub use html::{escape as escape_html, remove_page_rules, replace_cid, strip_wrapper_tags};
pub use mbox::{MboxWriter, append_to_mbox};
pub use naming::UniqueNames;
pub use pdf::{
    LinkedFile, MetaHeaders, NO_RECIPIENT, NO_SUBJECT, SavedAttachments, UNKNOWN_SENDER,
    attachments_dir, build_document, convert_to_pdf, data_uri, prepare_document, render_body,
    save_attachments, write_pdf,
};
pub use props::MsgProperties;
pub use recipients::{resolve_joined, resolve_recipients};
pub use render::{CommandRenderer, HtmlRenderer};
pub use rtf::decompress_rtf;
pub use source::{
    MemoryMessage, MessageOpener, MessageSource, OutlookMessage, OutlookOpener, SourceAttachment,
    SourceRecipient,
};
pub use table::{CSV_COLUMNS, convert_to_csv, csv_row, render_csv, write_csv};
pub use types::*;
