//! CSV emitter: one row per message, one file per batch

use crate::batch::{BatchReport, FileFailure, discover_msg_files};
use crate::error::{ConvertError, Result};
use crate::extract::extract_from_path;
use crate::source::MessageOpener;
use crate::types::NormalizedEmail;
use csv::{QuoteStyle, WriterBuilder};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Column names, in output order
pub const CSV_COLUMNS: [&str; 11] = [
    "file_name",
    "subject",
    "from_name",
    "from_email",
    "to",
    "cc",
    "bcc",
    "date_utc",
    "attachments_count",
    "attachments",
    "body_text",
];

/// Byte-order mark so spreadsheet tools detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One row's fields, in [`CSV_COLUMNS`] order
#[must_use]
pub fn csv_row(email: &NormalizedEmail) -> [String; CSV_COLUMNS.len()] {
    [
        email.file_name.clone(),
        email.subject.clone(),
        email.from_name.clone(),
        email.from_email.clone(),
        email.to_joined(),
        email.cc_joined(),
        email.bcc_joined(),
        email.date_normalized.clone(),
        email.attachments.len().to_string(),
        email.attachment_names().join("; "),
        email.body_text.clone(),
    ]
}

/// Render records as CSV bytes (BOM, header, rows)
pub fn render_csv(emails: &[NormalizedEmail]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(CSV_COLUMNS)?;
    for email in emails {
        writer.write_record(csv_row(email))?;
    }

    writer
        .into_inner()
        .map_err(|e| ConvertError::Csv(csv::Error::from(e.into_error())))
}

/// Write records to `output`, creating its directory. Returns rows written.
pub fn write_csv(emails: &[NormalizedEmail], output: &Path) -> Result<usize> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
    }

    let bytes = render_csv(emails)?;
    fs::write(output, bytes).map_err(|e| ConvertError::io(output, e))?;
    info!("Wrote {} rows to {}", emails.len(), output.display());
    Ok(emails.len())
}

/// Convert every message under `input` (a `.msg` file or a directory) into
/// a single CSV at `output`.
///
/// Messages that fail to open are reported in the returned
/// [`BatchReport`] and skipped; the file is written once at the end.
pub fn convert_to_csv(
    opener: &dyn MessageOpener,
    input: &Path,
    output: &Path,
) -> Result<BatchReport> {
    let files = discover_msg_files(input)?;
    let mut report = BatchReport::default();
    let mut emails = Vec::with_capacity(files.len());

    for path in files {
        match extract_from_path(opener, &path) {
            Ok(email) => emails.push(email),
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                report.failures.push(FileFailure::new(&path, &e));
            }
        }
    }

    report.converted = write_csv(&emails, output)?;
    report.outputs.push(output.to_path_buf());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attachment;

    #[test]
    fn test_empty_batch_has_header_only() {
        let bytes = render_csv(&[]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(
            text,
            "file_name,subject,from_name,from_email,to,cc,bcc,date_utc,attachments_count,attachments,body_text\n"
        );
    }

    #[test]
    fn test_row_fields_and_quoting() {
        let email = NormalizedEmail {
            file_name: "a.msg".into(),
            subject: "Budget, Q3".into(),
            to: vec!["Alice <a@x.com>".into(), "Bob".into()],
            date_normalized: "2016-12-01T11:44:10-05:00".into(),
            body_text: "line one\nline \"two\"".into(),
            attachments: vec![
                Attachment::new("x.pdf", vec![1]),
                Attachment::new("y.png", vec![2]),
            ],
            ..NormalizedEmail::default()
        };

        let bytes = render_csv(std::slice::from_ref(&email)).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let row = text.split_once('\n').unwrap().1;

        assert_eq!(
            row,
            "a.msg,\"Budget, Q3\",,,\"Alice <a@x.com>, Bob\",,,2016-12-01T11:44:10-05:00,2,x.pdf; y.png,\"line one\nline \"\"two\"\"\"\n"
        );
    }

    #[test]
    fn test_row_matches_schema_width() {
        assert_eq!(csv_row(&NormalizedEmail::default()).len(), CSV_COLUMNS.len());
    }
}
