//! MBOX emitter: append MIME messages to a mailbox file (mboxrd quoting)

use crate::error::{ConvertError, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_SENDER: &str = "MAILER-DAEMON";

/// Writes messages into an mbox stream
pub struct MboxWriter<W: Write> {
    writer: W,
    message_count: u64,
}

impl<W: Write> MboxWriter<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            message_count: 0,
        }
    }

    /// Write one message with its `From ` separator line
    pub fn write_message(&mut self, raw_message: &[u8]) -> io::Result<()> {
        let (sender, date) = envelope(raw_message);
        writeln!(
            self.writer,
            "From {sender} {}",
            date.format("%a %b %e %H:%M:%S %Y")
        )?;

        let mut content = raw_message;
        if content.ends_with(b"\n") {
            content = &content[..content.len() - 1];
        }

        for line in content.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if needs_quoting(line) {
                self.writer.write_all(b">")?;
            }
            self.writer.write_all(line)?;
            self.writer.write_all(b"\n")?;
        }

        writeln!(self.writer)?;
        self.message_count += 1;
        Ok(())
    }

    #[must_use]
    pub const fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Flush and return the inner writer
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// `From ` lines, and lines already quoted as `>From `, get one more `>`
fn needs_quoting(line: &[u8]) -> bool {
    let unquoted = line
        .iter()
        .position(|&b| b != b'>')
        .map_or(&[][..], |i| &line[i..]);
    unquoted.starts_with(b"From ")
}

/// Envelope sender and timestamp for the separator line
fn envelope(raw_message: &[u8]) -> (String, DateTime<Utc>) {
    let Ok((headers, _)) = mailparse::parse_headers(raw_message) else {
        return (DEFAULT_SENDER.to_string(), Utc::now());
    };
    let value = |name: &str| {
        headers
            .iter()
            .find(|h| h.get_key().eq_ignore_ascii_case(name))
            .map(mailparse::MailHeader::get_value)
    };

    let sender = value("Return-Path")
        .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        .filter(|v| !v.is_empty() && !v.contains(char::is_whitespace))
        .or_else(|| {
            value("From")
                .and_then(|v| mailparse::addrparse(&v).ok())
                .and_then(|list| {
                    list.iter().find_map(|addr| match addr {
                        mailparse::MailAddr::Single(info) => Some(info.addr.clone()),
                        mailparse::MailAddr::Group(_) => None,
                    })
                })
                .filter(|a| !a.is_empty() && !a.contains(char::is_whitespace))
        })
        .unwrap_or_else(|| DEFAULT_SENDER.to_string());

    let date = value("Date")
        .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
        .map_or_else(Utc::now, |d| d.with_timezone(&Utc));

    (sender, date)
}

/// Number of newlines to write so appended content starts after a blank line
fn separator_needed(path: &Path) -> io::Result<usize> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }

    let tail_len = len.min(2);
    file.seek(SeekFrom::End(-i64::try_from(tail_len).unwrap_or(2)))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;

    Ok(match tail.as_slice() {
        [.., b'\n', b'\n'] => 0,
        [.., b'\n'] => 1,
        _ => 2,
    })
}

/// Append the messages at `eml_paths` to the mailbox at `mbox_path`, in
/// order. The mailbox is created when missing.
pub fn append_to_mbox<P: AsRef<Path>>(eml_paths: &[P], mbox_path: &Path) -> Result<u64> {
    let io_err = |e| ConvertError::io(mbox_path, e);

    let padding = separator_needed(mbox_path).map_err(io_err)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(mbox_path)
        .map_err(io_err)?;
    let mut out = BufWriter::new(file);
    for _ in 0..padding {
        out.write_all(b"\n").map_err(io_err)?;
    }

    let mut writer = MboxWriter::new(out);
    for path in eml_paths {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
        writer.write_message(&raw).map_err(io_err)?;
        debug!("Appended {} to {}", path.display(), mbox_path.display());
    }

    let count = writer.message_count();
    let file = writer
        .finish()
        .map_err(io_err)?
        .into_inner()
        .map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;

    info!("Wrote {count} messages to {}", mbox_path.display());
    Ok(count)
}
