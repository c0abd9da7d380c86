//! MAPI properties read straight from the `.msg` compound file.
//!
//! `msg_parser` covers the common fields but drops the HTML body, the
//! full transport header block, the display lists and the recipient
//! types. These are read here from the property streams.

use crate::error::{ConvertError, Result};
use crate::source::SourceRecipient;
use cfb::CompoundFile;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

pub(crate) const PR_TRANSPORT_MESSAGE_HEADERS: u16 = 0x007D;
const PR_RECIPIENT_TYPE: u16 = 0x0C15;
const PR_DISPLAY_BCC: u16 = 0x0E02;
pub(crate) const PR_DISPLAY_CC: u16 = 0x0E03;
pub(crate) const PR_DISPLAY_TO: u16 = 0x0E04;
pub(crate) const PR_HTML: u16 = 0x1013;
const PR_DISPLAY_NAME: u16 = 0x3001;
const PR_EMAIL_ADDRESS: u16 = 0x3003;
const PR_SMTP_ADDRESS: u16 = 0x39FE;

const PT_LONG: u16 = 0x0003;
const PT_STRING8: u16 = 0x001E;
const PT_UNICODE: u16 = 0x001F;
const PT_BINARY: u16 = 0x0102;

const RECIPIENT_PREFIX: &str = "__recip_version1.0_";
const PROPERTIES_STREAM: &str = "__properties_version1.0";
/// Header before the fixed-size entries of a recipient properties stream
const RECIPIENT_PROPERTIES_HEADER: usize = 8;
const PROPERTY_ENTRY_SIZE: usize = 16;

/// Properties `msg_parser` does not expose
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgProperties {
    /// HTML body bytes, charset unknown
    pub html_body: Option<Vec<u8>>,
    /// Transport header block as received
    pub transport_headers: Option<String>,
    pub display_to: Option<String>,
    pub display_cc: Option<String>,
    pub display_bcc: Option<String>,
    /// Recipient table with roles, in storage order
    pub recipients: Vec<SourceRecipient>,
}

impl MsgProperties {
    /// Read the properties of the message at `path`
    pub fn read(path: &Path) -> Result<Self> {
        let mut compound = cfb::open(path).map_err(|e| ConvertError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_compound(&mut compound))
    }

    /// Read the properties of the top-level message in `compound`
    pub fn from_compound<F: Read + Seek>(compound: &mut CompoundFile<F>) -> Self {
        let html_body = read_binary(compound, "", PR_HTML).or_else(|| {
            read_string(compound, "", PR_HTML).map(String::into_bytes)
        });

        Self {
            html_body,
            transport_headers: read_string(compound, "", PR_TRANSPORT_MESSAGE_HEADERS),
            display_to: read_string(compound, "", PR_DISPLAY_TO),
            display_cc: read_string(compound, "", PR_DISPLAY_CC),
            display_bcc: read_string(compound, "", PR_DISPLAY_BCC),
            recipients: read_recipients(compound),
        }
    }
}

fn stream_path(storage: &str, tag: u16, kind: u16) -> String {
    format!("/{storage}__substg1.0_{tag:04X}{kind:04X}")
}

fn read_stream<F: Read + Seek>(compound: &mut CompoundFile<F>, path: &str) -> Option<Vec<u8>> {
    if !compound.is_stream(path) {
        return None;
    }
    let mut data = Vec::new();
    match compound
        .open_stream(path)
        .and_then(|mut stream| stream.read_to_end(&mut data))
    {
        Ok(_) => Some(data),
        Err(e) => {
            debug!("Skipping unreadable stream {path}: {e}");
            None
        }
    }
}

fn read_binary<F: Read + Seek>(
    compound: &mut CompoundFile<F>,
    storage: &str,
    tag: u16,
) -> Option<Vec<u8>> {
    read_stream(compound, &stream_path(storage, tag, PT_BINARY)).filter(|data| !data.is_empty())
}

/// Unicode form first, then the 8-bit form
fn read_string<F: Read + Seek>(
    compound: &mut CompoundFile<F>,
    storage: &str,
    tag: u16,
) -> Option<String> {
    let text = read_stream(compound, &stream_path(storage, tag, PT_UNICODE))
        .map(|data| decode_utf16le(&data))
        .or_else(|| {
            read_stream(compound, &stream_path(storage, tag, PT_STRING8))
                .map(|data| String::from_utf8_lossy(&data).into_owned())
        })?;

    let text = text.trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn decode_utf16le(data: &[u8]) -> String {
    char::decode_utf16(
        data.chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
    )
    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
    .collect()
}

/// Value of a fixed-size `PT_LONG` property in a properties stream
fn fixed_long(properties: &[u8], header: usize, tag: u16) -> Option<u32> {
    properties
        .get(header..)?
        .chunks_exact(PROPERTY_ENTRY_SIZE)
        .find(|entry| {
            u16::from_le_bytes([entry[0], entry[1]]) == PT_LONG
                && u16::from_le_bytes([entry[2], entry[3]]) == tag
        })
        .map(|entry| u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]))
}

fn role_name(recipient_type: u32) -> Option<&'static str> {
    match recipient_type & 0x0F {
        1 => Some("To"),
        2 => Some("Cc"),
        3 => Some("Bcc"),
        _ => None,
    }
}

fn read_recipients<F: Read + Seek>(compound: &mut CompoundFile<F>) -> Vec<SourceRecipient> {
    let mut storages: Vec<String> = compound
        .read_root_storage()
        .filter(|entry| entry.is_storage() && entry.name().starts_with(RECIPIENT_PREFIX))
        .map(|entry| entry.name().to_string())
        .collect();
    storages.sort();

    storages
        .iter()
        .filter_map(|storage| {
            let prefix = format!("{storage}/");
            let properties = read_stream(compound, &format!("/{prefix}{PROPERTIES_STREAM}"))?;
            let Some(role) = fixed_long(&properties, RECIPIENT_PROPERTIES_HEADER, PR_RECIPIENT_TYPE)
                .and_then(role_name)
            else {
                debug!("Recipient {storage} has no usable type");
                return None;
            };

            let email = read_string(compound, &prefix, PR_SMTP_ADDRESS)
                .or_else(|| {
                    read_string(compound, &prefix, PR_EMAIL_ADDRESS).filter(|a| a.contains('@'))
                })
                .unwrap_or_default();
            Some(SourceRecipient {
                role: role.to_string(),
                name: read_string(compound, &prefix, PR_DISPLAY_NAME).unwrap_or_default(),
                email,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Builds minimal `.msg` compound files

    use super::*;
    use std::io::Write;

    pub fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    pub fn recipient_properties(recipient_type: u32) -> Vec<u8> {
        let mut data = vec![0u8; RECIPIENT_PROPERTIES_HEADER];
        data.extend_from_slice(&PT_LONG.to_le_bytes());
        data.extend_from_slice(&PR_RECIPIENT_TYPE.to_le_bytes());
        data.extend_from_slice(&[0x06, 0, 0, 0]);
        data.extend_from_slice(&recipient_type.to_le_bytes());
        data.extend_from_slice(&[0; 4]);
        data
    }

    /// Write `streams` (path, bytes) into a new compound file at `path`
    pub fn write(path: &Path, streams: &[(String, Vec<u8>)]) {
        let mut compound = cfb::create(path).unwrap();
        for (stream, data) in streams {
            if let Some((storage, _)) = stream.trim_start_matches('/').rsplit_once('/') {
                let storage = format!("/{storage}");
                if !compound.exists(&storage) {
                    compound.create_storage(&storage).unwrap();
                }
            }
            let mut writer = compound.create_stream(stream).unwrap();
            writer.write_all(data).unwrap();
            writer.flush().unwrap();
        }
        compound.flush().unwrap();
    }

    pub fn unicode(storage: &str, tag: u16, text: &str) -> (String, Vec<u8>) {
        (stream_path(storage, tag, PT_UNICODE), utf16(text))
    }

    pub fn binary(storage: &str, tag: u16, data: &[u8]) -> (String, Vec<u8>) {
        (stream_path(storage, tag, PT_BINARY), data.to_vec())
    }

    /// Streams of one recipient storage with the given `PR_RECIPIENT_TYPE`
    pub fn recipient(index: u32, kind: u32, name: &str, smtp: &str) -> Vec<(String, Vec<u8>)> {
        let storage = format!("{RECIPIENT_PREFIX}#{index:08X}/");
        vec![
            (
                format!("/{storage}{PROPERTIES_STREAM}"),
                recipient_properties(kind),
            ),
            unicode(&storage, PR_DISPLAY_NAME, name),
            unicode(&storage, PR_SMTP_ADDRESS, smtp),
        ]
    }
}
