//! Decompression of `PR_RTF_COMPRESSED` bodies (LZFu and stored MELA)

use tracing::debug;

/// Dictionary contents before the first byte is decoded
const PREBUFFER: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArialTimes New RomanCourier{\\colortbl\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

const DICTIONARY_SIZE: usize = 4096;
const HEADER_SIZE: usize = 16;

/// `LZFu`
const COMPRESSED: u32 = 0x7546_5A4C;
/// `MELA`
const STORED: u32 = 0x414C_454D;

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode a compressed RTF stream.
///
/// Returns `None` when the header is truncated or names an unknown
/// compression type. The CRC is not checked; a damaged stream decodes to
/// whatever bytes it yields.
#[must_use]
pub fn decompress_rtf(data: &[u8]) -> Option<Vec<u8>> {
    let comp_size = usize::try_from(read_u32(data, 0)?).ok()?;
    let raw_size = usize::try_from(read_u32(data, 4)?).ok()?;
    let kind = read_u32(data, 8)?;

    // comp_size counts everything after its own field
    let end = data.len().min(comp_size.saturating_add(4)).max(HEADER_SIZE);
    let body = data.get(HEADER_SIZE..end)?;

    match kind {
        STORED => Some(body[..raw_size.min(body.len())].to_vec()),
        COMPRESSED => Some(decompress_lzfu(body, raw_size)),
        other => {
            debug!("Unknown RTF compression type {other:#010x}");
            None
        }
    }
}

fn decompress_lzfu(input: &[u8], raw_size: usize) -> Vec<u8> {
    let mut dictionary = [0u8; DICTIONARY_SIZE];
    dictionary[..PREBUFFER.len()].copy_from_slice(PREBUFFER);
    let mut write_pos = PREBUFFER.len();
    let mut out = Vec::with_capacity(raw_size);
    let mut pos = 0;

    'stream: while let Some(&control) = input.get(pos) {
        pos += 1;
        for bit in 0..8 {
            if control & (1 << bit) == 0 {
                let Some(&byte) = input.get(pos) else {
                    break 'stream;
                };
                pos += 1;
                out.push(byte);
                dictionary[write_pos] = byte;
                write_pos = (write_pos + 1) % DICTIONARY_SIZE;
                continue;
            }

            let Some(pair) = input.get(pos..pos + 2) else {
                break 'stream;
            };
            pos += 2;
            let token = usize::from(u16::from_be_bytes([pair[0], pair[1]]));
            let offset = token >> 4;
            let length = (token & 0xF) + 2;
            // A reference to the write position marks the end
            if offset == write_pos {
                break 'stream;
            }
            for i in 0..length {
                let byte = dictionary[(offset + i) % DICTIONARY_SIZE];
                out.push(byte);
                dictionary[write_pos] = byte;
                write_pos = (write_pos + 1) % DICTIONARY_SIZE;
            }
        }
    }

    out.truncate(raw_size);
    out
}
