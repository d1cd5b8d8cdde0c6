//! Listing rows and their format tags

use std::fmt;

/// How a line's bytes are interpreted.
///
/// `MultiByte` and `Text` carry the run length they were asked to cover. The
/// run is clamped to the remaining image when the line is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Opcode,
    Byte,
    Word,
    MultiByte(usize),
    Text(usize),
}

const KIND_OPCODE: u32 = 0;
const KIND_BYTE: u32 = 1;
const KIND_WORD: u32 = 2;
const KIND_MULTI_BYTE: u32 = 3;
const KIND_TEXT: u32 = 4;

impl Format {
    /// Packed form used when a session is persisted: kind in the low byte, run
    /// length above it.
    pub fn tag(self) -> u32 {
        match self {
            Format::Opcode => KIND_OPCODE,
            Format::Byte => KIND_BYTE,
            Format::Word => KIND_WORD,
            Format::MultiByte(len) => KIND_MULTI_BYTE | ((len as u32) << 8),
            Format::Text(len) => KIND_TEXT | ((len as u32) << 8),
        }
    }

    /// Inverse of [`Format::tag`]. Unknown kinds decode as `Byte` and a zero run
    /// length is clamped to one.
    pub fn from_tag(tag: u32) -> Self {
        let len = ((tag >> 8) as usize).max(1);
        match tag & 0xFF {
            KIND_OPCODE => Format::Opcode,
            KIND_BYTE => Format::Byte,
            KIND_WORD => Format::Word,
            KIND_MULTI_BYTE => Format::MultiByte(len),
            KIND_TEXT => Format::Text(len),
            kind => {
                tracing::warn!("unknown format kind {kind}, treating as byte");
                Format::Byte
            }
        }
    }

    /// Run length for the variable-width formats.
    pub fn run_len(self) -> Option<usize> {
        match self {
            Format::MultiByte(len) | Format::Text(len) => Some(len),
            _ => None,
        }
    }

    /// Same kind with a different run length. Fixed-width formats are unchanged.
    pub fn with_run_len(self, len: usize) -> Self {
        match self {
            Format::MultiByte(_) => Format::MultiByte(len),
            Format::Text(_) => Format::Text(len),
            other => other,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Opcode => write!(f, "opcode"),
            Format::Byte => write!(f, "byte"),
            Format::Word => write!(f, "word"),
            Format::MultiByte(len) => write!(f, "bytes({len})"),
            Format::Text(len) => write!(f, "text({len})"),
        }
    }
}

/// One listing row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub address: u16,
    /// Bytes consumed.
    pub size: usize,
    /// Position in the listing.
    pub row: usize,
    /// How the bytes were rendered.
    pub format: Format,
    /// What was asked for. Differs from `format` when an opcode request fell
    /// back to a byte; this is what a resync replays.
    pub requested: Format,
    pub label: String,
    pub bytes: String,
    pub operand: String,
    pub unresolved: bool,
    /// Mnemonic and value of an immediate-mode instruction, for pointer pairing.
    pub(crate) immediate: Option<(&'static str, u8)>,
}

impl Line {
    pub fn comment(&self) -> String {
        format!("; {}: {}", word_lit(self.address), self.bytes)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {:<20} {}",
            self.label,
            self.operand,
            self.comment()
        )
    }
}

/// `$XX`
pub fn byte_lit(byte: u8) -> String {
    format!("${byte:02X}")
}

/// `$HHLL`
pub fn word_lit(word: u16) -> String {
    format!("${word:04X}")
}

/// Space separated hex of raw bytes.
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn printable(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte.is_ascii_punctuation() || byte == b' '
}

/// Renders a run as quoted text, breaking out to hex literals for anything
/// unprintable: `"AB",$00`. Quotes and backslashes are escaped with `\`.
pub fn text_run(bytes: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut quoted = String::new();
    for &byte in bytes {
        if printable(byte) {
            if byte == b'"' || byte == b'\\' {
                quoted.push('\\');
            }
            quoted.push(byte as char);
        } else {
            if !quoted.is_empty() {
                parts.push(format!("\"{quoted}\""));
                quoted.clear();
            }
            parts.push(byte_lit(byte));
        }
    }
    if !quoted.is_empty() {
        parts.push(format!("\"{quoted}\""));
    }
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_pack_run_length() {
        assert_eq!(Format::Text(3).tag(), 0x304);
        assert_eq!(Format::from_tag(0x304), Format::Text(3));
        assert_eq!(Format::from_tag(Format::MultiByte(40).tag()), Format::MultiByte(40));
        assert_eq!(Format::from_tag(2), Format::Word);
    }

    #[test]
    fn unknown_tags_default_to_byte() {
        assert_eq!(Format::from_tag(0x17), Format::Byte);
        assert_eq!(Format::from_tag(0x0503), Format::MultiByte(5));
        assert_eq!(Format::from_tag(KIND_TEXT), Format::Text(1));
    }

    #[test]
    fn hex_text() {
        assert_eq!(byte_lit(0x0A), "$0A");
        assert_eq!(word_lit(0xD020), "$D020");
        assert_eq!(hex_bytes(&[0xA9, 0x01]), "A9 01");
    }

    #[test]
    fn text_runs() {
        assert_eq!(text_run(&[0x41, 0x42, 0x00]), "\"AB\",$00");
        assert_eq!(text_run(&[0x0D, b'H', b'I', 0x0D]), "$0D,\"HI\",$0D");
        assert_eq!(text_run(b"SAY \"HI\""), "\"SAY \\\"HI\\\"\"");
        assert_eq!(text_run(&[0xFF, 0xFE]), "$FF,$FE");
        assert_eq!(text_run(&[0x5C]), "\"\\\\\"");
        assert_eq!(text_run(&[0x41, 0x5C, 0x22]), "\"A\\\\\\\"\"");
    }
}
