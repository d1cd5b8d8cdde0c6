use crate::line::Format;

#[derive(Debug, thiserror::Error)]
pub enum DisasmError {
    #[error("image has no bytes to disassemble")]
    Empty,

    #[error("failed to disassemble {format} at offset {offset}")]
    Decode { offset: usize, format: Format },

    #[error("index out of sync at row {row}, should be {expected}")]
    RowOutOfSync { row: usize, expected: usize },

    #[error("address out of sync at row {row}: ${address:04X}, should be ${expected:04X}")]
    AddressOutOfSync {
        row: usize,
        address: u16,
        expected: u16,
    },

    #[error("lines cover {covered} bytes but the image has {expected}")]
    Coverage { covered: usize, expected: usize },

    #[error("no line starts at ${0:04X}")]
    UnknownAddress(u16),

    #[error("no line at row {0}")]
    UnknownRow(usize),

    #[error("{line}: {reason}")]
    SymFile { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DisasmError {
    /// First row the error makes untrustworthy, for violations found by validation.
    pub fn row(&self) -> Option<usize> {
        match self {
            DisasmError::RowOutOfSync { expected, .. } => Some(*expected),
            DisasmError::AddressOutOfSync { row, .. } => Some(*row),
            _ => None,
        }
    }
}
