//! A 6502 disassembler that keeps its listing editable: any line can be
//! reformatted as code, bytes, words, byte runs or text, and the rest of the
//! listing is patched up around it.

pub mod cpu;
pub mod error;
pub mod line;
pub mod listing;
pub mod queue;
pub mod symbols;

pub use error::DisasmError;
pub use line::{Format, Line};
pub use listing::Listing;
pub use queue::{FormatQueue, FormatRequest, QueueConfig, QueueState};
pub use symbols::Symbols;
