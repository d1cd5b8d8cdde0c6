//! The listing: an ordered run of decoded lines over one program image.
//!
//! Lines partition the image exactly. Starting at the load address, each
//! line's size gives the address of the next, and the sizes add up to the
//! image length (minus the two byte load-address header of a `.prg`).
//!
//! All decoding goes through [`Listing::build_line`]. A full [`Listing::build`]
//! asks for code everywhere; a reformat re-decodes a single line and patches
//! its neighbours; and [`Listing::sync_rows_labels`] replays every line's
//! requested format so that labels, used symbols and pointer pairs reflect the
//! current layout.

use crate::{
    cpu::{self, Instruction, Mode},
    error::DisasmError,
    line::{byte_lit, hex_bytes, text_run, word_lit, Format, Line},
    symbols::{Symbols, Width},
};

mod build;
mod reformat;
mod session;


pub use build::POINTER_PAIR_WINDOW;
pub use session::{SavedLine, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Building,
}

#[derive(Debug)]
pub struct Listing {
    data: Vec<u8>,
    load_address: u16,
    raw: bool,
    lines: Vec<Line>,
    symbols: Symbols,
    external: Vec<String>,
    phase: Phase,
    // last validation failure, hides the listing from its row onward
    violation: Option<DisasmError>,
}

impl Listing {
    pub fn new(symbols: Symbols) -> Self {
        Self {
            data: Vec::new(),
            load_address: 0,
            raw: false,
            lines: Vec::new(),
            symbols,
            external: Vec::new(),
            phase: Phase::Idle,
            violation: None,
        }
    }

    /// Replaces the image and disassembles all of it as code.
    ///
    /// Unless `raw` is set the first two bytes are the little-endian load
    /// address and `load_address` is ignored.
    pub fn load(&mut self, data: Vec<u8>, raw: bool, load_address: u16) -> Result<(), DisasmError> {
        let header = if raw { 0 } else { 2 };
        if data.len() <= header {
            return Err(DisasmError::Empty);
        }
        let load_address = if raw {
            load_address
        } else {
            u16::from_le_bytes([data[0], data[1]])
        };
        tracing::info!(
            "loading {} bytes at {}{}",
            data.len() - header,
            word_lit(load_address),
            if raw { " (raw)" } else { "" }
        );

        self.data = data;
        self.raw = raw;
        self.load_address = load_address;
        self.lines.clear();
        self.external.clear();
        self.violation = None;
        self.symbols.clear();
        self.symbols.set_local_span(load_address, self.image_len());
        self.build()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn load_address(&self) -> u16 {
        self.load_address
    }

    /// Moves the image to a new address and resyncs.
    pub fn set_load_address(&mut self, load_address: u16) -> Result<(), DisasmError> {
        self.load_address = load_address;
        self.symbols.set_local_span(load_address, self.image_len());
        self.sync_rows_labels()
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Lines that passed validation. Everything from the first inconsistent
    /// row onward is withheld.
    pub fn visible_lines(&self) -> &[Line] {
        let end = match &self.violation {
            Some(err) => err.row().unwrap_or(0),
            None => self.lines.len(),
        };
        &self.lines[..end.min(self.lines.len())]
    }

    /// The invariant violation found by the last resync, if any.
    pub fn violation(&self) -> Option<&DisasmError> {
        self.violation.as_ref()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The external symbol block: used built-ins, a blank, then `.ORG`.
    pub fn external_symbols(&self) -> &[String] {
        &self.external
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Row of the line starting exactly at `address`.
    pub fn row_of(&self, address: u16) -> Option<usize> {
        match self.lines.binary_search_by_key(&address, |line| line.address) {
            Ok(row) => Some(row),
            // images that wrap past $FFFF are not sorted
            Err(_) => self.lines.iter().position(|line| line.address == address),
        }
    }

    /// Row of the line covering `address`.
    pub fn row_containing(&self, address: u16) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| usize::from(address.wrapping_sub(line.address)) < line.size)
    }

    fn header_size(&self) -> usize {
        if self.raw {
            0
        } else {
            2
        }
    }

    fn image_len(&self) -> usize {
        self.data.len().saturating_sub(self.header_size())
    }

    fn offset_of(&self, address: u16) -> usize {
        self.header_size() + usize::from(address.wrapping_sub(self.load_address))
    }

    fn address_of(&self, offset: usize) -> u16 {
        self.load_address
            .wrapping_add(offset.wrapping_sub(self.header_size()) as u16)
    }

    pub fn is_opcode(&self, offset: usize) -> bool {
        self.data
            .get(offset)
            .is_some_and(|byte| cpu::decode(*byte).is_legal())
    }

    /// Decodes the bytes at `offset` as `wanted`.
    ///
    /// An opcode request on an undefined opcode, or on an instruction that
    /// runs off the end of the image, falls back to a single byte. Every other
    /// width is clamped to what is left. `None` only when nothing is left.
    pub fn build_line(&mut self, offset: usize, wanted: Format) -> Option<Line> {
        let remaining = self.data.len().checked_sub(offset).filter(|n| *n > 0)?;
        if wanted == Format::Opcode && self.is_opcode(offset) {
            let ins = cpu::decode(self.data[offset]);
            if ins.size() <= remaining {
                return Some(self.opcode_line(offset, ins));
            }
        }
        let mut line = match wanted {
            Format::Opcode | Format::Byte => self.data_line(offset, 1),
            Format::Word => self.data_line(offset, remaining.min(2)),
            Format::MultiByte(len) => {
                let len = len.clamp(1, remaining);
                let operand = self.data[offset..offset + len]
                    .iter()
                    .map(|b| byte_lit(*b))
                    .collect::<Vec<_>>()
                    .join(",");
                self.new_line(offset, len, Format::MultiByte(len), format!(".BYTE {operand}"))
            }
            Format::Text(len) => {
                let len = len.clamp(1, remaining);
                let operand = text_run(&self.data[offset..offset + len]);
                self.new_line(offset, len, Format::Text(len), format!(".TEXT {operand}"))
            }
        };
        if wanted == Format::Opcode {
            line.requested = Format::Opcode;
        }
        tracing::trace!("{} {}", word_lit(line.address), line.operand);
        Some(line)
    }

    fn new_line(&self, offset: usize, size: usize, format: Format, operand: String) -> Line {
        Line {
            address: self.address_of(offset),
            size,
            row: 0,
            format,
            requested: format,
            label: String::new(),
            bytes: hex_bytes(&self.data[offset..offset + size]),
            operand,
            unresolved: false,
            immediate: None,
        }
    }

    /// `.BYTE` or `.WORD`, naming the value when it is a line address.
    fn data_line(&mut self, offset: usize, size: usize) -> Line {
        let (directive, value, literal, format) = if size == 1 {
            let byte = self.data[offset];
            (".BYTE", u16::from(byte), byte_lit(byte), Format::Byte)
        } else {
            let word = u16::from_le_bytes([self.data[offset], self.data[offset + 1]]);
            (".WORD", word, word_lit(word), Format::Word)
        };
        let operand = self.symbols.local_exact(value).unwrap_or(literal);
        self.new_line(offset, size, format, format!("{directive} {operand}"))
    }

    fn opcode_line(&mut self, offset: usize, ins: Instruction) -> Line {
        let address = self.address_of(offset);
        let lo = self.data.get(offset + 1).copied().unwrap_or(0);
        let hi = self.data.get(offset + 2).copied().unwrap_or(0);
        let word = u16::from_le_bytes([lo, hi]);

        let mut immediate = None;
        let (operand, found) = match ins.mode {
            Mode::Implied => (None, true),
            Mode::Accumulator => (Some("A".to_string()), true),
            Mode::Immediate => {
                immediate = Some((ins.mnemonic, lo));
                (Some(format!("#{}", byte_lit(lo))), true)
            }
            Mode::ZeroPage => self.operand(lo.into(), Width::Byte, "", ""),
            Mode::ZeroPageX => self.operand(lo.into(), Width::Byte, "", ",X"),
            Mode::ZeroPageY => self.operand(lo.into(), Width::Byte, "", ",Y"),
            Mode::ZeroPageIndirect => self.operand(lo.into(), Width::Byte, "(", ")"),
            Mode::ZeroPageIndirectX => self.operand(lo.into(), Width::Byte, "(", ",X)"),
            Mode::ZeroPageIndirectY => self.operand(lo.into(), Width::Byte, "(", "),Y"),
            Mode::Absolute => self.operand(word, Width::Word, "", ""),
            Mode::AbsoluteX => self.operand(word, Width::Word, "", ",X"),
            Mode::AbsoluteY => self.operand(word, Width::Word, "", ",Y"),
            Mode::Indirect => self.operand(word, Width::Word, "(", ")"),
            Mode::AbsoluteIndirectX => self.operand(word, Width::Word, "(", ",X)"),
            Mode::Relative => {
                let target = branch_target(address, 2, lo);
                self.operand(target, Width::Word, "", "")
            }
            Mode::ZeroPageRelative => {
                let zp = self.symbols.resolve(lo.into(), Width::Byte);
                let target = self.symbols.resolve(branch_target(address, 3, hi), Width::Word);
                (
                    Some(format!("{},{}", zp.text, target.text)),
                    zp.found && target.found,
                )
            }
        };

        let size = ins.size();
        let operand = match operand {
            Some(operand) => format!("{} {operand}", ins.mnemonic),
            None => ins.mnemonic.to_string(),
        };
        Line {
            unresolved: !found,
            immediate,
            ..self.new_line(offset, size, Format::Opcode, operand)
        }
    }

    fn operand(&mut self, addr: u16, width: Width, prefix: &str, suffix: &str) -> (Option<String>, bool) {
        let resolved = self.symbols.resolve(addr, width);
        (Some(format!("{prefix}{}{suffix}", resolved.text)), resolved.found)
    }
}

fn branch_target(address: u16, size: u16, displacement: u8) -> u16 {
    address
        .wrapping_add(size)
        .wrapping_add_signed(i16::from(displacement as i8))
}
