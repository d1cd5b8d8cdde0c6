use std::io::Write;

use tracing::info;

use super::Listing;
use crate::{
    error::DisasmError,
    line::{Format, Line},
};

/// A line as persisted: where it starts, how many bytes it takes and the
/// packed format it asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedLine {
    pub address: u16,
    pub size: usize,
    pub tag: u32,
}

/// Everything needed to bring a listing back without redoing the reformats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub load_address: u16,
    pub raw: bool,
    pub data: Vec<u8>,
    pub lines: Vec<SavedLine>,
}

impl Listing {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            load_address: self.load_address,
            raw: self.raw,
            data: self.data.clone(),
            lines: self
                .lines
                .iter()
                .map(|line| SavedLine {
                    address: line.address,
                    size: line.size,
                    tag: line.requested.tag(),
                })
                .collect(),
        }
    }

    /// Reinstates a snapshot. The saved layout is taken as is and resynced,
    /// so labels and operands are regenerated but no reformat is replayed.
    ///
    /// A snapshot whose lines do not add up to its image is refused and the
    /// current listing stays.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), DisasmError> {
        let header = if snapshot.raw { 0 } else { 2 };
        let expected = snapshot.data.len().saturating_sub(header);
        if expected == 0 {
            return Err(DisasmError::Empty);
        }
        let covered = snapshot.lines.iter().map(|line| line.size).sum::<usize>();
        if covered != expected || snapshot.lines.iter().any(|line| line.size == 0) {
            return Err(DisasmError::Coverage { covered, expected });
        }
        info!(
            "restoring {} lines at ${:04X}",
            snapshot.lines.len(),
            snapshot.load_address
        );

        self.data = snapshot.data;
        self.raw = snapshot.raw;
        self.load_address = snapshot.load_address;
        self.symbols.clear();
        self.symbols
            .set_local_span(self.load_address, self.image_len());
        self.lines = snapshot
            .lines
            .into_iter()
            .map(|saved| {
                let format = Format::from_tag(saved.tag);
                Line {
                    address: saved.address,
                    size: saved.size,
                    row: 0,
                    format,
                    requested: format,
                    label: String::new(),
                    bytes: String::new(),
                    operand: String::new(),
                    unresolved: false,
                    immediate: None,
                }
            })
            .collect();
        self.sync_rows_labels()
    }

    /// Writes the listing as assembler source: a header naming `name`, the
    /// external symbol block, then one line per row.
    pub fn write_source<W: Write>(&self, out: &mut W, name: &str) -> Result<(), DisasmError> {
        writeln!(out, "; File created from {name} by dis6502")?;
        writeln!(out)?;
        for line in &self.external {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        for line in self.visible_lines() {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        Ok(())
    }
}
