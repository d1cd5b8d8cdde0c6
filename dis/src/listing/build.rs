use std::ops::Range;

use tracing::{debug, error, warn};

use super::{Listing, Phase};
use crate::{
    error::DisasmError,
    line::{Format, Line},
};

/// Two immediate loads at most this many rows apart may form a pointer.
pub const POINTER_PAIR_WINDOW: usize = 3;

impl Listing {
    /// Decodes the whole image as code, then resyncs.
    pub fn build(&mut self) -> Result<(), DisasmError> {
        self.phase = Phase::Building;
        let decoded = self.decode_all();
        self.phase = Phase::Idle;
        self.lines = decoded?;
        debug!("built {} lines", self.lines.len());
        self.sync_rows_labels()
    }

    fn decode_all(&mut self) -> Result<Vec<Line>, DisasmError> {
        let mut lines = Vec::new();
        let mut offset = self.header_size();
        while offset < self.data.len() {
            let Some(line) = self.build_line(offset, Format::Opcode) else {
                error!("failed to disassemble at offset {offset}");
                return Err(DisasmError::Decode {
                    offset,
                    format: Format::Opcode,
                });
            };
            offset += line.size;
            lines.push(line);
        }
        Ok(lines)
    }

    /// Recomputes addresses, rows, labels and symbol usage from the current
    /// line layout.
    ///
    /// Every line is decoded again with the format it asked for, since operands
    /// can only name a label once the label table matches the layout. Does
    /// nothing while a full build is running. On a decode failure the previous
    /// lines are kept.
    pub fn sync_rows_labels(&mut self) -> Result<(), DisasmError> {
        if self.phase == Phase::Building {
            debug!("resync skipped during build");
            return Ok(());
        }

        self.reindex(0..self.lines.len());
        self.symbols
            .rebuild_local(self.lines.iter().map(|line| line.address));

        let mut offset = self.header_size();
        let plan = self
            .lines
            .iter()
            .map(|line| {
                let at = offset;
                offset += line.size;
                (at, line.requested)
            })
            .collect::<Vec<_>>();

        let mut lines: Vec<Line> = Vec::with_capacity(plan.len());
        let mut false_run = 0;
        for (offset, requested) in plan {
            let Some(mut line) = self.build_line(offset, requested) else {
                error!("failed to disassemble {requested} at offset {offset}");
                return Err(DisasmError::Decode {
                    offset,
                    format: requested,
                });
            };
            if line.requested == Format::Opcode
                && (line.format != Format::Opcode || self.data[offset] == 0x00)
            {
                false_run += 1;
            } else {
                false_run = 0;
            }
            if false_run >= 2 {
                line.unresolved = true;
                if let Some(prev) = lines.last_mut() {
                    prev.unresolved = true;
                }
            }
            lines.push(line);
        }

        self.pair_pointers(&mut lines);
        for line in &mut lines {
            if self.symbols.is_used_local(line.address) {
                if let Some(label) = self.symbols.local(line.address) {
                    line.label = label.to_string();
                }
            }
        }

        self.lines = lines;
        self.reindex(0..self.lines.len());
        self.external = self.symbols.external_listing(self.load_address);
        self.check();
        Ok(())
    }

    /// Rewrites nearby immediate loads that together spell a local address as
    /// `#<LABEL` and `#>LABEL`. Little-endian order is tried first.
    fn pair_pointers(&mut self, lines: &mut [Line]) {
        let loads = lines
            .iter()
            .enumerate()
            .filter_map(|(row, line)| line.immediate.map(|(m, value)| (row, m, value)))
            .collect::<Vec<_>>();

        let mut i = 0;
        while i + 1 < loads.len() {
            let (lo_row, lo_m, lo) = loads[i];
            let (hi_row, hi_m, hi) = loads[i + 1];
            if hi_row - lo_row > POINTER_PAIR_WINDOW {
                i += 1;
                continue;
            }
            let forms = if let Some(label) = self.symbols.local_exact(u16::from_le_bytes([lo, hi])) {
                Some((label, "<", ">"))
            } else {
                self.symbols
                    .local_exact(u16::from_le_bytes([hi, lo]))
                    .map(|label| (label, ">", "<"))
            };
            match forms {
                Some((label, first, second)) => {
                    lines[lo_row].operand = format!("{lo_m} #{first}{label}");
                    lines[hi_row].operand = format!("{hi_m} #{second}{label}");
                    i += 2;
                }
                None => i += 1,
            }
        }
    }

    /// Gives every line in `rows` its position and the address following the
    /// line before it.
    pub(crate) fn reindex(&mut self, rows: Range<usize>) {
        let end = rows.end.min(self.lines.len());
        let mut address = match rows.start.checked_sub(1).and_then(|prev| self.lines.get(prev)) {
            Some(prev) => prev.address.wrapping_add(prev.size as u16),
            None => self.load_address,
        };
        for row in rows.start..end {
            let line = &mut self.lines[row];
            line.row = row;
            line.address = address;
            address = address.wrapping_add(line.size as u16);
        }
    }

    /// Checks that rows count up from zero, each line starts where the last
    /// one ended and the lines cover the whole image.
    pub fn validate(&self) -> Result<(), DisasmError> {
        let mut expected = self.load_address;
        let mut covered = 0;
        for (row, line) in self.lines.iter().enumerate() {
            if line.row != row {
                return Err(DisasmError::RowOutOfSync {
                    row: line.row,
                    expected: row,
                });
            }
            if line.address != expected {
                return Err(DisasmError::AddressOutOfSync {
                    row,
                    address: line.address,
                    expected,
                });
            }
            expected = expected.wrapping_add(line.size as u16);
            covered += line.size;
        }
        if covered != self.image_len() {
            return Err(DisasmError::Coverage {
                covered,
                expected: self.image_len(),
            });
        }
        Ok(())
    }

    fn check(&mut self) {
        self.violation = match self.validate() {
            Ok(()) => None,
            Err(err) => {
                warn!("listing hidden: {err}");
                Some(err)
            }
        };
    }
}
