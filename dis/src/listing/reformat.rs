use tracing::debug;

use super::Listing;
use crate::{cpu, error::DisasmError, line::Format, queue::FormatRequest};

impl Listing {
    /// Re-decodes the line at `row` as `format` and resyncs.
    pub fn format_line(&mut self, row: usize, format: Format) -> Result<(), DisasmError> {
        self.splice(row, format)?;
        self.sync_rows_labels()
    }

    /// Like [`Listing::format_line`] for the line starting at `address`.
    pub fn format_at(&mut self, address: u16, format: Format) -> Result<(), DisasmError> {
        let row = self
            .row_of(address)
            .ok_or(DisasmError::UnknownAddress(address))?;
        self.format_line(row, format)
    }

    /// Replaces the line at `row` without resyncing.
    ///
    /// A shorter line leaves bytes behind, which become single byte lines. A
    /// longer one swallows as many following lines as it needs, and whatever
    /// it takes of the last of them beyond that is covered with bytes too.
    /// Only the rows touched are reindexed. Nothing changes if the line itself
    /// cannot be decoded.
    pub(crate) fn splice(&mut self, row: usize, format: Format) -> Result<(), DisasmError> {
        let old = self.lines.get(row).ok_or(DisasmError::UnknownRow(row))?;
        let old_size = old.size;
        let offset = self.offset_of(old.address);
        let line = self
            .build_line(offset, format)
            .ok_or(DisasmError::Decode { offset, format })?;
        let new_size = line.size;
        debug!("row {row}: {} -> {}", self.lines[row].format, line.format);
        self.lines[row] = line;

        let mut pending = 0;
        if new_size < old_size {
            pending = old_size - new_size;
        } else {
            let mut needed = new_size - old_size;
            while needed > 0 && row + 1 < self.lines.len() {
                let next = self.lines.remove(row + 1);
                if next.size > needed {
                    pending = next.size - needed;
                    needed = 0;
                } else {
                    needed -= next.size;
                }
            }
        }

        let start = offset + new_size;
        for i in 0..pending {
            let filler = self
                .build_line(start + i, Format::Byte)
                .ok_or(DisasmError::Decode {
                    offset: start + i,
                    format: Format::Byte,
                })?;
            self.lines.insert(row + 1 + i, filler);
        }
        self.reindex(row..row + 1 + pending);
        Ok(())
    }

    /// Turns a selection of rows into queue requests.
    ///
    /// Runs and text are merged into one request per contiguous group of
    /// rows, spanning all of its bytes. The other formats are laid end to end
    /// over each group; bytes at the end of a group too short for one more
    /// item are requested as single bytes.
    pub fn plan_selection(&self, rows: &[usize], format: Format) -> Vec<FormatRequest> {
        let mut rows = rows
            .iter()
            .copied()
            .filter(|row| *row < self.lines.len())
            .collect::<Vec<_>>();
        rows.sort_unstable();
        rows.dedup();

        let mut requests = Vec::new();
        for group in rows.chunk_by(|a, b| a + 1 == *b) {
            let first = &self.lines[group[0]];
            let start = self.offset_of(first.address);
            let end = group
                .iter()
                .map(|row| self.lines[*row].size)
                .sum::<usize>()
                + start;

            if format.run_len().is_some() {
                requests.push(FormatRequest {
                    address: first.address,
                    format: format.with_run_len(end - start),
                });
                continue;
            }

            let mut offset = start;
            while offset < end {
                let size = self.natural_size(offset, format);
                if offset + size > end {
                    requests.extend((offset..end).map(|offset| FormatRequest {
                        address: self.address_of(offset),
                        format: Format::Byte,
                    }));
                    break;
                }
                requests.push(FormatRequest {
                    address: self.address_of(offset),
                    format,
                });
                offset += size;
            }
        }
        requests
    }

    /// Bytes a line of `format` at `offset` would take.
    fn natural_size(&self, offset: usize, format: Format) -> usize {
        let remaining = self.data.len().saturating_sub(offset);
        match format {
            Format::Opcode if self.is_opcode(offset) => {
                let size = cpu::decode(self.data[offset]).size();
                if size <= remaining {
                    size
                } else {
                    1
                }
            }
            Format::Opcode | Format::Byte => 1,
            Format::Word => 2,
            Format::MultiByte(len) | Format::Text(len) => len.clamp(1, remaining.max(1)),
        }
    }
}
