use std::collections::BTreeMap;

use crate::engine::InstructionRow;

/// The disassembled listing of the loaded program. Built once per load and
/// replaced wholesale on the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    rows: Vec<InstructionRow>,
    /// Row start address to row index.
    index: BTreeMap<u16, usize>,
}

impl ProgramImage {
    pub fn new(rows: Vec<InstructionRow>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.address, i))
            .collect();
        Self { rows, index }
    }

    pub fn rows(&self) -> &[InstructionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the row starting exactly at `addr`.
    pub fn row_index(&self, addr: u16) -> Option<usize> {
        self.index.get(&addr).copied()
    }

    pub fn row_at(&self, addr: u16) -> Option<&InstructionRow> {
        self.row_index(addr).map(|i| &self.rows[i])
    }

    /// The row whose bytes include `addr`, if any.
    pub fn covering(&self, addr: u16) -> Option<&InstructionRow> {
        let (_, &i) = self.index.range(..=addr).next_back()?;
        let row = &self.rows[i];
        row.covers(addr).then_some(row)
    }

    pub fn first_address(&self) -> Option<u16> {
        self.rows.first().map(|row| row.address)
    }
}

/// Where execution is and which row the user picked. The two are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressCursor {
    /// Next instruction to execute.
    pub current: u16,
    /// User-chosen row, the target for run-to-target.
    pub selected: Option<u16>,
}
