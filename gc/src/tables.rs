//! The garbled-table byte buffer: row-major by (tabled gate index, row index), with the
//! no-fixed-delta adapter's identity-gate rows appended after the ordinary gates.

use crate::block::Block;
use crate::constants::KEY_SIZE;
use crate::error::GcError;

/// Garbled tables for one circuit instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarbledTables {
    rows: Vec<Block>,
    /// 3 under Free-XOR (point-and-permute omits the `(0,0)`-signal row), 4 otherwise.
    pub rows_per_gate: usize,
    /// Number of ordinary (non-free) gates with a table.
    pub num_tabled_gates: u32,
    /// Number of no-fixed-delta identity gates appended after the ordinary gates
    /// (0 unless the adapter is active).
    pub num_identity_gates: u32,
}

impl GarbledTables {
    /// Build an empty table buffer sized for `num_tabled_gates` ordinary gates (each
    /// `rows_per_gate` rows) plus `num_identity_gates` identity gates (each 2 rows).
    pub(crate) fn with_capacity(rows_per_gate: usize, num_tabled_gates: u32, num_identity_gates: u32) -> Self {
        let total_rows = rows_per_gate * num_tabled_gates as usize + 2 * num_identity_gates as usize;
        Self {
            rows: Vec::with_capacity(total_rows),
            rows_per_gate,
            num_tabled_gates,
            num_identity_gates,
        }
    }

    pub(crate) fn push_gate_row(&mut self, row: Block) {
        self.rows.push(row);
    }

    /// Row `row` (0-indexed, already adjusted for the Free-XOR omission) of ordinary gate
    /// `gate_index` (0-indexed among tabled gates).
    pub fn gate_row(&self, gate_index: u32, row: usize) -> Block {
        self.rows[gate_index as usize * self.rows_per_gate + row]
    }

    /// Row `row` (0 or 1) of the identity gate for output wire position `output_index`.
    pub fn identity_row(&self, output_index: u32, row: usize) -> Block {
        let base = self.rows_per_gate * self.num_tabled_gates as usize;
        self.rows[base + output_index as usize * 2 + row]
    }

    /// Flatten to the raw byte buffer described by the external circuit-file format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.rows.len() * KEY_SIZE);
        for block in &self.rows {
            out.extend_from_slice(block.as_bytes());
        }
        out
    }

    /// Rebuild a table buffer from raw bytes, validating its length against the shape a
    /// freshly loaded circuit instance expects.
    pub fn from_bytes(
        bytes: &[u8],
        rows_per_gate: usize,
        num_tabled_gates: u32,
        num_identity_gates: u32,
    ) -> Result<Self, GcError> {
        let expected_rows = rows_per_gate * num_tabled_gates as usize + 2 * num_identity_gates as usize;
        let expected_bytes = expected_rows * KEY_SIZE;
        if bytes.len() != expected_bytes {
            return Err(GcError::SizeMismatch {
                expected: expected_bytes,
                actual: bytes.len(),
            });
        }
        let rows = bytes
            .chunks_exact(KEY_SIZE)
            .map(|chunk| {
                let mut buf = [0u8; KEY_SIZE];
                buf.copy_from_slice(chunk);
                Block::new(buf)
            })
            .collect();
        Ok(Self {
            rows,
            rows_per_gate,
            num_tabled_gates,
            num_identity_gates,
        })
    }
}
