//! JSON artifacts for handing keys and results between separate garbler/evaluator processes:
//! both keys per primary wire out of `garble`, and one key plus its translated bit per output
//! wire out of `compute`.
//!
//! Garbled tables and the translation table are raw byte buffers (see
//! `GarbledCircuit::garbled_tables`/`translation_table`) and are saved/loaded as plain files,
//! not JSON, since they carry no structure worth naming.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::block::Block;

/// Both keys for every wire in one set (primary inputs, or primary outputs), indexed by wire
/// id. Handed from the garbler to whoever holds the inputs (directly, or as the plaintext
/// side-channel of an OT handoff), or kept by the garbler itself to later `verify` its own
/// garbling.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireKeyArtifact {
    /// `wire_id -> [0-key, 1-key]`.
    pub keys: HashMap<u32, [Block; 2]>,
}

impl WireKeyArtifact {
    /// Build from parallel `wire_indices`/`pairs` slices (same order as
    /// `GarbledCircuit::input_indices`/`output_indices` and `GarbleArtifacts`).
    pub fn from_pairs(wire_indices: &[u32], pairs: &[[Block; 2]]) -> Self {
        let keys = wire_indices.iter().zip(pairs).map(|(&wire, &pair)| (wire, pair)).collect();
        Self { keys }
    }

    /// Save as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Turn this artifact into a `compute`/`internal_verify`-shaped slice: index `w` holds
    /// this wire's pair (or `None` if `w` isn't covered by this artifact).
    pub fn to_sparse_pairs(&self, arena_len: usize) -> Vec<Option<[Block; 2]>> {
        let mut out = vec![None; arena_len];
        for (&wire, &pair) in &self.keys {
            if (wire as usize) < arena_len {
                out[wire as usize] = Some(pair);
            }
        }
        out
    }

    /// Pick one key per wire (the bit `bits[i]` for `wire_indices[i]`), for `compute`'s
    /// one-key-per-wire input. `bits.len()` must match `wire_indices.len()`.
    pub fn to_sparse_single_keys(&self, wire_indices: &[u32], bits: &[bool], arena_len: usize) -> Vec<Option<Block>> {
        let mut out = vec![None; arena_len];
        for (&wire, &bit) in wire_indices.iter().zip(bits) {
            if let Some(pair) = self.keys.get(&wire) {
                out[wire as usize] = Some(pair[bit as usize]);
            }
        }
        out
    }
}

/// One key per output wire plus the bit it translates to, indexed by wire id. What `compute`
/// produces and what a verifier compares against after an honest evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationArtifact {
    /// `wire_id -> (key, translated bit)`.
    pub output_results: HashMap<u32, OutputResult>,
}

/// A single evaluated output wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutputResult {
    /// The key `compute` produced for this wire.
    pub key: Block,
    /// The bit this key translates to under the circuit's translation table.
    pub bit: bool,
}

impl EvaluationArtifact {
    /// Build from parallel `output_indices`/`keys`/`bits` slices (same order as
    /// `GarbledCircuit::output_indices`/`compute`/`translate`).
    pub fn from_results(output_indices: &[u32], keys: &[Block], bits: &[bool]) -> Self {
        let output_results = output_indices
            .iter()
            .zip(keys)
            .zip(bits)
            .map(|((&wire, &key), &bit)| (wire, OutputResult { key, bit }))
            .collect();
        Self { output_results }
    }

    /// Save as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Print a one-line-per-wire summary, in ascending wire-id order.
    pub fn print_summary(&self) {
        let mut wires: Vec<_> = self.output_results.keys().copied().collect();
        wires.sort_unstable();
        for wire in wires {
            let result = &self.output_results[&wire];
            println!("wire {wire}: {}", result.bit);
        }
    }
}
