//! Seeded key generation: the Free-XOR delta, input-wire key pairs, and the fresh
//! output-key blocks consumed during garbling when Free-XOR is off or the no-fixed-delta
//! adapter is active.
//!
//! The per-gate Davies-Meyer tweak is *not* drawn from here: `compute` and `verify` must
//! be able to run on a circuit instance that only ever saw `set_garbled_tables` and never
//! the seed (the cross-party handoff case), so the tweak is a public value derived from
//! the gate's position (see `crate::garble::gate_tweak`), not secret PRG output.

use std::collections::HashMap;

use crate::block::Block;
use crate::cipher::FixedKeyCipher;
use crate::circuit::Circuit;

/// Delta, input-wire key pairs, and the remaining keystream the garble engine draws on
/// gate-by-gate (in topological order) for per-gate tweaks, fresh output-key pairs, and
/// no-fixed-delta identity-gate keys.
#[derive(Debug)]
pub struct KeyPipeline {
    /// The Free-XOR delta (signal bit forced to 1).
    pub delta: Block,
    /// `wire -> (0-key, 1-key)` for every primary input wire.
    pub input_keys: HashMap<u32, [Block; 2]>,
    remaining: std::vec::IntoIter<Block>,
}

impl KeyPipeline {
    /// Derive delta, input keys, and the fresh-key stream from `seed` for `circuit`.
    ///
    /// Consumes exactly one ECB batch from `cipher`, pre-staging every PRG-derived block
    /// the garbler will need before the gate walk begins.
    pub fn build(cipher: &FixedKeyCipher, circuit: &Circuit) -> Self {
        // Block 0 of the PRG stream derives delta; the rest covers two blocks per input
        // wire, two fresh output-key blocks per tabled gate when Free-XOR is off (under
        // Free-XOR the tabled-gate output key comes from the hash instead), and (if the
        // no-fixed-delta adapter is active) two fresh keys per output wire.
        let gate_blocks = if circuit.flags.is_free_xor {
            0
        } else {
            2 * circuit.num_of_tabled_gates() as usize
        };
        let adapter_blocks = if circuit.flags.is_non_xor_outputs_required {
            2 * circuit.number_of_outputs() as usize
        } else {
            0
        };
        let total = 1 + 2 * circuit.number_of_inputs() as usize + gate_blocks + adapter_blocks;

        let index_array: Vec<Block> = (0..total as u64).map(Block::from_index).collect();
        let mut stream = cipher.prg_ecb(&index_array).into_iter();

        let delta = stream.next().expect("PRG stream covers delta block").with_signal_bit(1);

        let mut input_keys = HashMap::with_capacity(circuit.input_indices.len());
        for &wire in &circuit.input_indices {
            let zero_key = stream.next().expect("PRG stream covers input 0-key");
            let one_key_raw = stream.next().expect("PRG stream covers input 1-key");
            let one_key = if circuit.flags.is_free_xor {
                zero_key ^ delta
            } else {
                one_key_raw.with_signal_bit(1 - zero_key.signal_bit())
            };
            input_keys.insert(wire, [zero_key, one_key]);
        }

        Self {
            delta,
            input_keys,
            remaining: stream,
        }
    }

    /// Draw the next PRG block from the pipeline. Exhausting the stream is a PRG-sizing
    /// bug in the engine, not a caller error, so this panics rather than returning `Err`.
    pub fn next_block(&mut self) -> Block {
        self.remaining
            .next()
            .expect("key pipeline PRG stream exhausted before garbling completed")
    }
}
