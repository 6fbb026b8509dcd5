//! The no-fixed-delta output adapter: after the main garble pass, each output wire gets a
//! fresh key pair unrelated to the global Free-XOR delta, connected to its old key pair by
//! an appended identity garbled gate. Breaks the `bothOutputKeys[0] XOR bothOutputKeys[1] ==
//! delta` relationship an adversary could otherwise exploit at the circuit's outputs.

use crate::block::Block;
use crate::cipher::FixedKeyCipher;
use crate::garble::gate_tweak;
use crate::keys::KeyPipeline;
use crate::tables::GarbledTables;

/// Signal-bit-indexed row selection, identical to the one used for ordinary tabled gates.
fn signal_value(pair: [Block; 2], signal: u8) -> u8 {
    if pair[0].signal_bit() == signal { 0 } else { 1 }
}

/// Draw a fresh key pair per output wire from `pipeline` and append one identity garbled
/// gate per output to `tables`, tweaked by `gate_tweak(num_tabled_gates + output_index)` so
/// the index space never collides with an ordinary tabled gate's tweak.
///
/// Returns the fresh key pairs, in the same order as `old_pairs`.
pub fn apply(
    cipher: &FixedKeyCipher,
    pipeline: &mut KeyPipeline,
    tables: &mut GarbledTables,
    num_tabled_gates: u32,
    old_pairs: &[[Block; 2]],
) -> Vec<[Block; 2]> {
    let mut fresh_pairs = Vec::with_capacity(old_pairs.len());
    for (i, &old_pair) in old_pairs.iter().enumerate() {
        let zero = pipeline.next_block();
        let one = pipeline.next_block().with_signal_bit(1 - zero.signal_bit());
        let fresh_pair = [zero, one];
        let k = gate_tweak(num_tabled_gates + i as u32);

        for s in 0..2u8 {
            let v = signal_value(old_pair, s);
            let hashed = cipher.hash(old_pair[v as usize], old_pair[v as usize], k);
            tables.push_gate_row(fresh_pair[v as usize] ^ hashed);
        }
        fresh_pairs.push(fresh_pair);
    }
    fresh_pairs
}

/// Decrypt the identity gate for every output wire, turning the main pass's output keys
/// into the adapter's fresh output keys.
pub fn compute(
    cipher: &FixedKeyCipher,
    tables: &GarbledTables,
    num_tabled_gates: u32,
    output_keys: &[Block],
) -> Vec<Block> {
    output_keys
        .iter()
        .enumerate()
        .map(|(i, &key)| {
            let k = gate_tweak(num_tabled_gates + i as u32);
            let row = key.signal_bit() as usize;
            let hashed = cipher.hash(key, key, k);
            tables.identity_row(i as u32, row) ^ hashed
        })
        .collect()
}

/// Reconstruct every identity gate's two rows from `old_pairs`/`fresh_pairs` and compare
/// against `tables`.
pub fn verify(
    cipher: &FixedKeyCipher,
    tables: &GarbledTables,
    num_tabled_gates: u32,
    old_pairs: &[[Block; 2]],
    fresh_pairs: &[[Block; 2]],
) -> bool {
    for (i, (&old_pair, &fresh_pair)) in old_pairs.iter().zip(fresh_pairs).enumerate() {
        let k = gate_tweak(num_tabled_gates + i as u32);
        for s in 0..2u8 {
            let v = signal_value(old_pair, s);
            let hashed = cipher.hash(old_pair[v as usize], old_pair[v as usize], k);
            if tables.identity_row(i as u32, s as usize) ^ hashed != fresh_pair[v as usize] {
                return false;
            }
        }
    }
    true
}
