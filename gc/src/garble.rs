//! The garble engine: walks the topologically ordered gate list once, filling the wire-key
//! arena and emitting one garbled table per tabled gate.

use crate::block::Block;
use crate::cipher::FixedKeyCipher;
use crate::circuit::{Circuit, Gate};
use crate::keys::KeyPipeline;
use crate::tables::GarbledTables;

/// Output of a single garble pass: both keys for every wire, and the garbled tables.
#[derive(Debug)]
pub struct GarbleOutput {
    /// Both keys for every wire, indexed by wire id (`None` for unreferenced wire slots).
    pub both_wires: Vec<Option<[Block; 2]>>,
    /// Garbled tables for the ordinary (non-free) gates, in gate order.
    pub tables: GarbledTables,
}

/// Garble every gate of `circuit` in topological order, consuming tweak/output-key blocks
/// from `pipeline` as needed.
pub fn garble_gates(cipher: &FixedKeyCipher, circuit: &Circuit, pipeline: &mut KeyPipeline) -> GarbleOutput {
    let arena_len = circuit.last_wire_index as usize + 1;
    let mut both_wires: Vec<Option<[Block; 2]>> = vec![None; arena_len];
    for (&wire, &keys) in &pipeline.input_keys {
        both_wires[wire as usize] = Some(keys);
    }

    let rows_per_gate = if circuit.flags.is_free_xor { 3 } else { 4 };
    let mut tables = GarbledTables::with_capacity(rows_per_gate, circuit.num_of_tabled_gates(), 0);

    let mut tabled_index = 0u32;
    for gate in &circuit.gates {
        if circuit.gate_is_free(gate) {
            garble_free_gate(&mut both_wires, gate, pipeline.delta);
        } else {
            let k = gate_tweak(tabled_index);
            garble_tabled_gate(cipher, &mut both_wires, &mut tables, gate, pipeline, circuit.flags.is_free_xor, k);
            tabled_index += 1;
        }
    }

    GarbleOutput { both_wires, tables }
}

/// The public, deterministic per-gate Davies-Meyer tweak for the tabled gate at position
/// `tabled_index` among a circuit's tabled gates (0-indexed, topological order). Shared by
/// garble, compute and verify so none of them need the seed to agree on it.
pub fn gate_tweak(tabled_index: u32) -> Block {
    Block::from_index(tabled_index as u64)
}

fn garble_free_gate(both_wires: &mut [Option<[Block; 2]>], gate: &Gate, delta: Block) {
    if gate.is_not() {
        let a = both_wires[gate.in_a as usize].expect("topological order guarantees input is set");
        both_wires[gate.out as usize] = Some([a[1], a[0]]);
        return;
    }

    let a = both_wires[gate.in_a as usize].expect("topological order guarantees input is set");
    let b = both_wires[gate.in_b.unwrap() as usize].expect("topological order guarantees input is set");
    let zero = if gate.tt == 9 {
        a[0] ^ b[0] ^ delta
    } else {
        a[0] ^ b[0]
    };
    both_wires[gate.out as usize] = Some([zero, zero ^ delta]);
}

fn garble_tabled_gate(
    cipher: &FixedKeyCipher,
    both_wires: &mut [Option<[Block; 2]>],
    tables: &mut GarbledTables,
    gate: &Gate,
    pipeline: &mut KeyPipeline,
    is_free_xor: bool,
    k: Block,
) {
    let in_b = gate.in_b.unwrap_or(gate.in_a);
    let a_pair = both_wires[gate.in_a as usize].expect("topological order guarantees input is set");
    let b_pair = both_wires[in_b as usize].expect("topological order guarantees input is set");

    if !is_free_xor {
        // No free row to omit here (all four rows are stored), but point-and-permute still
        // requires the pair's two signal bits to differ.
        let zero = pipeline.next_block();
        let one = pipeline.next_block().with_signal_bit(1 - zero.signal_bit());
        both_wires[gate.out as usize] = Some([zero, one]);

        for sa in 0..2u8 {
            for sb in 0..2u8 {
                let va = signal_value(a_pair, sa);
                let vb = signal_value(b_pair, sb);
                let ka = a_pair[va as usize];
                let kb = b_pair[vb as usize];
                let vc = gate.eval_row(va, vb);
                let kc = both_wires[gate.out as usize].unwrap()[vc as usize];
                tables.push_gate_row(kc ^ cipher.hash(ka, kb, k));
            }
        }
        return;
    }

    // Free-XOR point-and-permute: the (sa,sb) = (0,0) row defines the output key pair
    // directly from the hash, so it needs no stored ciphertext.
    for sa in 0..2u8 {
        for sb in 0..2u8 {
            let va = signal_value(a_pair, sa);
            let vb = signal_value(b_pair, sb);
            let ka = a_pair[va as usize];
            let kb = b_pair[vb as usize];
            let vc = gate.eval_row(va, vb);

            if sa == 0 && sb == 0 {
                let key = cipher.hash(ka, kb, k);
                let mut pair = [Block::ZERO; 2];
                pair[vc as usize] = key;
                pair[1 - vc as usize] = key ^ pipeline.delta;
                both_wires[gate.out as usize] = Some(pair);
                continue;
            }

            let kc = both_wires[gate.out as usize].unwrap()[vc as usize];
            tables.push_gate_row(kc ^ cipher.hash(ka, kb, k));
        }
    }
}

/// The logical value `v` such that `pair[v].signal_bit() == signal`.
fn signal_value(pair: [Block; 2], signal: u8) -> u8 {
    if pair[0].signal_bit() == signal { 0 } else { 1 }
}
