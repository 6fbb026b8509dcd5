//! Plaintext circuit evaluation, for comparing against garbled evaluation in these tests.

use std::collections::HashMap;

use gc::circuit::Circuit;

/// Evaluate every gate of `circuit` directly on bits, given one bit per input wire.
///
/// # Panics
/// Panics if `circuit` names an input wire with no entry in `input_bits` — tests control both
/// the circuit and its inputs, so a missing bit is a test bug, not a runtime condition to
/// handle gracefully.
pub fn evaluate_plain_circuit(circuit: &Circuit, input_bits: &HashMap<u32, bool>) -> HashMap<u32, bool> {
    let mut wires: Vec<bool> = vec![false; circuit.last_wire_index as usize + 1];

    for &wire in &circuit.input_indices {
        let bit = *input_bits
            .get(&wire)
            .unwrap_or_else(|| panic!("missing input bit for wire {wire}"));
        wires[wire as usize] = bit;
    }

    for gate in &circuit.gates {
        let va = wires[gate.in_a as usize] as u8;
        let vb = gate.in_b.map(|b| wires[b as usize] as u8).unwrap_or(0);
        wires[gate.out as usize] = gate.eval_row(va, vb) == 1;
    }

    circuit.output_indices.iter().map(|&w| (w, wires[w as usize])).collect()
}
