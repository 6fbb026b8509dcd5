//! The compute (evaluation) engine: given one key per wire (the garbler's side-channel
//! choice for inputs, or an evaluator's OT-received keys), walks the same topological gate
//! order as garbling and derives one key per wire, consuming no seed at all.

use crate::block::Block;
use crate::cipher::FixedKeyCipher;
use crate::circuit::{Circuit, Gate};
use crate::error::GcError;
use crate::garble::gate_tweak;
use crate::tables::GarbledTables;

/// Evaluate every gate of `circuit` in topological order against `input_keys` (one key per
/// wire, indexed by wire id; entries beyond the primary inputs are filled in as gates are
/// evaluated). Returns one key per output wire, in `circuit.output_indices` order.
pub fn compute(
    cipher: &FixedKeyCipher,
    circuit: &Circuit,
    tables: &GarbledTables,
    input_keys: &[Option<Block>],
) -> Result<Vec<Block>, GcError> {
    let arena_len = circuit.last_wire_index as usize + 1;
    let mut wires: Vec<Option<Block>> = vec![None; arena_len];
    for &wire in &circuit.input_indices {
        let key = input_keys
            .get(wire as usize)
            .copied()
            .flatten()
            .ok_or(GcError::WireIndexOutOfRange { index: wire, last: circuit.last_wire_index })?;
        wires[wire as usize] = Some(key);
    }

    let mut tabled_index = 0u32;
    for gate in &circuit.gates {
        if circuit.gate_is_free(gate) {
            compute_free_gate(&mut wires, gate);
        } else {
            let k = gate_tweak(tabled_index);
            compute_tabled_gate(cipher, &mut wires, tables, gate, tabled_index, k)?;
            tabled_index += 1;
        }
    }

    circuit
        .output_indices
        .iter()
        .map(|&wire| wires[wire as usize].ok_or(GcError::StateError))
        .collect()
}

fn compute_free_gate(wires: &mut [Option<Block>], gate: &Gate) {
    let a = wires[gate.in_a as usize].expect("topological order guarantees input is set");
    if gate.is_not() {
        wires[gate.out as usize] = Some(a);
        return;
    }
    let b = wires[gate.in_b.unwrap() as usize].expect("topological order guarantees input is set");
    wires[gate.out as usize] = Some(a ^ b);
}

fn compute_tabled_gate(
    cipher: &FixedKeyCipher,
    wires: &mut [Option<Block>],
    tables: &GarbledTables,
    gate: &Gate,
    tabled_index: u32,
    k: Block,
) -> Result<(), GcError> {
    let in_b = gate.in_b.unwrap_or(gate.in_a);
    let ka = wires[gate.in_a as usize].expect("topological order guarantees input is set");
    let kb = wires[in_b as usize].expect("topological order guarantees input is set");

    let sa = ka.signal_bit();
    let sb = kb.signal_bit();
    let row = (sa * 2 + sb) as usize;

    let rows_per_gate = tables.rows_per_gate;
    let is_free_xor = rows_per_gate == 3;

    let hashed = cipher.hash(ka, kb, k);

    if is_free_xor && row == 0 {
        wires[gate.out as usize] = Some(hashed);
        return Ok(());
    }

    let stored_row = if is_free_xor { row - 1 } else { row };
    let ciphertext = tables.gate_row(tabled_index, stored_row);
    wires[gate.out as usize] = Some(ciphertext ^ hashed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitFlags;
    use crate::garble::garble_gates;
    use crate::keys::KeyPipeline;
    use std::io::Write;

    fn circuit_from(content: &str, flags: CircuitFlags) -> Circuit {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        Circuit::load_with_flags(f.path(), flags).unwrap()
    }

    const AND_CIRCUIT: &str = "1 1\n0 2\n0\n1\n1\n2\n2 1 0 1 2 0001\n";

    #[test]
    fn and_gate_computes_correct_output_for_every_input_combo() {
        let circuit = circuit_from(AND_CIRCUIT, CircuitFlags::standard());
        let cipher = FixedKeyCipher::new(Block::new([0x11; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        for a in 0..2usize {
            for b in 0..2usize {
                let mut input_keys = vec![None; circuit.last_wire_index as usize + 1];
                input_keys[0] = Some(out.both_wires[0].unwrap()[a]);
                input_keys[1] = Some(out.both_wires[1].unwrap()[b]);

                let result = compute(&cipher, &circuit, &out.tables, &input_keys).unwrap();
                let expected_key = out.both_wires[2].unwrap()[a & b];
                assert_eq!(result[0], expected_key);
            }
        }
    }

    #[test]
    fn xor_chain_computes_without_tables() {
        let content = "1 1\n0 3\n0\n1\n2\n1\n3\n2 1 0 1 3 0110\n";
        let circuit = circuit_from(content, CircuitFlags::standard());
        let cipher = FixedKeyCipher::new(Block::new([0x12; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        let mut input_keys = vec![None; circuit.last_wire_index as usize + 1];
        input_keys[0] = Some(out.both_wires[0].unwrap()[1]);
        input_keys[1] = Some(out.both_wires[1].unwrap()[0]);

        let result = compute(&cipher, &circuit, &out.tables, &input_keys).unwrap();
        assert_eq!(result[0], out.both_wires[3].unwrap()[1]);
    }

    #[test]
    fn no_free_xor_and_gate_computes_correct_output() {
        let flags = CircuitFlags { is_free_xor: false, ..CircuitFlags::standard() };
        let circuit = circuit_from(AND_CIRCUIT, flags);
        let cipher = FixedKeyCipher::new(Block::new([0x13; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        let mut input_keys = vec![None; circuit.last_wire_index as usize + 1];
        input_keys[0] = Some(out.both_wires[0].unwrap()[1]);
        input_keys[1] = Some(out.both_wires[1].unwrap()[1]);

        let result = compute(&cipher, &circuit, &out.tables, &input_keys).unwrap();
        assert_eq!(result[0], out.both_wires[2].unwrap()[1]);
    }
}
