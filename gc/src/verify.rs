//! The verify engine: given both keys per input wire, walks the circuit deriving both keys
//! of every wire from the stored garbled tables, rather than from a secret seed. A mismatch
//! anywhere is reported as `false`, never as an error — a tampered table is an expected
//! outcome of this check, not a bug.
//!
//! Unlike `compute`, which only ever holds one key per wire, `verify` can cross-check: at a
//! tabled gate the four (signal-bit) rows are four independent decryptions of the same
//! underlying output-key pair, so any two that land on the same logical output value must
//! agree, and the two recovered keys must carry different signal bits (point-and-permute).
//! Under Free-XOR the `(sa, sb) = (0, 0)` row has no stored ciphertext; its key comes
//! straight out of the hash, exactly as it did when the garbler defined it.

use crate::block::Block;
use crate::cipher::FixedKeyCipher;
use crate::circuit::{Circuit, Gate};
use crate::garble::gate_tweak;
use crate::tables::GarbledTables;

/// Walk `circuit` from `both_input_keys` (both keys per primary input wire; entries for
/// other wires are ignored and overwritten), deriving both keys for every wire and checking
/// every tabled-gate row against `tables` as it goes.
///
/// Returns `(true, both_wires)` if every row and every point-and-permute check passes,
/// `(false, partial_wires)` otherwise (the partial arena is returned for diagnostics but
/// must not be trusted by the caller).
pub fn internal_verify(
    cipher: &FixedKeyCipher,
    circuit: &Circuit,
    tables: &GarbledTables,
    both_input_keys: &[Option<[Block; 2]>],
) -> (bool, Vec<Option<[Block; 2]>>) {
    let arena_len = circuit.last_wire_index as usize + 1;
    let mut both_wires: Vec<Option<[Block; 2]>> = vec![None; arena_len];

    for &wire in &circuit.input_indices {
        match both_input_keys.get(wire as usize).copied().flatten() {
            Some(pair) if pair[0].signal_bit() != pair[1].signal_bit() => {
                both_wires[wire as usize] = Some(pair);
            }
            _ => return (false, both_wires),
        }
    }

    // Under Free-XOR every wire's pair differs by the same delta; derive it once from any
    // input wire rather than trust a caller-supplied value.
    let delta = if circuit.flags.is_free_xor {
        match circuit.input_indices.first().and_then(|&w| both_wires[w as usize]) {
            Some(pair) => Some(pair[0] ^ pair[1]),
            None => return (false, both_wires),
        }
    } else {
        None
    };

    let mut tabled_index = 0u32;
    for gate in &circuit.gates {
        let ok = if circuit.gate_is_free(gate) {
            verify_free_gate(&mut both_wires, gate, delta)
        } else {
            let k = gate_tweak(tabled_index);
            let ok = verify_tabled_gate(cipher, &mut both_wires, tables, gate, tabled_index, k, circuit.flags.is_free_xor);
            tabled_index += 1;
            ok
        };
        if !ok {
            return (false, both_wires);
        }
    }

    (true, both_wires)
}

fn verify_free_gate(both_wires: &mut [Option<[Block; 2]>], gate: &Gate, delta: Option<Block>) -> bool {
    let Some(a) = both_wires[gate.in_a as usize] else { return false };

    if gate.is_not() {
        both_wires[gate.out as usize] = Some([a[1], a[0]]);
        return true;
    }

    let Some(b) = both_wires[gate.in_b.unwrap() as usize] else { return false };
    let Some(delta) = delta else { return false };
    let zero = if gate.tt == 9 { a[0] ^ b[0] ^ delta } else { a[0] ^ b[0] };
    both_wires[gate.out as usize] = Some([zero, zero ^ delta]);
    true
}

/// Reconstruct the output-key pair of one tabled gate from all four (signal-bit) rows and
/// check it against `tables`. Fails if any two rows that land on the same logical output
/// value disagree, or if the two recovered keys share a signal bit.
fn verify_tabled_gate(
    cipher: &FixedKeyCipher,
    both_wires: &mut [Option<[Block; 2]>],
    tables: &GarbledTables,
    gate: &Gate,
    tabled_index: u32,
    k: Block,
    is_free_xor: bool,
) -> bool {
    let in_b = gate.in_b.unwrap_or(gate.in_a);
    let (Some(a_pair), Some(b_pair)) = (both_wires[gate.in_a as usize], both_wires[in_b as usize]) else {
        return false;
    };

    let mut out_pair: [Option<Block>; 2] = [None, None];

    for sa in 0..2u8 {
        for sb in 0..2u8 {
            let va = signal_value(a_pair, sa);
            let vb = signal_value(b_pair, sb);
            let ka = a_pair[va as usize];
            let kb = b_pair[vb as usize];
            let vc = gate.eval_row(va, vb);
            let hashed = cipher.hash(ka, kb, k);

            let candidate = if is_free_xor && sa == 0 && sb == 0 {
                hashed
            } else {
                let row = if is_free_xor { (sa * 2 + sb - 1) as usize } else { (sa * 2 + sb) as usize };
                tables.gate_row(tabled_index, row) ^ hashed
            };

            match out_pair[vc as usize] {
                Some(existing) if existing != candidate => return false,
                Some(_) => {}
                None => out_pair[vc as usize] = Some(candidate),
            }
        }
    }

    match (out_pair[0], out_pair[1]) {
        (Some(zero), Some(one)) if zero.signal_bit() != one.signal_bit() => {
            both_wires[gate.out as usize] = Some([zero, one]);
            true
        }
        _ => false,
    }
}

fn signal_value(pair: [Block; 2], signal: u8) -> u8 {
    if pair[0].signal_bit() == signal { 0 } else { 1 }
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
    fn freshly_garbled_tables_verify_from_both_input_keys_alone() {
        let circuit = circuit_from(AND_CIRCUIT, CircuitFlags::standard());
        let cipher = FixedKeyCipher::new(Block::new([0x21; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        let mut both_input_keys = vec![None; circuit.last_wire_index as usize + 1];
        both_input_keys[0] = out.both_wires[0];
        both_input_keys[1] = out.both_wires[1];

        let (ok, both_wires) = internal_verify(&cipher, &circuit, &out.tables, &both_input_keys);
        assert!(ok);
        assert_eq!(both_wires[2], out.both_wires[2]);
    }

    #[test]
    fn tampered_row_fails_verification() {
        let circuit = circuit_from(AND_CIRCUIT, CircuitFlags::standard());
        let cipher = FixedKeyCipher::new(Block::new([0x22; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        let mut bytes = out.tables.to_bytes();
        bytes[0] ^= 0xFF;
        let tampered = GarbledTables::from_bytes(
            &bytes,
            out.tables.rows_per_gate,
            out.tables.num_tabled_gates,
            out.tables.num_identity_gates,
        )
        .unwrap();

        let mut both_input_keys = vec![None; circuit.last_wire_index as usize + 1];
        both_input_keys[0] = out.both_wires[0];
        both_input_keys[1] = out.both_wires[1];

        let (ok, _) = internal_verify(&cipher, &circuit, &tampered, &both_input_keys);
        assert!(!ok);
    }

    #[test]
    fn no_free_xor_and_gate_verifies() {
        let flags = CircuitFlags { is_free_xor: false, ..CircuitFlags::standard() };
        let circuit = circuit_from(AND_CIRCUIT, flags);
        let cipher = FixedKeyCipher::new(Block::new([0x23; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        let mut both_input_keys = vec![None; circuit.last_wire_index as usize + 1];
        both_input_keys[0] = out.both_wires[0];
        both_input_keys[1] = out.both_wires[1];

        let (ok, _) = internal_verify(&cipher, &circuit, &out.tables, &both_input_keys);
        assert!(ok);
    }

    #[test]
    fn missing_input_key_fails_rather_than_panics() {
        let circuit = circuit_from(AND_CIRCUIT, CircuitFlags::standard());
        let cipher = FixedKeyCipher::new(Block::new([0x24; 16]));
        let mut pipeline = KeyPipeline::build(&cipher, &circuit);
        let out = garble_gates(&cipher, &circuit, &mut pipeline);

        let mut both_input_keys = vec![None; circuit.last_wire_index as usize + 1];
        both_input_keys[0] = out.both_wires[0];
        // wire 1 left unset

        let (ok, _) = internal_verify(&cipher, &circuit, &out.tables, &both_input_keys);
        assert!(!ok);
    }
}
