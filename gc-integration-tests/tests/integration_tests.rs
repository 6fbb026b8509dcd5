use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;

use gc::GarbledCircuit;
use gc::artifacts::WireKeyArtifact;
use gc::block::Block;
use gc::circuit::{Circuit, CircuitFlags};
use gc_integration_tests::plain_evaluator::evaluate_plain_circuit;

const TEST_SEED: [u8; 32] = [42; 32];

const AND_CIRCUIT: &str = "1 1\n0 2\n0\n1\n1\n2\n2 1 0 1 2 0001\n";
const NOT_OF_AND_CIRCUIT: &str = "2 1\n0 2\n0\n1\n1\n3\n2 1 0 1 2 0001\n1 1 2 3 1100\n";

fn write_circuit(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

/// `n`-input XOR chain: wire `i` for `i < n` is a primary input, gate `i` XORs the running
/// accumulator with input `i`, the last gate's output is the sole circuit output.
fn xor_chain_circuit(n: u32) -> String {
    let mut s = String::new();
    s.push_str(&format!("{} 1\n", n - 1));
    s.push_str(&format!("0 {n}\n"));
    for w in 0..n {
        s.push_str(&format!("{w}\n"));
    }
    let last_out = n + (n - 2);
    s.push_str("1\n");
    s.push_str(&format!("{last_out}\n"));

    let mut acc = 0u32;
    for i in 1..n {
        let out = n + (i - 1);
        s.push_str(&format!("2 1 {acc} {i} {out} 0110\n"));
        acc = out;
    }
    s
}

fn load(content: &str, flags: CircuitFlags) -> Result<GarbledCircuit> {
    let f = write_circuit(content);
    Ok(GarbledCircuit::load_with_flags(f.path(), flags)?)
}

fn both_input_pairs(gc: &GarbledCircuit, pairs: &[[Block; 2]]) -> Vec<Option<[Block; 2]>> {
    let arena_len = gc.last_wire_index() as usize + 1;
    WireKeyArtifact::from_pairs(gc.input_indices(), pairs).to_sparse_pairs(arena_len)
}

fn chosen_input_keys(gc: &GarbledCircuit, pairs: &[[Block; 2]], bits: &[bool]) -> Vec<Option<Block>> {
    let arena_len = gc.last_wire_index() as usize + 1;
    WireKeyArtifact::from_pairs(gc.input_indices(), pairs).to_sparse_single_keys(gc.input_indices(), bits, arena_len)
}

#[test]
fn and_gate_correctness_and_verify_for_every_input() -> Result<()> {
    let mut gc = load(AND_CIRCUIT, CircuitFlags::standard())?;
    let artifacts = gc.garble(Some(Block::new([0u8; 16])));

    let expected = [false, false, false, true]; // (0,0) (0,1) (1,0) (1,1)
    for (i, (a, b)) in [(false, false), (false, true), (true, false), (true, true)].into_iter().enumerate() {
        let input_keys = chosen_input_keys(&gc, &artifacts.input_keys, &[a, b]);
        let output_keys = gc.compute(&input_keys)?;
        let bits = gc.translate(&output_keys)?;
        assert_eq!(bits, vec![expected[i]]);
    }

    let both = both_input_pairs(&gc, &artifacts.input_keys);
    assert!(gc.verify(&both)?);
    Ok(())
}

#[test]
fn xor_chain_emits_no_garbled_tables_and_matches_parity() -> Result<()> {
    const N: u32 = 64;
    let text = xor_chain_circuit(N);
    let mut gc = load(&text, CircuitFlags::standard())?;
    let artifacts = gc.garble(Some(Block::new([7u8; 16])));

    assert!(gc.garbled_tables()?.is_empty());

    let mut rng = ChaCha12Rng::from_seed(TEST_SEED);
    for _ in 0..20 {
        let mut bits = Vec::with_capacity(N as usize);
        for _ in 0..N {
            bits.push(rng.next_u32() & 1 == 1);
        }

        let input_keys = chosen_input_keys(&gc, &artifacts.input_keys, &bits);
        let output_keys = gc.compute(&input_keys)?;
        let translated = gc.translate(&output_keys)?;

        let parity = bits.iter().fold(false, |acc, &b| acc ^ b);
        assert_eq!(translated, vec![parity]);
    }
    Ok(())
}

#[test]
fn not_of_and_inverts_the_and_result() -> Result<()> {
    let mut gc = load(NOT_OF_AND_CIRCUIT, CircuitFlags::standard())?;
    let artifacts = gc.garble(Some(Block::new([3u8; 16])));

    for (a, b, expected) in [(false, false, true), (false, true, true), (true, false, true), (true, true, false)] {
        let input_keys = chosen_input_keys(&gc, &artifacts.input_keys, &[a, b]);
        let output_keys = gc.compute(&input_keys)?;
        let bits = gc.translate(&output_keys)?;
        assert_eq!(bits, vec![expected]);
    }
    Ok(())
}

#[test]
fn tampering_with_a_garbled_table_byte_fails_verification() -> Result<()> {
    let f = write_circuit(AND_CIRCUIT);
    let mut gc = GarbledCircuit::load_with_flags(f.path(), CircuitFlags::standard())?;
    let artifacts = gc.garble(Some(Block::new([9u8; 16])));

    let mut tampered_tables = gc.garbled_tables()?.to_vec();
    tampered_tables[0] ^= 0xFF;

    let mut tampered = GarbledCircuit::load_with_flags(f.path(), CircuitFlags::standard())?;
    tampered.set_garbled_tables(&tampered_tables)?;
    tampered.set_translation_table(gc.translation_table()?)?;

    let both = both_input_pairs(&tampered, &artifacts.input_keys);
    assert!(!tampered.verify(&both)?);
    Ok(())
}

#[test]
fn tampering_with_the_translation_table_fails_verification() -> Result<()> {
    let f = write_circuit(AND_CIRCUIT);
    let mut gc = GarbledCircuit::load_with_flags(f.path(), CircuitFlags::standard())?;
    let artifacts = gc.garble(Some(Block::new([11u8; 16])));

    let mut tampered_translation = gc.translation_table()?.to_vec();
    tampered_translation[0] ^= 1;

    let mut tampered = GarbledCircuit::load_with_flags(f.path(), CircuitFlags::standard())?;
    tampered.set_garbled_tables(gc.garbled_tables()?)?;
    tampered.set_translation_table(&tampered_translation)?;

    let both = both_input_pairs(&tampered, &artifacts.input_keys);
    assert!(!tampered.verify(&both)?);
    Ok(())
}

#[test]
fn no_fixed_delta_mode_still_computes_correctly_and_breaks_the_output_delta() -> Result<()> {
    let flags = CircuitFlags { is_non_xor_outputs_required: true, ..CircuitFlags::standard() };
    let mut gc = load(AND_CIRCUIT, flags)?;
    let artifacts = gc.garble(Some(Block::new([13u8; 16])));

    for (a, b, expected) in [(false, false, false), (false, true, false), (true, false, false), (true, true, true)] {
        let input_keys = chosen_input_keys(&gc, &artifacts.input_keys, &[a, b]);
        let output_keys = gc.compute(&input_keys)?;
        let bits = gc.translate(&output_keys)?;
        assert_eq!(bits, vec![expected]);
    }

    let input_delta = artifacts.input_keys[0][0] ^ artifacts.input_keys[0][1];
    let output_delta = artifacts.output_keys[0][0] ^ artifacts.output_keys[0][1];
    assert_ne!(output_delta, input_delta);

    let both = both_input_pairs(&gc, &artifacts.input_keys);
    assert!(gc.verify(&both)?);
    Ok(())
}

#[test]
fn cross_party_handoff_and_table_round_trip_reproduce_the_same_output() -> Result<()> {
    let f = write_circuit(AND_CIRCUIT);
    let mut garbler = GarbledCircuit::load_with_flags(f.path(), CircuitFlags::standard())?;
    let artifacts = garbler.garble(Some(Block::new([17u8; 16])));

    let mut evaluator = GarbledCircuit::load_with_flags(f.path(), CircuitFlags::standard())?;
    evaluator.set_garbled_tables(garbler.garbled_tables()?)?;
    evaluator.set_translation_table(garbler.translation_table()?)?;

    let bits = [true, false];
    let garbler_keys = chosen_input_keys(&garbler, &artifacts.input_keys, &bits);
    let evaluator_keys = chosen_input_keys(&evaluator, &artifacts.input_keys, &bits);

    let garbler_out = garbler.compute(&garbler_keys)?;
    let evaluator_out = evaluator.compute(&evaluator_keys)?;
    assert_eq!(garbler_out, evaluator_out);
    assert_eq!(garbler.translate(&garbler_out)?, evaluator.translate(&evaluator_out)?);
    Ok(())
}

#[test]
fn garbling_is_deterministic_given_the_same_seed() -> Result<()> {
    let seed = Block::new([5u8; 16]);

    let mut first = load(AND_CIRCUIT, CircuitFlags::standard())?;
    let first_artifacts = first.garble(Some(seed));

    let mut second = load(AND_CIRCUIT, CircuitFlags::standard())?;
    let second_artifacts = second.garble(Some(seed));

    assert_eq!(first.garbled_tables()?, second.garbled_tables()?);
    assert_eq!(first.translation_table()?, second.translation_table()?);
    assert_eq!(first_artifacts.input_keys, second_artifacts.input_keys);
    assert_eq!(first_artifacts.output_keys, second_artifacts.output_keys);
    Ok(())
}

#[test]
fn point_and_permute_and_free_xor_invariants_hold_across_all_wires() -> Result<()> {
    const N: u32 = 8;
    let text = xor_chain_circuit(N);
    let mut gc = load(&text, CircuitFlags::standard())?;
    let artifacts = gc.garble(Some(Block::new([19u8; 16])));

    let delta = artifacts.input_keys[0][0] ^ artifacts.input_keys[0][1];
    for pair in artifacts.input_keys.iter().chain(artifacts.output_keys.iter()) {
        assert_ne!(pair[0].signal_bit(), pair[1].signal_bit());
        assert_eq!(pair[0] ^ pair[1], delta);
    }
    Ok(())
}

#[test]
fn garbled_evaluation_matches_plaintext_evaluation_on_random_circuits() -> Result<()> {
    let mut rng = ChaCha12Rng::from_seed(TEST_SEED);

    for trial in 0..5u32 {
        let n = 4 + trial;
        let text = xor_chain_circuit(n);
        let plain_file = write_circuit(&text);
        let plain = Circuit::load_with_flags(plain_file.path(), CircuitFlags::standard())?;

        let mut gc = load(&text, CircuitFlags::standard())?;
        let artifacts = gc.garble(Some(Block::new([23u8; 16])));

        let bits: Vec<bool> = (0..n).map(|_| rng.next_u32() & 1 == 1).collect();
        let input_bits: HashMap<u32, bool> = (0..n).zip(bits.iter().copied()).collect();

        let plain_result = evaluate_plain_circuit(&plain, &input_bits);
        let input_keys = chosen_input_keys(&gc, &artifacts.input_keys, &bits);
        let output_keys = gc.compute(&input_keys)?;
        let translated = gc.translate(&output_keys)?;

        for (&wire, &expected) in &plain_result {
            let position = plain.output_indices.iter().position(|&w| w == wire).unwrap();
            assert_eq!(translated[position], expected);
        }
    }
    Ok(())
}
