//! Garbled Boolean circuits: a garbler compiles a plaintext circuit into per-wire key pairs
//! plus per-gate garbled tables; an evaluator, given one key per input wire, computes one key
//! per output wire; a translation table maps output keys back to bits; a verifier, given both
//! keys per input wire, checks the published tables against the plaintext circuit.
//!
//! [`GarbledCircuit`] is the single stateful handle for all four roles. Load a circuit, then
//! either `garble` it yourself or `set_garbled_tables`/`set_translation_table` to receive
//! someone else's tables, then `compute`, `verify`, and/or `translate`.
//!
//! Free-XOR and the NOT-gate optimization are on by default ([`CircuitFlags::standard`]); the
//! no-fixed-delta output adapter ([`CircuitFlags::is_non_xor_outputs_required`]) is opt-in.
//! Out of scope: row-reduction (GRR3) variants, half-gates, network transport, and OT.

pub mod artifacts;
pub mod block;
pub mod cipher;
pub mod circuit;
pub mod compute;
pub mod constants;
pub mod error;
pub mod garble;
pub mod keys;
pub mod no_fixed_delta;
pub mod stream;
pub mod tables;
pub mod translate;
pub mod verify;

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;

use block::Block;
use cipher::FixedKeyCipher;
use circuit::{Circuit, CircuitFlags};
use constants::KEY_SIZE;
use error::GcError;
use keys::KeyPipeline;
use tables::GarbledTables;

/// The circuit's lifecycle: `compute`/`verify`/`translate`/`get_garbled_tables` all require
/// `Garbled`, reached either by calling `garble` or by `set_garbled_tables` +
/// `set_translation_table` (the cross-party handoff case).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Loaded,
    Garbled,
}

/// Both keys and the translation table produced by a single `garble` call, in
/// `circuit.input_indices` / `circuit.output_indices` order.
#[derive(Debug, Clone)]
pub struct GarbleArtifacts {
    /// Both keys for every primary input wire.
    pub input_keys: Vec<[Block; 2]>,
    /// Both keys for every primary output wire (post no-fixed-delta rewrite, if active).
    pub output_keys: Vec<[Block; 2]>,
    /// One byte per output wire: the signal bit of that wire's 0-key.
    pub translation_table: Vec<u8>,
    /// The seed this circuit was garbled with (caller-supplied or freshly generated).
    pub seed: Block,
}

/// A garbled-circuit instance: owns the parsed topology plus (once garbled) the cipher,
/// garbled tables, and translation table needed to compute, verify, or translate. The
/// secret per-wire key arena produced by `garble` is handed to the caller as
/// `GarbleArtifacts` and not retained here.
#[derive(Debug)]
pub struct GarbledCircuit {
    circuit: Circuit,
    state: State,
    cipher: Option<FixedKeyCipher>,
    tables: Option<GarbledTables>,
    translation_table: Option<Vec<u8>>,
}

impl GarbledCircuit {
    /// Load a circuit file with the standard flag set (Free-XOR and the NOT optimization on,
    /// no-fixed-delta off).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GcError> {
        Self::load_with_flags(path, CircuitFlags::standard())
    }

    /// Load a circuit file with an explicit flag set.
    pub fn load_with_flags(path: impl AsRef<Path>, flags: CircuitFlags) -> Result<Self, GcError> {
        let circuit = Circuit::load_with_flags(path, flags)?;
        Ok(Self {
            circuit,
            state: State::Loaded,
            cipher: None,
            tables: None,
            translation_table: None,
        })
    }

    /// Garble this circuit under `seed` (or a freshly generated random seed if `None`),
    /// filling in the tables, key arena, and translation table and transitioning to
    /// `Garbled`.
    pub fn garble(&mut self, seed: Option<Block>) -> GarbleArtifacts {
        let seed = seed.unwrap_or_else(random_seed);
        let cipher = FixedKeyCipher::new(seed);
        let mut pipeline = KeyPipeline::build(&cipher, &self.circuit);

        let progress = progress_bar_for(self.circuit.number_of_gates());
        progress.set_message("garbling circuit");
        let mut out = garble::garble_gates(&cipher, &self.circuit, &mut pipeline);
        progress.finish_and_clear();

        let mut output_pairs: Vec<[Block; 2]> = self
            .circuit
            .output_indices
            .iter()
            .map(|&w| out.both_wires[w as usize].expect("topological order guarantees output wire is set"))
            .collect();

        let translation_table = if self.circuit.flags.is_non_xor_outputs_required {
            let num_tabled = self.circuit.num_of_tabled_gates();
            let fresh_pairs = no_fixed_delta::apply(&cipher, &mut pipeline, &mut out.tables, num_tabled, &output_pairs);
            out.tables.num_identity_gates = self.circuit.number_of_outputs();
            let table = translate::build_translation_table(&fresh_pairs);
            output_pairs = fresh_pairs;
            table
        } else {
            translate::build_translation_table(&output_pairs)
        };

        let input_pairs: Vec<[Block; 2]> = self
            .circuit
            .input_indices
            .iter()
            .map(|&w| pipeline.input_keys[&w])
            .collect();

        self.tables = Some(out.tables);
        self.translation_table = Some(translation_table.clone());
        self.cipher = Some(cipher);
        self.state = State::Garbled;

        GarbleArtifacts { input_keys: input_pairs, output_keys: output_pairs, translation_table, seed }
    }

    /// Evaluate the circuit given one key per input wire (indexed by wire id; primary inputs
    /// only need to be populated, intermediate/output slots are computed). Requires `Garbled`.
    pub fn compute(&self, input_keys: &[Option<Block>]) -> Result<Vec<Block>, GcError> {
        self.require_garbled()?;
        let cipher = self.cipher.as_ref().unwrap();
        let tables = self.tables.as_ref().unwrap();

        let mut output_keys = compute::compute(cipher, &self.circuit, tables, input_keys)?;
        if self.circuit.flags.is_non_xor_outputs_required {
            let num_tabled = self.circuit.num_of_tabled_gates();
            output_keys = no_fixed_delta::compute(cipher, tables, num_tabled, &output_keys);
        }
        Ok(output_keys)
    }

    /// `internalVerify`: given both keys per input wire, reconstruct every wire and check the
    /// stored tables. Returns the derived both-keys for every output wire alongside the
    /// pass/fail flag.
    pub fn internal_verify(&self, both_input_keys: &[Option<[Block; 2]>]) -> Result<(bool, Vec<[Block; 2]>), GcError> {
        self.require_garbled()?;
        let cipher = self.cipher.as_ref().unwrap();
        let tables = self.tables.as_ref().unwrap();

        let (ok, both_wires) = verify::internal_verify(cipher, &self.circuit, tables, both_input_keys);
        if !ok {
            return Ok((false, Vec::new()));
        }

        let mut output_pairs: Vec<[Block; 2]> = match self
            .circuit
            .output_indices
            .iter()
            .map(|&w| both_wires[w as usize])
            .collect::<Option<Vec<_>>>()
        {
            Some(pairs) => pairs,
            None => return Ok((false, Vec::new())),
        };

        if self.circuit.flags.is_non_xor_outputs_required {
            // `no_fixed_delta::compute` derives its per-wire tweak from the position of each
            // key within the slice it's given, so the zero-keys and one-keys must each be
            // passed as one batch in output order rather than decrypted one wire at a time.
            let num_tabled = self.circuit.num_of_tabled_gates();
            let zero_keys: Vec<Block> = output_pairs.iter().map(|p| p[0]).collect();
            let one_keys: Vec<Block> = output_pairs.iter().map(|p| p[1]).collect();
            let fresh_zero = no_fixed_delta::compute(cipher, tables, num_tabled, &zero_keys);
            let fresh_one = no_fixed_delta::compute(cipher, tables, num_tabled, &one_keys);

            let mut fresh_pairs = Vec::with_capacity(output_pairs.len());
            for (zero, one) in fresh_zero.into_iter().zip(fresh_one) {
                if zero.signal_bit() == one.signal_bit() {
                    return Ok((false, Vec::new()));
                }
                fresh_pairs.push([zero, one]);
            }
            output_pairs = fresh_pairs;
        }

        Ok((true, output_pairs))
    }

    /// `verify = internalVerify AND verifyTranslationTable`.
    pub fn verify(&self, both_input_keys: &[Option<[Block; 2]>]) -> Result<bool, GcError> {
        let (ok, output_pairs) = self.internal_verify(both_input_keys)?;
        if !ok {
            return Ok(false);
        }
        self.verify_translation_table(&output_pairs)
    }

    /// Check `signal(bothWires[w][0]) == translationTable[w]` and
    /// `signal(bothWires[w][1]) == 1 - translationTable[w]` for every output wire.
    pub fn verify_translation_table(&self, both_output_keys: &[[Block; 2]]) -> Result<bool, GcError> {
        self.require_garbled()?;
        let table = self.translation_table.as_ref().unwrap();
        Ok(translate::verify_translation_table(both_output_keys, table))
    }

    /// `translate`: turn one key per output wire into bits using this circuit's translation
    /// table. Requires `Garbled`.
    pub fn translate(&self, output_keys: &[Block]) -> Result<Vec<bool>, GcError> {
        self.require_garbled()?;
        translate::translate(self.translation_table.as_ref().unwrap(), output_keys)
    }

    /// The raw garbled-table byte buffer, row-major by (tabled gate, row), identity gates
    /// appended last. Requires `Garbled`.
    pub fn garbled_tables(&self) -> Result<Vec<u8>, GcError> {
        self.require_garbled()?;
        Ok(self.tables.as_ref().unwrap().to_bytes())
    }

    /// The translation table bytes. Requires `Garbled`.
    pub fn translation_table(&self) -> Result<&[u8], GcError> {
        self.require_garbled()?;
        Ok(self.translation_table.as_ref().unwrap())
    }

    /// Adopt someone else's garbled tables without running `garble` (cross-party handoff).
    /// Transitions `Loaded -> Garbled`. Only `compute`/`verify`/`translate` are meaningful
    /// afterward, never a second `garble`.
    pub fn set_garbled_tables(&mut self, bytes: &[u8]) -> Result<(), GcError> {
        let rows_per_gate = if self.circuit.flags.is_free_xor { 3 } else { 4 };
        let num_identity_gates = if self.circuit.flags.is_non_xor_outputs_required {
            self.circuit.number_of_outputs()
        } else {
            0
        };
        let tables = GarbledTables::from_bytes(bytes, rows_per_gate, self.circuit.num_of_tabled_gates(), num_identity_gates)?;
        self.tables = Some(tables);
        self.cipher = Some(FixedKeyCipher::hash_only());
        self.state = State::Garbled;
        Ok(())
    }

    /// Adopt someone else's translation table. Transitions `Loaded -> Garbled`, same as
    /// `set_garbled_tables`, so `translate` alone (no tables needed) works right after this.
    pub fn set_translation_table(&mut self, bytes: &[u8]) -> Result<(), GcError> {
        if bytes.len() != self.circuit.number_of_outputs() as usize {
            return Err(GcError::SizeMismatch {
                expected: self.circuit.number_of_outputs() as usize,
                actual: bytes.len(),
            });
        }
        self.translation_table = Some(bytes.to_vec());
        self.state = State::Garbled;
        Ok(())
    }

    /// Number of parties contributing inputs.
    pub fn number_of_parties(&self) -> u32 {
        self.circuit.number_of_parties
    }

    /// Number of primary input wires.
    pub fn number_of_inputs(&self) -> u32 {
        self.circuit.number_of_inputs()
    }

    /// Number of input wires contributed by a single party.
    pub fn number_of_inputs_for_party(&self, party: usize) -> u32 {
        self.circuit.number_of_inputs_for_party(party)
    }

    /// Input wire indices belonging to a single party.
    pub fn input_wire_indices(&self, party: usize) -> &[u32] {
        self.circuit.input_wire_indices(party)
    }

    /// All primary input wire indices, in file order.
    pub fn input_indices(&self) -> &[u32] {
        &self.circuit.input_indices
    }

    /// All primary output wire indices, in file order.
    pub fn output_indices(&self) -> &[u32] {
        &self.circuit.output_indices
    }

    /// Number of primary output wires.
    pub fn number_of_outputs(&self) -> u32 {
        self.circuit.number_of_outputs()
    }

    /// Number of gates.
    pub fn number_of_gates(&self) -> u32 {
        self.circuit.number_of_gates()
    }

    /// Number of XOR/XNOR gates.
    pub fn num_of_xor_gates(&self) -> u32 {
        self.circuit.num_of_xor_gates
    }

    /// Number of NOT gates.
    pub fn num_of_not_gates(&self) -> u32 {
        self.circuit.num_of_not_gates
    }

    /// Largest wire index referenced anywhere in the circuit.
    pub fn last_wire_index(&self) -> u32 {
        self.circuit.last_wire_index
    }

    /// Whether Free-XOR is active for this instance.
    pub fn is_free_xor(&self) -> bool {
        self.circuit.flags.is_free_xor
    }

    /// Whether the no-fixed-delta output adapter is active for this instance.
    pub fn is_non_xor_outputs_required(&self) -> bool {
        self.circuit.flags.is_non_xor_outputs_required
    }

    /// Rows per tabled gate: 3 under Free-XOR (point-and-permute omits the free row), 4
    /// otherwise.
    pub fn num_of_rows(&self) -> usize {
        if self.circuit.flags.is_free_xor { 3 } else { 4 }
    }

    fn require_garbled(&self) -> Result<(), GcError> {
        if self.state != State::Garbled {
            return Err(GcError::StateError);
        }
        Ok(())
    }
}

/// Draw a cryptographically random 128-bit seed when the caller doesn't supply one.
fn random_seed() -> Block {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    Block::new(bytes)
}

/// A spinner gated to stay silent on small circuits, so unit tests and small-circuit callers
/// don't pay for progress-bar overhead; large circuits get periodic position updates during
/// the gate walk (see `constants::PROGRESS_UPDATE_INTERVAL`).
fn progress_bar_for(num_gates: u32) -> ProgressBar {
    if num_gates < constants::PROGRESS_UPDATE_INTERVAL {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(num_gates as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>9}/{len:9} {msg}") {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}
