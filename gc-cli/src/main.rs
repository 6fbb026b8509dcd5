use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use gc::GarbledCircuit;
use gc::artifacts::{EvaluationArtifact, WireKeyArtifact};
use gc::block::Block;
use gc::circuit::CircuitFlags;

/// Garble, compute, verify and translate garbled Boolean circuits
#[derive(Parser, Debug)]
#[command(name = "gc-cli")]
#[command(about = "Garble, compute, verify and translate garbled Boolean circuits")]
#[command(version)]
#[command(subcommand_required = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Garble a circuit file, writing tables, translation table, and both key sets to `out-dir`
    Garble {
        /// Circuit file to garble
        circuit: PathBuf,
        /// Directory to write garbled_tables.bin, translation_table.bin, input_keys.json,
        /// output_keys.json into
        #[arg(short, long)]
        out_dir: PathBuf,
        /// 32 hex characters (128 bits) to seed the garbling PRG; random if omitted
        #[arg(long)]
        seed: Option<String>,
        /// Apply the no-fixed-delta output adapter
        #[arg(long)]
        non_xor_outputs: bool,
    },
    /// Evaluate a previously garbled circuit given one chosen bit per input wire
    Compute {
        /// Circuit file the tables were garbled from
        circuit: PathBuf,
        /// garbled_tables.bin produced by `garble`
        #[arg(long)]
        tables: PathBuf,
        /// translation_table.bin produced by `garble`
        #[arg(long)]
        translation: PathBuf,
        /// input_keys.json produced by `garble` (both keys per input wire)
        #[arg(long)]
        input_keys: PathBuf,
        /// Comma-separated bits, one per input wire in circuit file order (e.g. "0,1,1")
        #[arg(long)]
        bits: String,
        /// Was the no-fixed-delta output adapter applied when garbling
        #[arg(long)]
        non_xor_outputs: bool,
        /// Where to write the evaluation result JSON
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Check a circuit's garbled tables against the plaintext circuit, given both input keys
    Verify {
        /// Circuit file the tables were garbled from
        circuit: PathBuf,
        /// garbled_tables.bin produced by `garble`
        #[arg(long)]
        tables: PathBuf,
        /// translation_table.bin produced by `garble`
        #[arg(long)]
        translation: PathBuf,
        /// input_keys.json produced by `garble` (both keys per input wire)
        #[arg(long)]
        input_keys: PathBuf,
        /// Was the no-fixed-delta output adapter applied when garbling
        #[arg(long)]
        non_xor_outputs: bool,
    },
    /// Turn output keys (one per output wire) back into bits using a translation table
    Translate {
        /// Circuit file the translation table was built for
        circuit: PathBuf,
        /// translation_table.bin produced by `garble`
        #[arg(long)]
        translation: PathBuf,
        /// JSON array of output keys, one per output wire, in circuit file order
        #[arg(long)]
        output_keys: PathBuf,
    },
    /// Print circuit statistics without garbling
    Describe {
        /// Circuit file to describe
        circuit: PathBuf,
        /// Apply the no-fixed-delta output adapter (affects reported row/gate counts)
        #[arg(long)]
        non_xor_outputs: bool,
    },
}

fn flags(non_xor_outputs: bool) -> CircuitFlags {
    CircuitFlags { is_non_xor_outputs_required: non_xor_outputs, ..CircuitFlags::standard() }
}

fn parse_seed(hex: &str) -> Result<Block> {
    if !hex.is_ascii() || hex.len() != 32 {
        bail!("seed must be exactly 32 hex characters (128 bits), got {}", hex.len());
    }
    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).context("invalid hex digit in seed")?;
    }
    Ok(Block::new(bytes))
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Garble { circuit, out_dir, seed, non_xor_outputs } => {
            let seed = seed.map(|s| parse_seed(&s)).transpose()?;
            let mut gc = GarbledCircuit::load_with_flags(&circuit, flags(non_xor_outputs))?;
            let artifacts = gc.garble(seed);

            std::fs::create_dir_all(&out_dir)?;
            std::fs::write(out_dir.join("garbled_tables.bin"), gc.garbled_tables()?)?;
            std::fs::write(out_dir.join("translation_table.bin"), gc.translation_table()?)?;
            WireKeyArtifact::from_pairs(gc.input_indices(), &artifacts.input_keys)
                .save_json(out_dir.join("input_keys.json"))?;
            WireKeyArtifact::from_pairs(gc.output_indices(), &artifacts.output_keys)
                .save_json(out_dir.join("output_keys.json"))?;

            println!("garbled {} gates ({} xor/xnor, {} not)", gc.number_of_gates(), gc.num_of_xor_gates(), gc.num_of_not_gates());
            println!("seed: {}", artifacts.seed.as_bytes().iter().map(|b| format!("{b:02x}")).collect::<String>());
            println!("wrote garbled_tables.bin, translation_table.bin, input_keys.json, output_keys.json to {}", out_dir.display());
        }
        Commands::Compute { circuit, tables, translation, input_keys, bits, non_xor_outputs, output } => {
            let mut gc = GarbledCircuit::load_with_flags(&circuit, flags(non_xor_outputs))?;
            gc.set_garbled_tables(&std::fs::read(tables)?)?;
            gc.set_translation_table(&std::fs::read(translation)?)?;

            let bits: Vec<bool> = bits
                .split(',')
                .map(|tok| match tok.trim() {
                    "0" => Ok(false),
                    "1" => Ok(true),
                    other => bail!("expected 0 or 1, got '{other}'"),
                })
                .collect::<Result<_>>()?;
            if bits.len() != gc.input_indices().len() {
                bail!("expected {} bits, got {}", gc.input_indices().len(), bits.len());
            }

            let artifact = WireKeyArtifact::load_json(input_keys)?;
            let arena_len = gc.last_wire_index() as usize + 1;
            let input_keys = artifact.to_sparse_single_keys(gc.input_indices(), &bits, arena_len);

            let output_keys = gc.compute(&input_keys)?;
            let output_bits = gc.translate(&output_keys)?;
            EvaluationArtifact::from_results(gc.output_indices(), &output_keys, &output_bits).save_json(&output)?;

            println!("output bits: {}", output_bits.iter().map(|b| if *b { '1' } else { '0' }).collect::<String>());
            println!("wrote {}", output.display());
        }
        Commands::Verify { circuit, tables, translation, input_keys, non_xor_outputs } => {
            let mut gc = GarbledCircuit::load_with_flags(&circuit, flags(non_xor_outputs))?;
            gc.set_garbled_tables(&std::fs::read(tables)?)?;
            gc.set_translation_table(&std::fs::read(translation)?)?;

            let artifact = WireKeyArtifact::load_json(input_keys)?;
            let arena_len = gc.last_wire_index() as usize + 1;
            let both_input_keys = artifact.to_sparse_pairs(arena_len);

            if gc.verify(&both_input_keys)? {
                println!("VALID");
            } else {
                println!("INVALID");
                std::process::exit(1);
            }
        }
        Commands::Translate { circuit, translation, output_keys } => {
            let mut gc = GarbledCircuit::load(&circuit)?;
            gc.set_translation_table(&std::fs::read(translation)?)?;

            let keys: Vec<Block> = serde_json::from_str(&std::fs::read_to_string(output_keys)?)?;
            let bits = gc.translate(&keys)?;
            println!("{}", bits.iter().map(|b| if *b { '1' } else { '0' }).collect::<String>());
        }
        Commands::Describe { circuit, non_xor_outputs } => {
            let gc = GarbledCircuit::load_with_flags(&circuit, flags(non_xor_outputs))?;
            println!("parties: {}", gc.number_of_parties());
            println!("inputs: {}", gc.number_of_inputs());
            println!("outputs: {}", gc.number_of_outputs());
            println!("gates: {}", gc.number_of_gates());
            println!("xor/xnor gates: {}", gc.num_of_xor_gates());
            println!("not gates: {}", gc.num_of_not_gates());
            println!("last wire index: {}", gc.last_wire_index());
            println!("rows per tabled gate: {}", gc.num_of_rows());
            println!("free-xor: {}", gc.is_free_xor());
            println!("no-fixed-delta adapter: {}", gc.is_non_xor_outputs_required());
        }
    }

    Ok(())
}
