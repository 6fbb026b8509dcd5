//! Circuit file parsing and the in-memory topology model.

use std::fs::File;
use std::path::Path;

use crate::error::GcError;
use crate::stream::BufferedLineStream;

/// A single 2-input (or 1-input, for NOT) gate in topological order.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    /// First input wire.
    pub in_a: u32,
    /// Second input wire; `None` for a 1-input (NOT) gate.
    pub in_b: Option<u32>,
    /// Output wire.
    pub out: u32,
    /// 4-bit truth table, bit `j` (MSB-first) giving the output for row `j` of
    /// `(0,0),(0,1),(1,0),(1,1)`. For a 1-input gate only rows `(v,0)` are meaningful.
    pub tt: u8,
}

impl Gate {
    /// A gate is a NOT gate iff it has only one input wire connected.
    pub fn is_not(&self) -> bool {
        self.in_b.is_none()
    }

    /// A 2-input gate is XOR (`tt = 6`) or XNOR (`tt = 9`).
    pub fn is_xor_or_xnor(&self) -> bool {
        matches!(self.tt, 6 | 9)
    }

    /// Look up `row(tt, r)` for `r = 2*va + vb` (`vb` is ignored, forced to 0, for a
    /// 1-input gate).
    pub fn eval_row(&self, va: u8, vb: u8) -> u8 {
        let vb = if self.is_not() { 0 } else { vb };
        let r = 2 * va + vb;
        (self.tt >> (3 - r)) & 1
    }
}

/// Which garbling-scheme variants are enabled for a circuit instance.
#[derive(Debug, Clone, Copy)]
pub struct CircuitFlags {
    /// Emit XOR/XNOR gates table-free, with their output keys related by the global delta.
    pub is_free_xor: bool,
    /// Apply the no-fixed-delta output adapter after the main garble pass.
    pub is_non_xor_outputs_required: bool,
    /// Propagate NOT gates as a key swap instead of a garbled table.
    pub not_gate_optimization: bool,
}

impl CircuitFlags {
    /// Free-XOR and the NOT-gate optimization on, no-fixed-delta adapter off.
    pub fn standard() -> Self {
        Self {
            is_free_xor: true,
            is_non_xor_outputs_required: false,
            not_gate_optimization: true,
        }
    }
}

impl Default for CircuitFlags {
    fn default() -> Self {
        Self::standard()
    }
}

/// The parsed, topologically-ordered circuit.
#[derive(Debug)]
pub struct Circuit {
    /// Number of distinct parties contributing inputs.
    pub number_of_parties: u32,
    /// Number of input wires contributed by each party, in party order.
    pub num_of_inputs_for_each_party: Vec<u32>,
    /// All input wire indices, grouped by party, in file order.
    pub input_indices: Vec<u32>,
    /// All output wire indices, in file order.
    pub output_indices: Vec<u32>,
    /// `gates` in topological order.
    pub gates: Vec<Gate>,
    /// Number of XOR/XNOR gates.
    pub num_of_xor_gates: u32,
    /// Number of NOT gates.
    pub num_of_not_gates: u32,
    /// Largest wire index referenced anywhere in the circuit.
    pub last_wire_index: u32,
    /// Garbling-scheme flags this circuit was loaded with.
    pub flags: CircuitFlags,
}

impl Circuit {
    /// Number of primary input wires.
    pub fn number_of_inputs(&self) -> u32 {
        self.input_indices.len() as u32
    }

    /// Number of primary output wires.
    pub fn number_of_outputs(&self) -> u32 {
        self.output_indices.len() as u32
    }

    /// Number of gates.
    pub fn number_of_gates(&self) -> u32 {
        self.gates.len() as u32
    }

    /// Number of gates that receive a garbled table: neither free (XOR/XNOR under
    /// Free-XOR) nor a propagated (NOT under the NOT-gate optimization) gate.
    pub fn num_of_tabled_gates(&self) -> u32 {
        self.gates
            .iter()
            .filter(|g| !self.gate_is_free(g))
            .count() as u32
    }

    /// Whether this gate emits no garbled table under the circuit's active flags.
    pub fn gate_is_free(&self, gate: &Gate) -> bool {
        if gate.is_not() {
            self.flags.not_gate_optimization
        } else {
            self.flags.is_free_xor && gate.is_xor_or_xnor()
        }
    }

    /// Input wire indices belonging to a single party.
    pub fn input_wire_indices(&self, party: usize) -> &[u32] {
        let start: usize = self.num_of_inputs_for_each_party[..party]
            .iter()
            .map(|&n| n as usize)
            .sum();
        let len = self.num_of_inputs_for_each_party[party] as usize;
        &self.input_indices[start..start + len]
    }

    /// Number of input wires belonging to a single party.
    pub fn number_of_inputs_for_party(&self, party: usize) -> u32 {
        self.num_of_inputs_for_each_party[party]
    }

    /// Parse a circuit file (see the crate-level docs for the text format) with the
    /// standard flag set.
    pub fn load(path: impl AsRef<Path>) -> Result<Circuit, GcError> {
        Self::load_with_flags(path, CircuitFlags::standard())
    }

    /// Parse a circuit file with an explicit flag set.
    pub fn load_with_flags(path: impl AsRef<Path>, flags: CircuitFlags) -> Result<Circuit, GcError> {
        let file = File::open(path)?;
        let mut stream = BufferedLineStream::new(file);

        let (header_line_no, header) = next_nonempty(&mut stream)?;
        let mut tokens = header.split_whitespace();
        let number_of_gates: u32 = parse_tok(&mut tokens, header_line_no, "numGates")?;
        let number_of_parties: u32 = parse_tok(&mut tokens, header_line_no, "numParties")?;
        no_trailing_tokens(tokens, header_line_no)?;

        let mut num_of_inputs_for_each_party = Vec::with_capacity(number_of_parties as usize);
        let mut input_indices = Vec::new();
        let mut written: Vec<bool> = Vec::new();
        let mut last_wire_index: u32 = 0;

        for _ in 0..number_of_parties {
            let (party_line_no, line) = next_nonempty(&mut stream)?;
            let mut tokens = line.split_whitespace();
            let _party_id: u32 = parse_tok(&mut tokens, party_line_no, "party_id")?;
            let num_inputs: u32 = parse_tok(&mut tokens, party_line_no, "numInputsOfParty")?;
            no_trailing_tokens(tokens, party_line_no)?;
            num_of_inputs_for_each_party.push(num_inputs);

            for _ in 0..num_inputs {
                let wire = parse_single_wire(&mut stream)?;
                ensure_len(&mut written, wire);
                written[wire as usize] = true;
                last_wire_index = last_wire_index.max(wire);
                input_indices.push(wire);
            }
        }

        let (out_header_line_no, out_header) = next_nonempty(&mut stream)?;
        let number_of_outputs: u32 = out_header
            .trim()
            .parse()
            .map_err(|_| circuit_format_err(out_header_line_no, "invalid numOutputs"))?;

        let mut output_indices = Vec::with_capacity(number_of_outputs as usize);
        for _ in 0..number_of_outputs {
            let wire = parse_single_wire(&mut stream)?;
            output_indices.push(wire);
            last_wire_index = last_wire_index.max(wire);
        }

        let mut gates = Vec::with_capacity(number_of_gates as usize);
        let mut num_of_xor_gates = 0u32;
        let mut num_of_not_gates = 0u32;

        for _ in 0..number_of_gates {
            let (gate_line_no, line) = next_nonempty(&mut stream)?;
            let mut tokens = line.split_whitespace();

            let fan_in: u32 = parse_tok(&mut tokens, gate_line_no, "fanIn")?;
            let _fan_out: u32 = parse_tok(&mut tokens, gate_line_no, "fanOut")?;
            let in_a: u32 = parse_tok(&mut tokens, gate_line_no, "inA")?;
            let in_b = match fan_in {
                2 => Some(parse_tok::<u32>(&mut tokens, gate_line_no, "inB")?),
                1 => None,
                other => {
                    return Err(circuit_format_err(
                        gate_line_no,
                        format!("unsupported fan-in {other}"),
                    ));
                }
            };
            let out: u32 = parse_tok(&mut tokens, gate_line_no, "out")?;

            let tt_tok = tokens
                .next()
                .ok_or_else(|| circuit_format_err(gate_line_no, "missing truth table"))?;
            no_trailing_tokens(tokens, gate_line_no)?;
            let tt = u8::from_str_radix(tt_tok, 2)
                .map_err(|_| circuit_format_err(gate_line_no, format!("invalid truth table '{tt_tok}'")))?;

            check_written(&written, in_a, gate_line_no)?;
            if let Some(b) = in_b {
                check_written(&written, b, gate_line_no)?;
            }

            ensure_len(&mut written, out);
            written[out as usize] = true;
            last_wire_index = last_wire_index
                .max(out)
                .max(in_a)
                .max(in_b.unwrap_or(0));

            if in_b.is_some() && matches!(tt, 6 | 9) {
                num_of_xor_gates += 1;
            }
            if in_b.is_none() {
                num_of_not_gates += 1;
            }

            gates.push(Gate { in_a, in_b, out, tt });
        }

        let eof_line = stream.line_number();
        for &wire in &output_indices {
            if !written.get(wire as usize).copied().unwrap_or(false) {
                return Err(circuit_format_err(
                    eof_line,
                    format!("output wire {wire} is never written by a gate or primary input"),
                ));
            }
        }

        Ok(Circuit {
            number_of_parties,
            num_of_inputs_for_each_party,
            input_indices,
            output_indices,
            gates,
            num_of_xor_gates,
            num_of_not_gates,
            last_wire_index,
            flags,
        })
    }
}

fn parse_single_wire(stream: &mut BufferedLineStream) -> Result<u32, GcError> {
    let (line_no, line) = next_nonempty(stream)?;
    line.trim()
        .parse()
        .map_err(|_| circuit_format_err(line_no, "invalid wire index"))
}

/// Read the next line together with its 1-based line number, so callers never need to
/// borrow `stream` again (e.g. for error reporting) while the returned text is still in
/// use — that would conflict with the mutable borrow backing it.
fn next_nonempty<'a>(stream: &'a mut BufferedLineStream) -> Result<(usize, &'a str), GcError> {
    match stream.next_line() {
        Some(line) => {
            let (line_no, line) = line?;
            Ok((line_no, line))
        }
        None => Err(GcError::CircuitFormat {
            line: stream.line_number() + 1,
            reason: "unexpected end of file".to_string(),
        }),
    }
}

fn parse_tok<T: std::str::FromStr>(
    tokens: &mut std::str::SplitWhitespace<'_>,
    line: usize,
    name: &str,
) -> Result<T, GcError> {
    tokens
        .next()
        .ok_or_else(|| circuit_format_err(line, format!("missing {name}")))?
        .parse()
        .map_err(|_| circuit_format_err(line, format!("invalid {name}")))
}

fn no_trailing_tokens(mut tokens: std::str::SplitWhitespace<'_>, line: usize) -> Result<(), GcError> {
    if tokens.next().is_some() {
        return Err(circuit_format_err(line, "trailing tokens on line"));
    }
    Ok(())
}

fn ensure_len(vec: &mut Vec<bool>, wire: u32) {
    if wire as usize >= vec.len() {
        vec.resize(wire as usize + 1, false);
    }
}

fn check_written(written: &[bool], wire: u32, line: usize) -> Result<(), GcError> {
    if (wire as usize) >= written.len() || !written[wire as usize] {
        return Err(GcError::NonTopologicalGate { line, wire });
    }
    Ok(())
}

fn circuit_format_err(line: usize, reason: impl Into<String>) -> GcError {
    GcError::CircuitFormat {
        line,
        reason: reason.into(),
    }
}
