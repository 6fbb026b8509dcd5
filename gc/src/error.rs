//! Typed errors returned by the garbled-circuit engine.

/// Errors produced by the circuit loader and the garble/compute/verify/translate engines.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// The circuit file is malformed.
    #[error("circuit format error at line {line}: {reason}")]
    CircuitFormat {
        /// 1-based line number the error was detected at.
        line: usize,
        /// Human-readable reason.
        reason: String,
    },
    /// A wire index referenced by a gate or by caller-supplied keys exceeds `last_wire_index`.
    #[error("wire index {index} out of range (last wire index is {last})")]
    WireIndexOutOfRange {
        /// Offending index.
        index: u32,
        /// Largest valid wire index for this circuit.
        last: u32,
    },
    /// A gate reads an input wire that has not been produced yet by an earlier gate or
    /// declared as a primary input.
    #[error("gate at line {line} reads wire {wire} before it is written")]
    NonTopologicalGate {
        /// 1-based line number of the offending gate.
        line: usize,
        /// Wire index read before being written.
        wire: u32,
    },
    /// `compute`/`verify`/`translate`/`get_garbled_tables` called before `garble` or
    /// `set_garbled_tables`.
    #[error("operation requires a garbled circuit, but circuit is only loaded")]
    StateError,
    /// A caller-supplied buffer (keys, garbled tables, translation table) has the wrong length.
    #[error("expected buffer of length {expected}, got {actual}")]
    SizeMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length supplied.
        actual: usize,
    },
    /// Underlying I/O failure while reading the circuit file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
