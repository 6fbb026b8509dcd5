//! Crate-wide constants.

/// Default buffer size for the circuit line reader (256 MiB).
pub const BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// How often (in gates) the progress bar position is refreshed during a gate walk.
pub const PROGRESS_UPDATE_INTERVAL: u32 = 1000;

/// Size in bytes of a wire key / garbled-table ciphertext block.
pub const KEY_SIZE: usize = 16;
