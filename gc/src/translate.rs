//! The translation table: one byte per output wire holding the signal bit of that wire's
//! 0-key, letting `translate` turn an output key back into a bit without learning the key's
//! full value.

use crate::block::Block;
use crate::error::GcError;

/// Build the translation table from both garbled keys of every output wire, in
/// `circuit.output_indices` order.
pub fn build_translation_table(output_both_keys: &[[Block; 2]]) -> Vec<u8> {
    output_both_keys.iter().map(|pair| pair[0].signal_bit()).collect()
}

/// `bit = signal(outputKey[w]) XOR translationTable[w]` for every output wire.
///
/// Fails only if `translation_table` is empty while `output_keys` is not (a circuit with
/// outputs whose translation table was never set); any non-empty table of matching length
/// always succeeds.
pub fn translate(translation_table: &[u8], output_keys: &[Block]) -> Result<Vec<bool>, GcError> {
    if output_keys.is_empty() {
        return Ok(Vec::new());
    }
    if translation_table.is_empty() {
        return Err(GcError::SizeMismatch { expected: output_keys.len(), actual: 0 });
    }
    if translation_table.len() != output_keys.len() {
        return Err(GcError::SizeMismatch {
            expected: output_keys.len(),
            actual: translation_table.len(),
        });
    }
    Ok(output_keys
        .iter()
        .zip(translation_table)
        .map(|(key, &bit)| (key.signal_bit() ^ bit) == 1)
        .collect())
}

/// `verifyTranslationTable`: for each output wire, check `signal(bothWires[w][0]) ==
/// translationTable[w]` and `signal(bothWires[w][1]) == 1 - translationTable[w]`.
pub fn verify_translation_table(both_output_keys: &[[Block; 2]], translation_table: &[u8]) -> bool {
    if both_output_keys.len() != translation_table.len() {
        return false;
    }
    both_output_keys.iter().zip(translation_table).all(|(pair, &bit)| {
        pair[0].signal_bit() == bit && pair[1].signal_bit() == 1 - bit
    })
}
