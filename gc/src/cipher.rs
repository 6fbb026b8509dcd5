//! Fixed-key AES wrapper: the Davies-Meyer permutation used for gate encryption, and the
//! seeded PRG used to derive wire keys and keystream blocks.

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};

use crate::block::Block;

/// Process-wide fixed AES key backing the Davies-Meyer permutation `pi`. This is a
/// compile-time constant, not configurable state: every circuit instance, garbler,
/// evaluator and verifier must agree on it.
const FIXED_KEY: [u8; 16] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

/// Pairs the process-wide fixed-key permutation with a caller-seeded PRG key.
///
/// `seeded` is only needed by the garbler (to drive `prg_ecb`); compute and verify never
/// see the seed, so they build a cipher with `hash_only` instead of manufacturing a fake one.
#[derive(Clone)]
pub struct FixedKeyCipher {
    fixed: Aes128,
    seeded: Option<Aes128>,
}

impl std::fmt::Debug for FixedKeyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FixedKeyCipher {{ .. }}")
    }
}

impl FixedKeyCipher {
    /// Build a cipher seeded with the garbler's 128-bit seed, able to do both `hash` and
    /// `prg_ecb`.
    pub fn new(seed: Block) -> Self {
        Self {
            fixed: Aes128::new(GenericArray::from_slice(&FIXED_KEY)),
            seeded: Some(Aes128::new(GenericArray::from_slice(seed.as_bytes()))),
        }
    }

    /// Build a cipher that can only `hash`, not `prg_ecb`. Compute and verify never need the
    /// seed: the per-gate Davies-Meyer tweak is a public value (see `crate::garble::gate_tweak`),
    /// not PRG output, so they can run against a circuit that only ever saw published tables.
    pub fn hash_only() -> Self {
        Self {
            fixed: Aes128::new(GenericArray::from_slice(&FIXED_KEY)),
            seeded: None,
        }
    }

    /// `pi(x)`: single-block fixed-key AES encryption.
    fn pi(&self, x: Block) -> Block {
        let mut buf = GenericArray::clone_from_slice(x.as_bytes());
        self.fixed.encrypt_block(&mut buf);
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&buf);
        Block::new(bytes)
    }

    /// `H(ka, kb, k) = pi(2*ka XOR 4*kb XOR k) XOR (2*ka XOR 4*kb XOR k)`: Davies-Meyer
    /// on the fixed-key permutation, tweaked by the two input keys and the gate's
    /// keystream block.
    pub fn hash(&self, ka: Block, kb: Block, k: Block) -> Block {
        let tweak = mix(ka, kb, k);
        self.pi(tweak) ^ tweak
    }

    /// Seeded ECB-mode batch encryption. The only source of PRG randomness consumed by
    /// garbling: the garbler pre-stages every block it will need here before the gate walk.
    pub fn prg_ecb(&self, blocks: &[Block]) -> Vec<Block> {
        let seeded = self.seeded.as_ref().expect("prg_ecb requires a cipher built with FixedKeyCipher::new");
        let mut bufs: Vec<_> = blocks
            .iter()
            .map(|b| GenericArray::clone_from_slice(b.as_bytes()))
            .collect();
        seeded.encrypt_blocks(&mut bufs);
        bufs.into_iter()
            .map(|buf| {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&buf);
                Block::new(bytes)
            })
            .collect()
    }
}

/// `2*ka XOR 4*kb XOR k`, treating each block as a big-endian 128-bit integer.
fn mix(ka: Block, kb: Block, k: Block) -> Block {
    let a = u128::from_be_bytes(*ka.as_bytes());
    let b = u128::from_be_bytes(*kb.as_bytes());
    let kk = u128::from_be_bytes(*k.as_bytes());
    let combined = a.wrapping_shl(1) ^ b.wrapping_shl(2) ^ kk;
    Block::new(combined.to_be_bytes())
}
