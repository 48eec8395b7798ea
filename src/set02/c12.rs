// Byte-at-a-time ECB decryption (Simple)

use std::{
    collections::HashMap,
    ops::{Range, RangeInclusive},
    sync::OnceLock,
};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{
    aes::AES_BLOCK_SIZE, detect_mode, encrypt_aes_128_ecb, error::AttackError, random_bytes,
    DetectedMode, EncryptionOracle,
};

/// How far block size discovery grows its probe before giving up.
pub const MAX_PROBE_LEN: usize = 2048;

/// Encrypts `prefix || secret suffix` with AES-128-ECB under a fixed key.
///
/// The key is generated the first time the oracle is queried and then stays
/// the same for every later query, from any thread.
pub struct EcbOracle {
    key: OnceLock<[u8; AES_BLOCK_SIZE]>,
    unknown_bytes: Vec<u8>,
}

impl EcbOracle {
    pub fn new(unknown_bytes: Vec<u8>) -> Self {
        Self {
            key: OnceLock::new(),
            unknown_bytes,
        }
    }

    pub fn with_key(key: [u8; AES_BLOCK_SIZE], unknown_bytes: Vec<u8>) -> Self {
        Self {
            key: OnceLock::from(key),
            unknown_bytes,
        }
    }

    fn key(&self) -> &[u8; AES_BLOCK_SIZE] {
        self.key.get_or_init(random_bytes::<AES_BLOCK_SIZE>)
    }
}

impl EncryptionOracle for EcbOracle {
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8> {
        let message = [prefix, self.unknown_bytes.as_slice()].concat();
        encrypt_aes_128_ecb(&message, self.key())
    }
}

/// Find the oracle's block size from the jump in ciphertext length.
///
/// Probes grow one byte at a time up to `max_probe_len`; the first length
/// change is exactly one block.
pub fn discover_block_size<O: EncryptionOracle + ?Sized>(
    oracle: &O,
    max_probe_len: usize,
) -> Result<usize, AttackError> {
    let initial_len = oracle.encrypt(&[]).len();
    let mut probe = Vec::with_capacity(max_probe_len);
    for _ in 0..max_probe_len {
        probe.push(b'A');
        let ciphertext_len = oracle.encrypt(&probe).len();
        if ciphertext_len > initial_len {
            let block_size = ciphertext_len - initial_len;
            debug!(block_size, probe_len = probe.len(), "discovered block size");
            return Ok(block_size);
        }
    }
    Err(AttackError::BlockSizeNotFound { max_probe_len })
}

/// The number of blocks the oracle produces for an empty input.
pub fn discover_block_count<O: EncryptionOracle + ?Sized>(oracle: &O, block_size: usize) -> usize {
    assert!(block_size > 0, "block size must be non-zero");
    oracle.encrypt(&[]).len() / block_size
}

/// Tunables for [`recover_ecb_suffix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// The byte our alignment filler is made of.
    pub filler: u8,
    /// The byte values to try for each unknown byte.
    pub alphabet: RangeInclusive<u8>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            filler: b'A',
            alphabet: 0..=255,
        }
    }
}

impl RecoveryConfig {
    /// Only try tab through `~`, which covers printable ASCII text.
    pub fn printable() -> Self {
        Self {
            filler: b'A',
            alphabet: b'\t'..=b'~',
        }
    }

    fn candidates(&self) -> Vec<u8> {
        // The first padding byte must always be tried, a miss on it is how the
        // end of the secret is found.
        let mut candidates: Vec<u8> = self.alphabet.clone().collect();
        if !self.alphabet.contains(&PADDING_BOUNDARY_BYTE) {
            candidates.insert(0, PADDING_BOUNDARY_BYTE);
        }
        candidates
    }
}

const PADDING_BOUNDARY_BYTE: u8 = 0x01;

/// Discover the block size, check the oracle uses ECB, then recover its suffix.
pub fn byte_at_a_time_ecb_decrypt<O>(oracle: &O) -> Result<Vec<u8>, AttackError>
where
    O: EncryptionOracle + Sync + ?Sized,
{
    let block_size = discover_block_size(oracle, MAX_PROBE_LEN)?;
    if detect_mode(oracle, block_size) != DetectedMode::Ecb {
        return Err(AttackError::NotEcb);
    }
    recover_ecb_suffix(oracle, block_size, &RecoveryConfig::default())
}

/// Recover the secret an ECB oracle appends to our input, one byte at a time.
///
/// For each unknown byte we shorten a filler so the byte is the last one of
/// a block, note that block's ciphertext, then encrypt `filler || known || v`
/// for every candidate `v` to see which one produces the same block. Once
/// the secret runs out, the block under attack ends in padding that changes
/// with our filler length: we match one padding byte, then miss. The miss
/// ends the attack and the matched padding byte is dropped.
///
/// If two candidates produce the same block the later one wins.
pub fn recover_ecb_suffix<O>(
    oracle: &O,
    block_size: usize,
    config: &RecoveryConfig,
) -> Result<Vec<u8>, AttackError>
where
    O: EncryptionOracle + Sync + ?Sized,
{
    let candidates = config.candidates();
    // One block more than the empty input gives, the padding may spill over.
    let max_blocks = discover_block_count(oracle, block_size) + 1;
    let mut known_bytes: Vec<u8> = Vec::new();

    for block_index in 0..max_blocks {
        let block_range = (block_index * block_size)..((block_index + 1) * block_size);
        for offset in 1..=block_size {
            let filler = vec![config.filler; block_size - offset];
            let ciphertext = oracle.encrypt(&filler);
            let target_block = ciphertext.get(block_range.clone()).ok_or(
                AttackError::PaddingBoundaryNotFound {
                    recovered: known_bytes.len(),
                },
            )?;

            let table =
                build_candidate_table(oracle, &filler, &known_bytes, &candidates, &block_range);
            match table.get(target_block) {
                Some(&byte) => {
                    trace!(block_index, offset, byte, "recovered byte");
                    known_bytes.push(byte);
                }
                None => {
                    known_bytes.pop();
                    debug!(recovered = known_bytes.len(), "reached padding");
                    return Ok(known_bytes);
                }
            }
        }
    }
    Err(AttackError::PaddingBoundaryNotFound {
        recovered: known_bytes.len(),
    })
}

fn build_candidate_table<O>(
    oracle: &O,
    filler: &[u8],
    known_bytes: &[u8],
    candidates: &[u8],
    block_range: &Range<usize>,
) -> HashMap<Vec<u8>, u8>
where
    O: EncryptionOracle + Sync + ?Sized,
{
    let template = [filler, known_bytes, &[0u8][..]].concat();
    let last = template.len() - 1;
    let blocks: Vec<Option<(Vec<u8>, u8)>> = candidates
        .par_iter()
        .map_with(template, |message, &byte| {
            message[last] = byte;
            let ciphertext = oracle.encrypt(&message[..]);
            ciphertext
                .get(block_range.clone())
                .map(|block| (block.to_vec(), byte))
        })
        .collect();
    // Insert in candidate order so collisions resolve the same way every run.
    blocks.into_iter().flatten().collect()
}
