// An ECB/CBC detection oracle

use rand::{Rng, RngCore};
use tracing::debug;

use crate::{
    aes::{Aes128, AES_BLOCK_SIZE},
    cbc_encrypt, ecb_encrypt, pkcs7_pad, score_repeated_blocks,
};

/// Something that encrypts attacker-chosen input under a key we don't know.
///
/// This is the whole surface the attacks need from the system under attack.
/// Any `Fn(&[u8]) -> Vec<u8>` is an oracle, so tests can plug in closures.
pub trait EncryptionOracle {
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8>;
}

impl<F> EncryptionOracle for F
where
    F: Fn(&[u8]) -> Vec<u8>,
{
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8> {
        self(prefix)
    }
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// What [`detect_mode`] concluded about an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedMode {
    Ecb,
    Other,
}

/// Decide whether `oracle` encrypts with ECB.
///
/// Three blocks of one repeated byte always contain two aligned, identical
/// plaintext blocks, whatever the oracle puts in front of our input.
pub fn detect_mode<O: EncryptionOracle + ?Sized>(oracle: &O, block_size: usize) -> DetectedMode {
    let probe = vec![b'A'; 3 * block_size];
    let score = score_repeated_blocks(&oracle.encrypt(&probe), block_size);
    let mode = if score > 0 {
        DetectedMode::Ecb
    } else {
        DetectedMode::Other
    };
    debug!(block_size, score, ?mode, "detected block cipher mode");
    mode
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOfOperation {
    Ecb,
    Cbc,
}

/// Encrypts under a fresh random key, in ECB or CBC chosen by a coin flip.
///
/// The input is wrapped in 5-10 random bytes on each side before padding.
#[derive(Debug, Default)]
pub struct RandomModeOracle;

impl RandomModeOracle {
    pub fn new() -> Self {
        Self
    }

    /// Encrypt `input`, also returning the mode that was picked.
    pub fn encrypt_reporting_mode(&self, input: &[u8]) -> (ModeOfOperation, Vec<u8>) {
        let mut rng = rand::thread_rng();
        let key = random_bytes::<AES_BLOCK_SIZE>();
        let mut plaintext = random_filler(&mut rng);
        plaintext.extend_from_slice(input);
        plaintext.extend(random_filler(&mut rng));
        let padded = pkcs7_pad(&plaintext, AES_BLOCK_SIZE as u8);

        if rng.gen_bool(0.5) {
            (ModeOfOperation::Ecb, ecb_encrypt(Aes128::new(&key), &padded))
        } else {
            let iv = random_bytes::<AES_BLOCK_SIZE>();
            (
                ModeOfOperation::Cbc,
                cbc_encrypt(Aes128::new(&key), &iv, &padded),
            )
        }
    }
}

impl EncryptionOracle for RandomModeOracle {
    fn encrypt(&self, prefix: &[u8]) -> Vec<u8> {
        self.encrypt_reporting_mode(prefix).1
    }
}

fn random_filler<R: Rng>(rng: &mut R) -> Vec<u8> {
    let len = rng.gen_range(5..=10usize);
    (0..len).map(|_| rng.gen()).collect()
}
