// AES in ECB mode

use rayon::prelude::*;

use crate::{
    aes::{Aes128, AES_BLOCK_SIZE},
    block::{assert_full_blocks, BlockCipher, BlockMode},
    pkcs7_pad, pkcs7_unpad,
};

/// Electronic codebook encryption: every block is encrypted on its own.
///
/// Equal plaintext blocks give equal ciphertext blocks under one key, which
/// is exactly what the attacks in this crate exploit.
pub struct EcbEncrypter<C> {
    cipher: C,
}

pub struct EcbDecrypter<C> {
    cipher: C,
}

impl<C: BlockCipher> EcbEncrypter<C> {
    pub fn new(cipher: C) -> Self {
        Self { cipher }
    }
}

impl<C: BlockCipher> EcbDecrypter<C> {
    pub fn new(cipher: C) -> Self {
        Self { cipher }
    }
}

impl<C: BlockCipher> BlockMode for EcbEncrypter<C> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) {
        let block_size = self.block_size();
        assert_full_blocks(block_size, dst, src);
        dst[..src.len()]
            .par_chunks_mut(block_size)
            .zip(src.par_chunks(block_size))
            .for_each(|(out, block)| self.cipher.encrypt_block(out, block));
    }
}

impl<C: BlockCipher> BlockMode for EcbDecrypter<C> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) {
        let block_size = self.block_size();
        assert_full_blocks(block_size, dst, src);
        dst[..src.len()]
            .par_chunks_mut(block_size)
            .zip(src.par_chunks(block_size))
            .for_each(|(out, block)| self.cipher.decrypt_block(out, block));
    }
}

/// Encrypt block-aligned `plaintext` with ECB. No padding is applied.
pub fn ecb_encrypt<C: BlockCipher>(cipher: C, plaintext: &[u8]) -> Vec<u8> {
    let mut ciphertext = vec![0; plaintext.len()];
    EcbEncrypter::new(cipher).crypt_blocks(&mut ciphertext, plaintext);
    ciphertext
}

/// Decrypt block-aligned `ciphertext` with ECB. Padding is left in place.
pub fn ecb_decrypt<C: BlockCipher>(cipher: C, ciphertext: &[u8]) -> Vec<u8> {
    let mut plaintext = vec![0; ciphertext.len()];
    EcbDecrypter::new(cipher).crypt_blocks(&mut plaintext, ciphertext);
    plaintext
}

/// PKCS#7 pad `plaintext` and encrypt it with AES-128 in ECB mode.
pub fn encrypt_aes_128_ecb(plaintext: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let padded = pkcs7_pad(plaintext, AES_BLOCK_SIZE as u8);
    ecb_encrypt(Aes128::new(key), &padded)
}

/// Decrypt AES-128 ECB `ciphertext` and strip any PKCS#7 padding.
pub fn decrypt_aes_128_ecb(ciphertext: &[u8], key: &[u8; 16]) -> Vec<u8> {
    pkcs7_unpad(&ecb_decrypt(Aes128::new(key), ciphertext))
}
