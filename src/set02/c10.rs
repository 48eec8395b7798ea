// Implement CBC mode

use rayon::prelude::*;

use crate::{
    aes::{Aes128, AES_BLOCK_SIZE},
    block::{assert_full_blocks, xor_in_place, BlockCipher, BlockMode},
    pkcs7_pad, pkcs7_unpad,
};

/// Cipher block chaining encryption.
///
/// Holds the running block (initially the IV) for the life of one stream;
/// an IV must never be reused for two streams under the same key.
pub struct CbcEncrypter<C> {
    cipher: C,
    last_block: Vec<u8>,
}

/// Cipher block chaining decryption.
pub struct CbcDecrypter<C> {
    cipher: C,
    last_block: Vec<u8>,
}

fn assert_iv_len<C: BlockCipher>(cipher: &C, iv: &[u8]) {
    assert_eq!(
        iv.len(),
        cipher.block_size(),
        "IV length must equal the cipher's block size"
    );
}

impl<C: BlockCipher> CbcEncrypter<C> {
    pub fn new(cipher: C, iv: &[u8]) -> Self {
        assert_iv_len(&cipher, iv);
        Self {
            cipher,
            last_block: iv.to_vec(),
        }
    }
}

impl<C: BlockCipher> CbcDecrypter<C> {
    pub fn new(cipher: C, iv: &[u8]) -> Self {
        assert_iv_len(&cipher, iv);
        Self {
            cipher,
            last_block: iv.to_vec(),
        }
    }
}

impl<C: BlockCipher> BlockMode for CbcEncrypter<C> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) {
        let block_size = self.block_size();
        assert_full_blocks(block_size, dst, src);
        // Each block's input depends on the previous block's output.
        for (out, block) in dst.chunks_mut(block_size).zip(src.chunks(block_size)) {
            xor_in_place(&mut self.last_block, block);
            self.cipher.encrypt_block(out, &self.last_block);
            self.last_block.copy_from_slice(out);
        }
    }
}

impl<C: BlockCipher> BlockMode for CbcDecrypter<C> {
    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]) {
        let block_size = self.block_size();
        assert_full_blocks(block_size, dst, src);
        if src.is_empty() {
            return;
        }
        let iv = self.last_block.as_slice();
        dst[..src.len()]
            .par_chunks_mut(block_size)
            .enumerate()
            .for_each(|(i, out)| {
                let start = i * block_size;
                self.cipher
                    .decrypt_block(out, &src[start..(start + block_size)]);
                let previous = if i == 0 {
                    iv
                } else {
                    &src[(start - block_size)..start]
                };
                xor_in_place(out, previous);
            });
        self.last_block
            .copy_from_slice(&src[(src.len() - block_size)..]);
    }
}

/// Encrypt block-aligned `plaintext` with CBC. No padding is applied.
pub fn cbc_encrypt<C: BlockCipher>(cipher: C, iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut ciphertext = vec![0; plaintext.len()];
    CbcEncrypter::new(cipher, iv).crypt_blocks(&mut ciphertext, plaintext);
    ciphertext
}

/// Decrypt block-aligned `ciphertext` with CBC. Padding is left in place.
pub fn cbc_decrypt<C: BlockCipher>(cipher: C, iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut plaintext = vec![0; ciphertext.len()];
    CbcDecrypter::new(cipher, iv).crypt_blocks(&mut plaintext, ciphertext);
    plaintext
}

/// PKCS#7 pad `plaintext` and encrypt it with AES-128 in CBC mode.
pub fn encrypt_aes_128_cbc(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let padded = pkcs7_pad(plaintext, AES_BLOCK_SIZE as u8);
    cbc_encrypt(Aes128::new(key), iv, &padded)
}

/// Decrypt AES-128 CBC `ciphertext` and strip any PKCS#7 padding.
pub fn decrypt_aes_128_cbc(ciphertext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    pkcs7_unpad(&cbc_decrypt(Aes128::new(key), iv, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::{self, Engine};
    use rstest::rstest;

    use crate::{block::testing::ToyCipher, ecb_encrypt};

    // "I'm back and I'm ringin' the bel" under YELLOW SUBMARINE with a zero IV.
    const FUNKY_BLOCKS_B64: &str = "CRIwqt4+szDbqkNY+I0qbNXPg1XLaCM5etQ5Bt9DRFU=";

    #[test]
    fn decrypt_aes_128_cbc_returns_expected_plaintext() {
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(FUNKY_BLOCKS_B64)
            .unwrap();
        let iv = [0u8; 16];

        let plaintext = cbc_decrypt(Aes128::new(b"YELLOW SUBMARINE"), &iv, &ciphertext);

        assert_eq!(plaintext, b"I'm back and I'm ringin' the bel");
    }

    #[rstest]
    #[case(
        *b"Please test me!!",
        [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3],
        b"We all live in a yellow submarine, yellow subm..".as_slice(),
    )]
    #[case(
        *b"Dont Stop Me Now",
        [1, 2, 3, 4, 34, 78, 16, 1, 2, 2, 2, 2, 3, 3, 3, 3],
        b"Cause we're having a good time..".as_slice(),
    )]
    fn cbc_decrypt_inverts_cbc_encrypt(
        #[case] key: [u8; 16],
        #[case] iv: [u8; 16],
        #[case] plaintext: &[u8],
    ) {
        let ciphertext = cbc_encrypt(Aes128::new(&key), &iv, plaintext);

        assert_ne!(ciphertext, plaintext);
        assert_eq!(cbc_decrypt(Aes128::new(&key), &iv, &ciphertext), plaintext);
    }

    #[test]
    fn cbc_chains_first_block_with_iv() {
        let key = *b"YELLOW SUBMARINE";
        let iv = *b"0123456789abcdef";
        let block = *b"sixteen byte msg";
        let mut xored = block;
        xor_in_place(&mut xored, &iv);

        let ciphertext = cbc_encrypt(Aes128::new(&key), &iv, &block);

        assert_eq!(ciphertext, ecb_encrypt(Aes128::new(&key), &xored));
    }

    #[test]
    fn cbc_hides_repeated_blocks() {
        let plaintext = [b"YELLOW SUBMARINE".as_slice(); 2].concat();

        let ciphertext = cbc_encrypt(Aes128::new(b"Dont Stop Me Now"), &[0; 16], &plaintext);

        assert_ne!(ciphertext[..16], ciphertext[16..]);
    }

    #[test]
    fn cbc_streams_continue_across_calls() {
        let cipher = ToyCipher { key: 9 };
        let iv = *b"initvect";
        let plaintext: Vec<u8> = (0..40).collect();
        let whole = cbc_encrypt(&cipher, &iv, &plaintext);

        let mut encrypter = CbcEncrypter::new(&cipher, &iv);
        let mut pieces = vec![0; 40];
        encrypter.crypt_blocks(&mut pieces[..16], &plaintext[..16]);
        encrypter.crypt_blocks(&mut pieces[16..], &plaintext[16..]);

        let mut decrypter = CbcDecrypter::new(&cipher, &iv);
        let mut decrypted = vec![0; 40];
        decrypter.crypt_blocks(&mut decrypted[..24], &whole[..24]);
        decrypter.crypt_blocks(&mut decrypted[24..], &whole[24..]);

        assert_eq!(pieces, whole);
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    #[should_panic(expected = "IV length")]
    fn cbc_encrypter_panics_given_short_iv() {
        CbcEncrypter::new(Aes128::new(b"YELLOW SUBMARINE"), &[0; 8]);
    }

    #[test]
    #[should_panic(expected = "not a whole number")]
    fn cbc_decrypt_panics_given_partial_block() {
        cbc_decrypt(Aes128::new(b"YELLOW SUBMARINE"), &[0; 16], &[0; 20]);
    }

    #[test]
    fn encrypt_then_decrypt_aes_128_cbc_returns_message() {
        let key = *b"YELLOW SUBMARINE";
        let iv = [7u8; 16];
        let message = b"I'm back and I'm ringin' the bell";

        let ciphertext = encrypt_aes_128_cbc(message, &key, &iv);

        assert_eq!(ciphertext.len(), 48);
        assert_eq!(decrypt_aes_128_cbc(&ciphertext, &key, &iv), message);
    }
}
