/// A keyed primitive that transforms exactly one block at a time.
///
/// Implementations must be usable from several threads at once, the mode
/// layer and the attacks fan blocks out over rayon.
pub trait BlockCipher: Send + Sync {
    fn block_size(&self) -> usize;

    /// Encrypt the single block in `src` into `dst`.
    ///
    /// Both slices must be exactly `block_size()` bytes long.
    fn encrypt_block(&self, dst: &mut [u8], src: &[u8]);

    /// Decrypt the single block in `src` into `dst`.
    ///
    /// Both slices must be exactly `block_size()` bytes long.
    fn decrypt_block(&self, dst: &mut [u8], src: &[u8]);
}

impl<C: BlockCipher + ?Sized> BlockCipher for &C {
    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn encrypt_block(&self, dst: &mut [u8], src: &[u8]) {
        (**self).encrypt_block(dst, src)
    }

    fn decrypt_block(&self, dst: &mut [u8], src: &[u8]) {
        (**self).decrypt_block(dst, src)
    }
}

/// A block cipher running in some mode of operation.
pub trait BlockMode {
    fn block_size(&self) -> usize;

    /// Transform every block of `src` into `dst`.
    ///
    /// Panics if `src` is not a whole number of blocks, or if `dst` is shorter
    /// than `src`.
    fn crypt_blocks(&mut self, dst: &mut [u8], src: &[u8]);
}

pub(crate) fn assert_full_blocks(block_size: usize, dst: &[u8], src: &[u8]) {
    assert!(
        src.len() % block_size == 0,
        "input of {} bytes is not a whole number of {block_size}-byte blocks",
        src.len()
    );
    assert!(
        dst.len() >= src.len(),
        "output of {} bytes is smaller than input of {} bytes",
        dst.len(),
        src.len()
    );
}

pub(crate) fn xor_in_place(target: &mut [u8], other: &[u8]) {
    target.iter_mut().zip(other).for_each(|(t, o)| *t ^= o);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_in_place_xors_every_byte() {
        let mut target = vec![0b1010, 0xFF, 0x00];

        xor_in_place(&mut target, &[0b0110, 0x0F, 0x42]);

        assert_eq!(target, [0b1100, 0xF0, 0x42]);
    }

    #[test]
    #[should_panic(expected = "not a whole number")]
    fn assert_full_blocks_panics_on_partial_block() {
        assert_full_blocks(16, &[0; 32], &[0; 17]);
    }

    #[test]
    #[should_panic(expected = "smaller than input")]
    fn assert_full_blocks_panics_on_short_output() {
        assert_full_blocks(16, &[0; 16], &[0; 32]);
    }

    #[test]
    fn toy_cipher_round_trips_a_block() {
        let cipher = testing::ToyCipher { key: 17 };
        let block = *b"8 bytes!";
        let mut encrypted = [0u8; 8];
        let mut decrypted = [0u8; 8];

        cipher.encrypt_block(&mut encrypted, &block);
        cipher.decrypt_block(&mut decrypted, &encrypted);

        assert_ne!(encrypted, block);
        assert_eq!(decrypted, block);
    }
}
