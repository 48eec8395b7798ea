// Implement PKCS#7 padding

/// Pad `bytes` to a whole number of `block_size` blocks.
///
/// Block-aligned input still gains a full block of padding, so the output is
/// always between 1 and `block_size` bytes longer than the input.
pub fn pkcs7_pad(bytes: &[u8], block_size: u8) -> Vec<u8> {
    assert!(block_size > 0, "PKCS#7 block size must be non-zero");
    let n_pad = block_size - (bytes.len() % block_size as usize) as u8;
    let mut out = Vec::with_capacity(bytes.len() + n_pad as usize);
    out.extend_from_slice(bytes);
    out.resize(bytes.len() + n_pad as usize, n_pad);
    out
}
