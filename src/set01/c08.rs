// Detect AES in ECB mode

use std::collections::HashMap;

/// Count the distinct `block_size` chunks that appear more than once.
///
/// ECB maps equal plaintext blocks to equal ciphertext blocks, so any score
/// above zero is a strong hint the data was ECB encrypted. A trailing partial
/// chunk is ignored.
pub fn score_repeated_blocks(ciphertext: &[u8], block_size: usize) -> usize {
    assert!(block_size > 0, "block size must be non-zero");
    let mut occurrences: HashMap<&[u8], usize> = HashMap::new();
    for block in ciphertext.chunks_exact(block_size) {
        *occurrences.entry(block).or_default() += 1;
    }
    occurrences.values().filter(|&&count| count > 1).count()
}

/// Return the index of the candidate most likely to be ECB encrypted.
///
/// `None` if no candidate contains a repeated block.
pub fn find_ecb_ciphertext<T: AsRef<[u8]>>(candidates: &[T], block_size: usize) -> Option<usize> {
    candidates
        .iter()
        .map(|candidate| score_repeated_blocks(candidate.as_ref(), block_size))
        .enumerate()
        .filter(|(_, score)| *score > 0)
        .max_by_key(|(_, score)| *score)
        .map(|(index, _)| index)
}
