// PKCS#7 padding validation

use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum PaddingError {
    #[error("invalid pkcs7 padding")]
    Invalid,
}

/// Strip PKCS#7 padding, returning the input unchanged if it is not padded.
///
/// This is deliberately permissive. Callers that must distinguish bad
/// padding from unpadded data should use [`pkcs7_unpad_checked`], keeping in
/// mind that reporting the difference to an attacker is a padding oracle.
pub fn pkcs7_unpad(bytes: &[u8]) -> Vec<u8> {
    match pkcs7_pad_len(bytes) {
        Some(n_pad) => bytes[..(bytes.len() - n_pad)].to_vec(),
        None => bytes.to_vec(),
    }
}

/// Strip PKCS#7 padding, failing if the trailing bytes are not valid padding.
pub fn pkcs7_unpad_checked(bytes: &[u8]) -> Result<Vec<u8>, PaddingError> {
    let n_pad = pkcs7_pad_len(bytes).ok_or(PaddingError::Invalid)?;
    Ok(bytes[..(bytes.len() - n_pad)].to_vec())
}

fn pkcs7_pad_len(bytes: &[u8]) -> Option<usize> {
    let n_pad = *bytes.last()?;
    if n_pad == 0 || n_pad as usize > bytes.len() {
        return None;
    }
    let padding = &bytes[(bytes.len() - n_pad as usize)..];
    padding
        .iter()
        .all(|&el| el == n_pad)
        .then_some(n_pad as usize)
}
