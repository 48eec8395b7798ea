mod aes;
mod block;
mod error;
mod set01;
mod set02;

pub use aes::{Aes128, AES_BLOCK_SIZE};
pub use block::{BlockCipher, BlockMode};
pub use error::AttackError;
pub use set01::c07::{
    decrypt_aes_128_ecb, ecb_decrypt, ecb_encrypt, encrypt_aes_128_ecb, EcbDecrypter,
    EcbEncrypter,
};
pub use set01::c08::{find_ecb_ciphertext, score_repeated_blocks};
pub use set02::c09::pkcs7_pad;
pub use set02::c10::{
    cbc_decrypt, cbc_encrypt, decrypt_aes_128_cbc, encrypt_aes_128_cbc, CbcDecrypter,
    CbcEncrypter,
};
pub use set02::c11::{
    detect_mode, random_bytes, DetectedMode, EncryptionOracle, ModeOfOperation, RandomModeOracle,
};
pub use set02::c12::{
    byte_at_a_time_ecb_decrypt, discover_block_count, discover_block_size, recover_ecb_suffix,
    EcbOracle, RecoveryConfig, MAX_PROBE_LEN,
};
pub use set02::c13::{
    forge_admin_profile, forge_role_profile, ProfileError, ProfileOracle, UserProfile,
};
pub use set02::c15::{pkcs7_unpad, pkcs7_unpad_checked, PaddingError};
