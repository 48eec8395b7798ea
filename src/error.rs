use thiserror::Error;

/// Failures of the oracle-driven attacks.
///
/// None of these indicate a bug in the caller: they mean the oracle did not
/// behave the way the attack needs, and a retry with other parameters may
/// succeed.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum AttackError {
    /// The ciphertext length never changed while probing.
    #[error("block size not found after probing up to {max_probe_len} bytes")]
    BlockSizeNotFound { max_probe_len: usize },

    /// Repeated plaintext blocks did not produce repeated ciphertext blocks.
    #[error("oracle does not encrypt with ECB")]
    NotEcb,

    /// Every probed block matched a candidate, so the padding was never reached.
    #[error("padding boundary not reached after recovering {recovered} bytes")]
    PaddingBoundaryNotFound { recovered: usize },

    /// The forged value cannot be padded into a single block.
    #[error("value of {len} bytes does not fit in one padded {block_size}-byte block")]
    ValueTooLong { len: usize, block_size: usize },

    /// The forged value contains a character the oracle strips from its input.
    #[error("value '{value}' contains a reserved character")]
    ReservedCharacter { value: String },

    /// The oracle's ciphertext is too short to hold the blocks being spliced.
    #[error("expected at least {expected} bytes of ciphertext, got {len}")]
    UnexpectedLayout { expected: usize, len: usize },
}
