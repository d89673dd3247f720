use thiserror::Error;

/// Specialisation of `std::Result`.
pub type Result<T, E = BlindSignatureError> = std::result::Result<T, E>;
pub type Error = BlindSignatureError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// error variants.
pub enum BlindSignatureError {
    #[error("no {bits}-bit prime found after {attempts} attempts")]
    GenerationExhausted { bits: u64, attempts: usize },

    #[error("no modular inverse exists")]
    NoModularInverse,

    #[error("invalid prime bit length {0}, must be at least 2")]
    InvalidBitLength(u64),

    #[error("message is not smaller than the modulus")]
    MessageOutOfRange,

    #[error("no blinding factor held, blind a message first")]
    MissingBlindingFactor,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}
