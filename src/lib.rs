//! RSA blind signatures for anonymous voting.
//!
//! An authority signs a voter's blinded ballot hash without learning the
//! ballot, the voter strips the blinding factor, and anyone holding the
//! authority's public key can later check the revealed ballot.

mod authn;
mod blind_sigs;
mod error;
mod keygen;
mod params;
mod primality;
mod utils;

pub use crate::authn::{identity_hash, verify_identity, Authenticator, IdentityToken};
pub use crate::blind_sigs::{
    verify_signature, Ballot, BlindSignature, BlindSigner, BlindVoter, BlindedMessage,
    Eligibility, UnblindedSignature, Verification,
};
pub use crate::error::{BlindSignatureError, Error, Result};
pub use crate::keygen::{extended_gcd, generate_prime, mod_inverse, KeyPair, PublicKey};
pub use crate::params::Params;
pub use crate::primality::{is_probably_prime, is_probably_prime_with_rounds, miller_rabin};
pub use crate::utils::hash_to_int;
