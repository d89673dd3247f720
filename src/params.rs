use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env::var;
use std::str::FromStr;

pub const DEFAULT_KEY_BITS: u64 = 1024;
pub const DEFAULT_MAX_PRIME_ATTEMPTS: usize = 10_000;
pub const DEFAULT_MILLER_RABIN_ROUNDS: usize = 50;

/// Tunables for key generation and primality testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Bit length of each of the two RSA primes.
    pub key_bits: u64,
    pub max_prime_attempts: usize,
    pub miller_rabin_rounds: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            max_prime_attempts: DEFAULT_MAX_PRIME_ATTEMPTS,
            miller_rabin_rounds: DEFAULT_MILLER_RABIN_ROUNDS,
        }
    }
}

impl Params {
    /// Reads `BLINDVOTE_KEY_BITS`, `BLINDVOTE_MAX_PRIME_ATTEMPTS` and
    /// `BLINDVOTE_MILLER_RABIN_ROUNDS`, using the default for any that is unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let params = Self {
            key_bits: env_or("BLINDVOTE_KEY_BITS", defaults.key_bits)?,
            max_prime_attempts: env_or(
                "BLINDVOTE_MAX_PRIME_ATTEMPTS",
                defaults.max_prime_attempts,
            )?,
            miller_rabin_rounds: env_or(
                "BLINDVOTE_MILLER_RABIN_ROUNDS",
                defaults.miller_rabin_rounds,
            )?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_bits < 2 {
            return Err(Error::InvalidBitLength(self.key_bits));
        }
        if self.max_prime_attempts == 0 {
            return Err(Error::InvalidParams(
                "max_prime_attempts must be non-zero".to_owned(),
            ));
        }
        if self.miller_rabin_rounds == 0 {
            return Err(Error::InvalidParams(
                "miller_rabin_rounds must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|_| Error::InvalidParams(format!("{} is not a valid number: {:?}", key, val))),
        Err(_e) => Ok(default),
    }
}
