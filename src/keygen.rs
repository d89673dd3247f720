//! RSA key generation from scratch: prime search, the extended Euclidean
//! algorithm and modular inversion.

use crate::error::{Error, Result};
use crate::params::{Params, DEFAULT_MAX_PRIME_ATTEMPTS, DEFAULT_MILLER_RABIN_ROUNDS};
use crate::primality::is_probably_prime_with_rounds;
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Draws odd candidates from `[2^(bits-1), 2^bits)` until one is probably
/// prime, giving up after `max_attempts` draws.
pub fn generate_prime<R: RngCore + CryptoRng>(
    bits: u64,
    max_attempts: usize,
    rng: &mut R,
) -> Result<BigUint> {
    find_prime(bits, max_attempts, DEFAULT_MILLER_RABIN_ROUNDS, rng)
}

fn find_prime<R: RngCore + CryptoRng>(
    bits: u64,
    max_attempts: usize,
    rounds: usize,
    rng: &mut R,
) -> Result<BigUint> {
    if bits < 2 {
        return Err(Error::InvalidBitLength(bits));
    }
    let lower = BigUint::one() << (bits - 1);
    let upper = BigUint::one() << bits;

    for attempt in 1..=max_attempts {
        let mut candidate = rng.gen_biguint_range(&lower, &upper);
        // 2^bits - 1 is odd, so this stays below the upper bound
        if candidate.is_even() {
            candidate += 1u32;
        }
        if is_probably_prime_with_rounds(&candidate, rounds, rng) {
            debug!(bits, attempt, "found probable prime");
            return Ok(candidate);
        }
    }

    warn!(bits, max_attempts, "prime search exhausted");
    Err(Error::GenerationExhausted {
        bits,
        attempts: max_attempts,
    })
}

/// Returns `(g, x, y)` with `a*x + b*y = g = gcd(a, b)`.
pub fn extended_gcd(a: &BigUint, b: &BigUint) -> (BigUint, BigInt, BigInt) {
    let mut old_r = BigInt::from(a.clone());
    let mut r = BigInt::from(b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let (quotient, remainder) = old_r.div_rem(&r);
        old_r = std::mem::replace(&mut r, remainder);

        let next_x = &old_x - &quotient * &x;
        old_x = std::mem::replace(&mut x, next_x);

        let next_y = &old_y - &quotient * &y;
        old_y = std::mem::replace(&mut y, next_y);
    }

    // both inputs are non-negative, so the remainder chain is too
    let (_, gcd) = old_r.into_parts();
    (gcd, old_x, old_y)
}

/// The `x` in `[0, modulus)` with `value * x = 1 (mod modulus)`.
pub fn mod_inverse(value: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(Error::NoModularInverse);
    }
    let (gcd, x, _) = extended_gcd(value, modulus);
    if !gcd.is_one() {
        return Err(Error::NoModularInverse);
    }
    let (_, inverse) = x.mod_floor(&BigInt::from(modulus.clone())).into_parts();
    Ok(inverse)
}

/// The publishable half of a [`KeyPair`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    n: BigUint,
    e: BigUint,
}

impl PublicKey {
    pub fn new(n: BigUint, e: BigUint) -> Self {
        Self { n, e }
    }

    /// The modulus.
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// The public exponent.
    pub fn e(&self) -> &BigUint {
        &self.e
    }
}

/// An RSA keypair: `n = p*q` and `e*d = 1 (mod (p-1)(q-1))`.
///
/// The primes are dropped once `d` is derived. Only [`PublicKey`] is meant
/// to leave the owner.
#[derive(Clone)]
pub struct KeyPair {
    n: BigUint,
    e: BigUint,
    d: BigUint,
}

impl KeyPair {
    /// Generates a keypair from two distinct `bits`-bit primes.
    pub fn generate<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> Result<Self> {
        let params = Params {
            key_bits: bits,
            max_prime_attempts: DEFAULT_MAX_PRIME_ATTEMPTS,
            miller_rabin_rounds: DEFAULT_MILLER_RABIN_ROUNDS,
        };
        Self::generate_with_params(&params, rng)
    }

    pub fn generate_with_params<R: RngCore + CryptoRng>(
        params: &Params,
        rng: &mut R,
    ) -> Result<Self> {
        params.validate()?;
        let bits = params.key_bits;
        let attempts = params.max_prime_attempts;
        let rounds = params.miller_rabin_rounds;

        let p = find_prime(bits, attempts, rounds, rng)?;
        let mut collisions = 0;
        let q = loop {
            let q = find_prime(bits, attempts, rounds, rng)?;
            if q != p {
                break q;
            }
            // tiny bit lengths have very few primes to choose from
            collisions += 1;
            if collisions >= attempts {
                return Err(Error::GenerationExhausted { bits, attempts });
            }
        };

        let keypair = Self::from_primes(&p, &q, rng)?;
        info!(bits, modulus_bits = keypair.n.bits(), "generated RSA keypair");
        Ok(keypair)
    }

    /// Builds a keypair from two distinct primes, drawing `e` uniformly from
    /// `[2, phi)` until it is coprime to `phi`.
    pub fn from_primes<R: RngCore + CryptoRng>(
        p: &BigUint,
        q: &BigUint,
        rng: &mut R,
    ) -> Result<Self> {
        if p == q {
            return Err(Error::InvalidParams("primes must be distinct".to_owned()));
        }
        let n = p * q;
        let phi = (p - 1u32) * (q - 1u32);
        if phi <= BigUint::from(2u32) {
            return Err(Error::InvalidParams(
                "primes too small for an RSA modulus".to_owned(),
            ));
        }

        let two = BigUint::from(2u32);
        let (e, d) = loop {
            let e = rng.gen_biguint_range(&two, &phi);
            match mod_inverse(&e, &phi) {
                Ok(d) => break (e, d),
                Err(Error::NoModularInverse) => continue,
                Err(err) => return Err(err),
            }
        };

        Ok(Self { n, e, d })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.n.clone(), self.e.clone())
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }

    pub fn e(&self) -> &BigUint {
        &self.e
    }

    pub(crate) fn d(&self) -> &BigUint {
        &self.d
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("n", &self.n)
            .field("e", &self.e)
            .field("d", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primality::is_probably_prime;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(1024)
    }

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn generated_primes_have_requested_size() -> Result<()> {
        let mut rng = rng();
        for &bits in [2u64, 3, 8, 17, 64, 128].iter() {
            let p = generate_prime(bits, DEFAULT_MAX_PRIME_ATTEMPTS, &mut rng)?;
            assert_eq!(p.bits(), bits);
            assert!(p.is_odd());
            assert!(is_probably_prime(&p, &mut rng));
        }
        Ok(())
    }

    #[test]
    fn prime_search_limits() {
        let mut rng = rng();
        assert_eq!(
            generate_prime(1, 10, &mut rng),
            Err(Error::InvalidBitLength(1))
        );
        assert_eq!(
            generate_prime(256, 0, &mut rng),
            Err(Error::GenerationExhausted {
                bits: 256,
                attempts: 0
            })
        );
    }

    #[test]
    fn extended_gcd_bezout_identity() {
        let cases = [(240u64, 46u64), (46, 240), (17, 3120), (0, 5), (5, 0), (12, 18), (1, 1)];
        for &(a, b) in cases.iter() {
            let (g, x, y) = extended_gcd(&big(a), &big(b));
            assert_eq!(g, big(a).gcd(&big(b)));
            let lhs = BigInt::from(a) * &x + BigInt::from(b) * &y;
            assert_eq!(lhs, BigInt::from(g.clone()), "bezout failed for {} {}", a, b);
        }
    }

    #[test]
    fn mod_inverse_exhaustive_small_moduli() {
        for m in 2u64..60 {
            for a in 0..m {
                let result = mod_inverse(&big(a), &big(m));
                if a.gcd(&m) == 1 {
                    let x = result.unwrap();
                    assert!(x < big(m));
                    assert_eq!((big(a) * x) % big(m), BigUint::one());
                } else {
                    assert_eq!(result, Err(Error::NoModularInverse));
                }
            }
        }
    }

    #[test]
    fn mod_inverse_known_value() {
        assert_eq!(mod_inverse(&big(17), &big(3120)), Ok(big(2753)));
        assert_eq!(mod_inverse(&big(3), &BigUint::zero()), Err(Error::NoModularInverse));
    }

    #[test]
    fn keypair_exponents_are_inverse() -> Result<()> {
        let mut rng = rng();
        let (p, q) = (big(61), big(53));
        let phi = big(60 * 52);
        for _ in 0..20 {
            let keypair = KeyPair::from_primes(&p, &q, &mut rng)?;
            assert_eq!(keypair.n(), &big(3233));
            assert!(keypair.e() >= &big(2) && keypair.e() < &phi);
            assert_eq!((keypair.e() * keypair.d()) % &phi, BigUint::one());
        }
        assert!(matches!(
            KeyPair::from_primes(&p, &p, &mut rng),
            Err(Error::InvalidParams(_))
        ));
        Ok(())
    }

    #[test]
    fn rsa_round_trip() -> Result<()> {
        let mut rng = rng();
        let keypair = KeyPair::generate(128, &mut rng)?;
        let n = keypair.n().clone();
        assert!(n.bits() >= 255);

        let mut samples = vec![BigUint::zero(), BigUint::one(), &n - 1u32];
        for _ in 0..50 {
            samples.push(rng.gen_biguint_below(&n));
        }
        for x in samples {
            let c = x.modpow(keypair.e(), &n);
            assert_eq!(c.modpow(keypair.d(), &n), x);
        }
        Ok(())
    }

    #[test]
    fn tiny_keys_still_distinct() -> Result<()> {
        let mut rng = rng();
        let keypair = KeyPair::generate(3, &mut rng)?;
        // the only 3-bit primes are 5 and 7
        assert_eq!(keypair.n(), &big(35));
        Ok(())
    }

    #[test]
    fn invalid_params_rejected() {
        let mut rng = rng();
        assert_eq!(
            KeyPair::generate(1, &mut rng).map(|_| ()),
            Err(Error::InvalidBitLength(1))
        );
    }

    #[test]
    fn debug_hides_private_exponent() -> Result<()> {
        let mut rng = rng();
        let keypair = KeyPair::from_primes(&big(61), &big(53), &mut rng)?;
        let printed = format!("{:?}", keypair);
        assert!(printed.contains("<redacted>"));
        assert_eq!(keypair.public_key(), PublicKey::new(big(3233), keypair.e().clone()));
        Ok(())
    }
}
