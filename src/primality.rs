//! Probabilistic primality testing.
//!
//! A candidate goes through three filters, each cheaper than the next:
//! trial division by the primes below 1000, a Fermat test with a few fixed
//! bases, and finally Miller-Rabin with random bases. Only the last one
//! needs randomness, which is supplied by the caller.

use crate::params::DEFAULT_MILLER_RABIN_ROUNDS;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use rand::{CryptoRng, RngCore};

/// The 168 primes below 1000.
pub const SMALL_PRIMES: [u32; 168] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43,
    47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97, 101, 103, 107,
    109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181,
    191, 193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263,
    269, 271, 277, 281, 283, 293, 307, 311, 313, 317, 331, 337, 347, 349,
    353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419, 421, 431, 433,
    439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521,
    523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599, 601, 607, 613,
    617, 619, 631, 641, 643, 647, 653, 659, 661, 673, 677, 683, 691, 701,
    709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797, 809,
    811, 821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887,
    907, 911, 919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997,
];

const FERMAT_BASES: [u32; 5] = [2, 3, 5, 7, 11];

/// Returns true if `n` is prime with overwhelming probability, using the
/// default number of Miller-Rabin rounds.
pub fn is_probably_prime<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> bool {
    is_probably_prime_with_rounds(n, DEFAULT_MILLER_RABIN_ROUNDS, rng)
}

/// As [`is_probably_prime`], with an explicit Miller-Rabin round count.
/// A composite survives with probability at most `4^-rounds`.
pub fn is_probably_prime_with_rounds<R: RngCore + CryptoRng>(
    n: &BigUint,
    rounds: usize,
    rng: &mut R,
) -> bool {
    match trial_division(n) {
        Some(verdict) => verdict,
        None => fermat(n) && miller_rabin(n, rounds, rng),
    }
}

// Settles every n <= 997 and every n with a factor below 1000.
// None means the candidate needs the probabilistic tests.
fn trial_division(n: &BigUint) -> Option<bool> {
    if let Some(small) = n.to_u32() {
        if small < 2 {
            return Some(false);
        }
        if SMALL_PRIMES.binary_search(&small).is_ok() {
            return Some(true);
        }
    }
    for &p in SMALL_PRIMES.iter() {
        if (n % p).is_zero() {
            return Some(false);
        }
    }
    None
}

// b^(n-1) = 1 mod n must hold for every prime n coprime to b.
fn fermat(n: &BigUint) -> bool {
    let n_minus_one = n - 1u32;
    FERMAT_BASES
        .iter()
        .all(|&b| BigUint::from(b).modpow(&n_minus_one, n).is_one())
}

/// Miller-Rabin with `rounds` random bases drawn from `[2, n-1]`.
///
/// Total over all inputs: `n < 2` and even `n > 2` are composite, 2 and 3
/// are prime. A base sharing a factor with `n` is an immediate witness.
pub fn miller_rabin<R: RngCore + CryptoRng>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    if *n == two || *n == BigUint::from(3u32) {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // n - 1 = 2^s * d with d odd
    let n_minus_one = n - 1u32;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'rounds: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, n);
        if !a.gcd(n).is_one() {
            return false;
        }

        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'rounds;
            }
        }
        return false;
    }
    true
}
