use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// SHA-256 of `data`, read as a big-endian integer.
pub fn hash_to_int(data: &[u8]) -> BigUint {
    let digest = Sha256::digest(data);
    BigUint::from_bytes_be(&digest)
}

// Uniform draw from [1, n) that is coprime to n, so it always has an inverse.
pub(crate) fn random_unit<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> BigUint {
    loop {
        let r = rng.gen_biguint_range(&BigUint::one(), n);
        if r.gcd(n).is_one() {
            return r;
        }
    }
}

// y = m * r^e mod n
pub(crate) fn blind(msg: &BigUint, r: &BigUint, e: &BigUint, n: &BigUint) -> BigUint {
    (msg * r.modpow(e, n)) % n
}

// x = s * 1/r mod n
pub(crate) fn unblind(sig: &BigUint, r_inv: &BigUint, n: &BigUint) -> BigUint {
    (sig * r_inv) % n
}

// Raw RSA exponentiation. Signing uses the private exponent,
// verification the public one.
pub(crate) fn rsa_exp(value: &BigUint, exponent: &BigUint, n: &BigUint) -> BigUint {
    value.modpow(exponent, n)
}
