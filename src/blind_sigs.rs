use crate::error::{Error, Result};
use crate::keygen::{mod_inverse, KeyPair, PublicKey};
use crate::params::Params;
use crate::utils::*;
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// A voter's choice and the nonce bound to it.
///
/// The authority signs the hash of the two without ever seeing it, so when
/// the ballot is revealed later it cannot be matched to the signing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    choice: u64,
    nonce: BigUint,
}

impl Ballot {
    pub fn new(choice: u64, nonce: BigUint) -> Self {
        Self { choice, nonce }
    }

    /// A ballot whose nonce is drawn uniformly from `[1, n]`.
    pub fn with_random_nonce<R: RngCore + CryptoRng>(
        choice: u64,
        pk: &PublicKey,
        rng: &mut R,
    ) -> Self {
        let nonce = rng.gen_biguint_range(&BigUint::one(), &(pk.n() + 1u32));
        Self::new(choice, nonce)
    }

    pub fn choice(&self) -> u64 {
        self.choice
    }

    pub fn nonce(&self) -> &BigUint {
        &self.nonce
    }

    /// The decimal concatenation `choice || nonce`.
    pub fn message(&self) -> String {
        format!("{}{}", self.choice, self.nonce)
    }

    pub fn hash(&self) -> BigUint {
        hash_to_int(self.message().as_bytes())
    }
}

/// Whether a voter may obtain a signature. Decided once per session,
/// before signing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eligibility {
    Eligible,
    Ineligible,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

impl From<bool> for Eligibility {
    fn from(eligible: bool) -> Self {
        if eligible {
            Eligibility::Eligible
        } else {
            Eligibility::Ineligible
        }
    }
}

/// A message hash masked by the voter's blinding factor: `h * r^e mod n`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedMessage {
    blinded_msg: BigUint,
}

impl BlindedMessage {
    pub fn blinded_msg(&self) -> &BigUint {
        &self.blinded_msg
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.blinded_msg.to_bytes_be()
    }
}

impl From<BigUint> for BlindedMessage {
    fn from(blinded_msg: BigUint) -> Self {
        Self { blinded_msg }
    }
}

impl From<&[u8]> for BlindedMessage {
    fn from(b: &[u8]) -> Self {
        Self::from(BigUint::from_bytes_be(b))
    }
}

/// The signer's signature over a [`BlindedMessage`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignature {
    signature: BigUint,
}

impl BlindSignature {
    pub fn signature(&self) -> &BigUint {
        &self.signature
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.signature.to_bytes_be()
    }
}

impl From<BigUint> for BlindSignature {
    fn from(signature: BigUint) -> Self {
        Self { signature }
    }
}

impl From<&[u8]> for BlindSignature {
    fn from(b: &[u8]) -> Self {
        Self::from(BigUint::from_bytes_be(b))
    }
}

/// A [`BlindSignature`] with the blinding factor removed.
///
/// This is an ordinary RSA signature `h^d mod n` over the ballot hash and
/// carries no trace of the blinding factor used to obtain it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnblindedSignature {
    signature: BigUint,
}

impl UnblindedSignature {
    pub fn signature(&self) -> &BigUint {
        &self.signature
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.signature.to_bytes_be()
    }
}

impl From<BigUint> for UnblindedSignature {
    fn from(signature: BigUint) -> Self {
        Self { signature }
    }
}

impl From<&[u8]> for UnblindedSignature {
    fn from(b: &[u8]) -> Self {
        Self::from(BigUint::from_bytes_be(b))
    }
}

/// Represents the voter, who blinds a ballot hash
/// and later unblinds the authority's signature on it.
pub struct BlindVoter {
    public_key: PublicKey,
    eligibility: Eligibility,
    blinding_factor: Option<BigUint>,
}

impl BlindVoter {
    pub fn new(public_key: PublicKey, eligibility: Eligibility) -> Self {
        Self {
            public_key,
            eligibility,
            blinding_factor: None,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn eligibility(&self) -> Eligibility {
        self.eligibility
    }

    /// Blinds `message_hash` with a fresh factor `r`, coprime to `n`.
    ///
    /// `r` is kept until the matching [`unwrap_signature`](Self::unwrap_signature).
    /// Blinding again replaces it.
    pub fn blind_message<R: RngCore + CryptoRng>(
        &mut self,
        message_hash: &BigUint,
        rng: &mut R,
    ) -> Result<BlindedMessage> {
        let n = self.public_key.n();
        if message_hash >= n {
            return Err(Error::MessageOutOfRange);
        }

        let r = random_unit(n, rng);
        let blinded_msg = blind(message_hash, &r, self.public_key.e(), n);
        self.blinding_factor = Some(r);
        debug!(modulus_bits = n.bits(), "blinded message");

        Ok(BlindedMessage::from(blinded_msg))
    }

    /// Hashes the ballot and blinds the hash.
    pub fn prepare_ballot<R: RngCore + CryptoRng>(
        &mut self,
        ballot: &Ballot,
        rng: &mut R,
    ) -> Result<BlindedMessage> {
        self.blind_message(&ballot.hash(), rng)
    }

    /// Strips the blinding factor from the authority's signature.
    /// The factor is discarded afterwards.
    pub fn unwrap_signature(&mut self, sig: &BlindSignature) -> Result<UnblindedSignature> {
        let r = self
            .blinding_factor
            .take()
            .ok_or(Error::MissingBlindingFactor)?;
        let n = self.public_key.n();
        let r_inv = mod_inverse(&r, n)?;
        debug!("unblinded signature");

        Ok(UnblindedSignature::from(unblind(sig.signature(), &r_inv, n)))
    }
}

impl fmt::Debug for BlindVoter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlindVoter")
            .field("public_key", &self.public_key)
            .field("eligibility", &self.eligibility)
            .field("blinding", &self.blinding_factor.is_some())
            .finish()
    }
}

/// Represents the authority that signs a ballot
/// without seeing it.
#[derive(Debug)]
pub struct BlindSigner {
    keypair: KeyPair,
}

impl BlindSigner {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    pub fn generate<R: RngCore + CryptoRng>(params: &Params, rng: &mut R) -> Result<Self> {
        Ok(Self::new(KeyPair::generate_with_params(params, rng)?))
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Signs a blinded message for an eligible voter.
    ///
    /// An ineligible request gets `None` and no exponentiation is performed.
    pub fn sign_message(
        &self,
        msg: &BlindedMessage,
        eligibility: Eligibility,
    ) -> Option<BlindSignature> {
        if !eligibility.is_eligible() {
            info!("refused to sign for ineligible voter");
            return None;
        }

        let signature = rsa_exp(msg.blinded_msg(), self.keypair.d(), self.keypair.n());
        debug!("signed blinded message");
        Some(BlindSignature::from(signature))
    }

    /// Checks a revealed ballot against this signer's key.
    pub fn verify_ballot(&self, ballot: &Ballot, sig: &UnblindedSignature) -> Verification {
        verify_signature(ballot, sig, &self.public_key())
    }
}

impl From<KeyPair> for BlindSigner {
    fn from(keypair: KeyPair) -> Self {
        Self::new(keypair)
    }
}

/// Outcome of [`verify_signature`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    /// Whether the signature decodes to the ballot hash.
    pub valid: bool,
    /// `sig^e mod n`, reported even when it does not match.
    pub decoded: BigUint,
}

/// Recomputes the ballot hash and compares it with `sig^e mod n`.
pub fn verify_signature(
    ballot: &Ballot,
    sig: &UnblindedSignature,
    pk: &PublicKey,
) -> Verification {
    let expected = ballot.hash();
    let decoded = rsa_exp(sig.signature(), pk.e(), pk.n());

    Verification {
        valid: decoded == expected,
        decoded,
    }
}
