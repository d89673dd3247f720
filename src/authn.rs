use crate::blind_sigs::Eligibility;
use crate::error::{Error, Result};
use crate::keygen::{KeyPair, PublicKey};
use crate::params::Params;
use crate::utils::{hash_to_int, rsa_exp};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A plain RSA signature over the hash of a voter's id number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityToken {
    signature: BigUint,
}

impl IdentityToken {
    pub fn signature(&self) -> &BigUint {
        &self.signature
    }
}

impl From<BigUint> for IdentityToken {
    fn from(signature: BigUint) -> Self {
        Self { signature }
    }
}

/// Checks voter ids and vouches for them, deciding the [`Eligibility`]
/// a voter later presents to the blind signer.
///
/// Uses its own keypair, separate from the ballot signing key.
#[derive(Debug)]
pub struct Authenticator {
    keypair: KeyPair,
}

impl Authenticator {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    pub fn generate<R: RngCore + CryptoRng>(params: &Params, rng: &mut R) -> Result<Self> {
        Ok(Self::new(KeyPair::generate_with_params(params, rng)?))
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Signs `hash(voter_id)` with the private exponent.
    pub fn authenticate(&self, voter_id: u64) -> Result<IdentityToken> {
        let id_hash = identity_hash(voter_id);
        if &id_hash >= self.keypair.n() {
            return Err(Error::MessageOutOfRange);
        }
        let signature = rsa_exp(&id_hash, self.keypair.d(), self.keypair.n());
        Ok(IdentityToken::from(signature))
    }

    pub fn verify(&self, voter_id: u64, token: &IdentityToken) -> Eligibility {
        verify_identity(&self.public_key(), voter_id, token)
    }
}

/// SHA-256 of the decimal id.
pub fn identity_hash(voter_id: u64) -> BigUint {
    hash_to_int(voter_id.to_string().as_bytes())
}

/// A voter is eligible iff the token decodes to the hash of their id.
pub fn verify_identity(pk: &PublicKey, voter_id: u64, token: &IdentityToken) -> Eligibility {
    let decoded = rsa_exp(token.signature(), pk.e(), pk.n());
    let eligibility = Eligibility::from(decoded == identity_hash(voter_id));
    info!(?eligibility, "checked voter identity");
    eligibility
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blind_sigs::{verify_signature, Ballot, BlindSigner, BlindVoter};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn params() -> Params {
        Params {
            key_bits: 160,
            ..Params::default()
        }
    }

    #[test]
    fn authenticated_voter_is_eligible() -> Result<()> {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let authenticator = Authenticator::generate(&params(), &mut rng)?;

        let token = authenticator.authenticate(4242)?;
        assert_eq!(authenticator.verify(4242, &token), Eligibility::Eligible);
        assert_eq!(
            verify_identity(&authenticator.public_key(), 4242, &token),
            Eligibility::Eligible
        );

        Ok(())
    }

    #[test]
    fn token_is_bound_to_id() -> Result<()> {
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let authenticator = Authenticator::generate(&params(), &mut rng)?;

        let token = authenticator.authenticate(4242)?;
        assert_eq!(authenticator.verify(4243, &token), Eligibility::Ineligible);

        let forged = IdentityToken::from(identity_hash(4242));
        assert_eq!(authenticator.verify(4242, &forged), Eligibility::Ineligible);

        Ok(())
    }

    #[test]
    fn small_modulus_rejected() -> Result<()> {
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let authenticator = Authenticator::new(KeyPair::generate(32, &mut rng)?);
        assert_eq!(
            authenticator.authenticate(1),
            Err(Error::MessageOutOfRange)
        );
        Ok(())
    }

    #[test]
    fn authenticated_vote_end_to_end() -> Result<()> {
        let mut rng = ChaCha20Rng::seed_from_u64(14);
        let authenticator = Authenticator::generate(&params(), &mut rng)?;
        let official = BlindSigner::generate(&params(), &mut rng)?;
        let pk = official.public_key();

        // voter proves identity, then votes
        let token = authenticator.authenticate(1001)?;
        let eligibility = authenticator.verify(1001, &token);

        let ballot = Ballot::with_random_nonce(3, &pk, &mut rng);
        let mut voter = BlindVoter::new(pk.clone(), eligibility);
        let blinded = voter.prepare_ballot(&ballot, &mut rng)?;
        let blind_sig = official
            .sign_message(&blinded, voter.eligibility())
            .expect("authenticated voter is eligible");
        let sig = voter.unwrap_signature(&blind_sig)?;

        assert!(verify_signature(&ballot, &sig, &pk).valid);

        // an impostor presenting someone else's token gets no signature
        let eligibility = authenticator.verify(1002, &token);
        let mut impostor = BlindVoter::new(pk, eligibility);
        let blinded = impostor.prepare_ballot(&ballot, &mut rng)?;
        assert!(official
            .sign_message(&blinded, impostor.eligibility())
            .is_none());

        Ok(())
    }
}
