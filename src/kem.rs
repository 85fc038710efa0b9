//! ML-KEM-768 key encapsulation suite.
//!
//! Thin wrapper over the `fips203` crate's `ml_kem_768` parameter set:
//! opaque key/ciphertext newtypes, byte (de)serialization, and
//! encapsulate/decapsulate functions that never panic on malformed input.

use fips203::ml_kem_768::{CipherText, DecapsKey, EncapsKey, CT_LEN, DK_LEN, EK_LEN};
use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use rand_core::OsRng;

use crate::error::{Result, SessionError};

/// Canonical algorithm name advertised in a `CapabilitySet`.
pub const NAME: &str = "ML-KEM-768";

/// Length in bytes of a serialized encapsulation (public) key.
pub const PUBLIC_KEY_LEN: usize = EK_LEN;
/// Length in bytes of a serialized decapsulation (secret) key.
pub const SECRET_KEY_LEN: usize = DK_LEN;
/// Length in bytes of a KEM ciphertext.
pub const CIPHERTEXT_LEN: usize = CT_LEN;
/// Length in bytes of the shared secret produced by encapsulation.
pub const SHARED_SECRET_LEN: usize = 32;

/// ML-KEM-768 public (encapsulation) key.
pub type PublicKey = EncapsKey;
/// ML-KEM-768 secret (decapsulation) key. Zeroized on drop by `fips203`.
pub type SecretKey = DecapsKey;
/// ML-KEM-768 ciphertext.
pub type Ciphertext = CipherText;
/// ML-KEM-768 shared secret, as raw bytes. Zeroized by the caller once
/// folded into the key schedule.
pub type SharedSecret = [u8; SHARED_SECRET_LEN];

/// Generate a fresh ML-KEM-768 keypair using the system RNG.
pub fn generate() -> Result<(PublicKey, SecretKey)> {
    fips203::ml_kem_768::KG::try_keygen_with_rng(&mut OsRng)
        .map_err(|e| SessionError::KemFailure(e.to_string()))
}

/// Encapsulate to `public_key`, producing a fresh shared secret and the
/// ciphertext that carries it to the holder of the matching secret key.
///
/// Randomized: two calls against the same public key never agree.
pub fn encapsulate(public_key: &PublicKey) -> Result<(SharedSecret, Ciphertext)> {
    let (ssk, ct) = public_key
        .try_encaps_with_rng(&mut OsRng)
        .map_err(|e| SessionError::KemFailure(e.to_string()))?;
    Ok((ssk.into_bytes(), ct))
}

/// Decapsulate `ciphertext` with `secret_key`.
///
/// `fips203` implements the FIPS 203 implicit-rejection variant: an invalid
/// ciphertext yields a pseudorandom shared secret rather than an error, so
/// this never leaks ciphertext validity through a distinguishable error
/// path or timing signal.
pub fn decapsulate(secret_key: &SecretKey, ciphertext: &Ciphertext) -> Result<SharedSecret> {
    let ssk = secret_key
        .try_decaps(ciphertext)
        .map_err(|e| SessionError::KemFailure(e.to_string()))?;
    Ok(ssk.into_bytes())
}

/// Serialize a public key to its canonical byte encoding.
pub fn public_key_to_bytes(pk: &PublicKey) -> [u8; PUBLIC_KEY_LEN] {
    pk.clone().into_bytes()
}

/// Parse a public key from its canonical byte encoding.
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    let arr: [u8; PUBLIC_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| SessionError::KemFailure("wrong ML-KEM-768 public key length".into()))?;
    PublicKey::try_from_bytes(arr).map_err(|e| SessionError::KemFailure(e.to_string()))
}

/// Serialize a ciphertext to its canonical byte encoding.
pub fn ciphertext_to_bytes(ct: &Ciphertext) -> [u8; CIPHERTEXT_LEN] {
    ct.clone().into_bytes()
}

/// Parse a ciphertext from its canonical byte encoding.
pub fn ciphertext_from_bytes(bytes: &[u8]) -> Result<Ciphertext> {
    let arr: [u8; CIPHERTEXT_LEN] = bytes
        .try_into()
        .map_err(|_| SessionError::KemFailure("wrong ML-KEM-768 ciphertext length".into()))?;
    Ciphertext::try_from_bytes(arr).map_err(|e| SessionError::KemFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encapsulate_decapsulate_round_trip() {
        let (pk, sk) = generate().unwrap();
        let (ss_a, ct) = encapsulate(&pk).unwrap();
        let ss_b = decapsulate(&sk, &ct).unwrap();
        assert_eq!(ss_a, ss_b);
    }

    #[test]
    fn public_key_byte_round_trip() {
        let (pk, _sk) = generate().unwrap();
        let bytes = public_key_to_bytes(&pk);
        let pk2 = public_key_from_bytes(&bytes).unwrap();
        assert_eq!(public_key_to_bytes(&pk2), bytes);
    }

    #[test]
    fn mismatched_secret_key_yields_different_secret() {
        let (pk, _sk_a) = generate().unwrap();
        let (_pk_b, sk_b) = generate().unwrap();
        let (ss_sender, ct) = encapsulate(&pk).unwrap();
        // Implicit rejection: decapsulating with the wrong key still
        // succeeds but yields an unrelated secret, never an error.
        let ss_wrong = decapsulate(&sk_b, &ct).unwrap();
        assert_ne!(ss_sender, ss_wrong);
    }
}
