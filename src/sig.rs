//! ML-DSA-65 signature suite.
//!
//! Thin wrapper over the `fips204` crate's `ml_dsa_65` parameter set:
//! opaque key/signature types, byte (de)serialization, and a `verify`
//! that returns a clean `Result` rather than panicking on malformed
//! signature bytes.

use fips204::ml_dsa_65::{PrivateKey, PublicKey, Signature, PK_LEN, SIG_LEN, SK_LEN};
use fips204::traits::{KeyGen, SerDes, Signer, Verifier};
use rand_core::OsRng;

use crate::error::{Result, SessionError};

/// Canonical algorithm name advertised in a `CapabilitySet`.
pub const NAME: &str = "ML-DSA-65";

/// Length in bytes of a serialized public (verifying) key.
pub const PUBLIC_KEY_LEN: usize = PK_LEN;
/// Length in bytes of a serialized secret (signing) key.
pub const SECRET_KEY_LEN: usize = SK_LEN;
/// Length in bytes of a signature.
pub const SIGNATURE_LEN: usize = SIG_LEN;

/// Empty domain-separation context passed to `fips204`; the handshake's own
/// transcript domain separation already does this job.
const CONTEXT: &[u8] = b"";

/// ML-DSA-65 public (verifying) key.
pub type VerifyingKey = PublicKey;
/// ML-DSA-65 secret (signing) key. Zeroized on drop by `fips204`.
pub type SigningKey = PrivateKey;

/// Generate a fresh ML-DSA-65 keypair using the system RNG.
pub fn generate() -> Result<(VerifyingKey, SigningKey)> {
    fips204::ml_dsa_65::KG::try_keygen_with_rng(&mut OsRng)
        .map_err(|e| SessionError::Codec(format!("ML-DSA-65 keygen failed: {e}")))
}

/// Sign `message` (here, always a transcript digest) with `signing_key`.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Result<Vec<u8>> {
    let sig: Signature = signing_key
        .try_sign_with_rng(&mut OsRng, message, CONTEXT)
        .map_err(|e| SessionError::Codec(format!("ML-DSA-65 signing failed: {e}")))?;
    Ok(sig.into_bytes().to_vec())
}

/// Verify `signature` over `message` against `verifying_key`.
///
/// Returns `Ok(())` on a valid signature and `Err(SignatureInvalid)`
/// otherwise -- including on malformed signature bytes, which are rejected
/// cleanly rather than panicking.
pub fn verify(verifying_key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let sig_bytes: [u8; SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| SessionError::SignatureInvalid)?;
    let sig = Signature::try_from_bytes(sig_bytes).map_err(|_| SessionError::SignatureInvalid)?;
    if verifying_key.verify(message, &sig, CONTEXT) {
        Ok(())
    } else {
        Err(SessionError::SignatureInvalid)
    }
}

/// Serialize a verifying key to its canonical byte encoding.
pub fn verifying_key_to_bytes(vk: &VerifyingKey) -> [u8; PUBLIC_KEY_LEN] {
    vk.clone().into_bytes()
}

/// Parse a verifying key from its canonical byte encoding.
pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
    let arr: [u8; PUBLIC_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| SessionError::SignatureInvalid)?;
    VerifyingKey::try_from_bytes(arr).map_err(|_| SessionError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let (vk, sk) = generate().unwrap();
        let msg = b"transcript digest goes here (32 bytes, stand-in)";
        let sig = sign(&sk, msg).unwrap();
        verify(&vk, msg, &sig).unwrap();
    }

    #[test]
    fn tampered_message_fails() {
        let (vk, sk) = generate().unwrap();
        let sig = sign(&sk, b"original").unwrap();
        assert!(verify(&vk, b"tampered!", &sig).is_err());
    }

    #[test]
    fn malformed_signature_does_not_panic() {
        let (vk, _sk) = generate().unwrap();
        assert!(verify(&vk, b"anything", &[0u8; 3]).is_err());
    }
}
