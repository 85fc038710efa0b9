//! Key scheduler: from a KEM shared secret plus a transcript digest, derive
//! the session id, the per-direction AEAD keys, the exporter secret, and
//! key-confirmation tags.

use chrono::{DateTime, Utc};
use hkdf::Hkdf;
use sha3::Sha3_512;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::KeyScheduleConfig;
use crate::error::{Result, SessionError};

const INFO_LABEL: &[u8] = b"qsafe-handshake";
const SESSION_ID_LABEL: &[u8] = b"qsafe-session-id";

/// Derived session key material. Secret fields are zeroized on drop;
/// `session_id` and `transcript_digest` are public and need no
/// zeroization.
pub struct SchedulerKeys {
    /// Public session identifier, identical on both sides of a successful
    /// handshake.
    pub session_id: [u8; 32],
    /// Key used by the initiator to send / the responder to receive.
    pub c2s_key: Zeroizing<[u8; 32]>,
    /// Key used by the responder to send / the initiator to receive.
    pub s2c_key: Zeroizing<[u8; 32]>,
    /// Exporter secret, available to higher layers that need keying
    /// material derived from this handshake but outside the record layer.
    pub exporter_secret: Zeroizing<[u8; 32]>,
    /// Transcript digest this key material is bound to.
    pub transcript_digest: [u8; 32],
    /// UTC timestamp this key material was established.
    pub established_at: DateTime<Utc>,
    /// UTC timestamp at or after which the transport should initiate a
    /// fresh handshake.
    pub next_rotation: DateTime<Utc>,
}

/// Derive `SchedulerKeys` from a KEM shared secret and a transcript digest.
///
/// Runs HKDF-Extract-then-Expand with SHA3-512 over `info = "qsafe-handshake"
/// || 0x00 || mode || 0x00 || transcript_digest`, then
/// reads `c2s_key`, `s2c_key`, `exporter_secret` in that order from a single
/// expand call.
pub fn derive(
    shared_secret: &[u8],
    transcript_digest: &[u8; 32],
    config: &KeyScheduleConfig,
) -> Result<SchedulerKeys> {
    if shared_secret.is_empty() {
        return Err(SessionError::KemFailure(
            "empty shared secret passed to key scheduler".into(),
        ));
    }

    let mut info = Vec::with_capacity(
        INFO_LABEL.len() + 1 + config.mode.len() + 1 + transcript_digest.len(),
    );
    info.extend_from_slice(INFO_LABEL);
    info.push(0x00);
    info.extend_from_slice(config.mode.as_bytes());
    info.push(0x00);
    info.extend_from_slice(transcript_digest);

    let salt = if config.salt.is_empty() {
        None
    } else {
        Some(config.salt.as_slice())
    };
    let hk = Hkdf::<Sha3_512>::new(salt, shared_secret);

    let mut okm = Zeroizing::new([0u8; 96]);
    hk.expand(&info, okm.as_mut())
        .map_err(|e| SessionError::KemFailure(format!("HKDF expand failed: {e}")))?;

    let mut c2s_key = Zeroizing::new([0u8; 32]);
    let mut s2c_key = Zeroizing::new([0u8; 32]);
    let mut exporter_secret = Zeroizing::new([0u8; 32]);
    c2s_key.copy_from_slice(&okm[0..32]);
    s2c_key.copy_from_slice(&okm[32..64]);
    exporter_secret.copy_from_slice(&okm[64..96]);

    let mut hasher = blake3::Hasher::new();
    hasher.update(SESSION_ID_LABEL);
    hasher.update(shared_secret);
    hasher.update(transcript_digest);
    let session_id = *hasher.finalize().as_bytes();

    let established_at = Utc::now();
    let next_rotation = established_at + config.rotation_interval;

    Ok(SchedulerKeys {
        session_id,
        c2s_key,
        s2c_key,
        exporter_secret,
        transcript_digest: *transcript_digest,
        established_at,
        next_rotation,
    })
}

/// Keyed, domain-separated confirmation tag: `BLAKE3(key || transcript_digest)`.
pub fn confirm(key: &[u8], transcript_digest: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key);
    hasher.update(transcript_digest);
    *hasher.finalize().as_bytes()
}

/// Constant-time comparison of two 32-byte digests/tags.
pub fn ct_eq32(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_given_same_inputs() {
        let ss = [7u8; 32];
        let digest = [9u8; 32];
        let cfg = KeyScheduleConfig::default();
        let a = derive(&ss, &digest, &cfg).unwrap();
        let b = derive(&ss, &digest, &cfg).unwrap();
        assert_eq!(a.session_id, b.session_id);
        assert_eq!(*a.c2s_key, *b.c2s_key);
        assert_eq!(*a.s2c_key, *b.s2c_key);
        assert_eq!(*a.exporter_secret, *b.exporter_secret);
    }

    #[test]
    fn different_transcript_different_keys() {
        let ss = [7u8; 32];
        let cfg = KeyScheduleConfig::default();
        let a = derive(&ss, &[1u8; 32], &cfg).unwrap();
        let b = derive(&ss, &[2u8; 32], &cfg).unwrap();
        assert_ne!(a.session_id, b.session_id);
        assert_ne!(*a.c2s_key, *b.c2s_key);
    }

    #[test]
    fn rejects_empty_shared_secret() {
        let cfg = KeyScheduleConfig::default();
        assert!(derive(&[], &[0u8; 32], &cfg).is_err());
    }

    #[test]
    fn confirm_is_deterministic_and_binds_digest() {
        let key = [1u8; 32];
        let d1 = [2u8; 32];
        let d2 = [3u8; 32];
        assert_eq!(confirm(&key, &d1), confirm(&key, &d1));
        assert_ne!(confirm(&key, &d1), confirm(&key, &d2));
    }
}
