//! Per-session AEAD record layer: seal/open over a derived, monotonically
//! sequenced nonce, with replay protection and rotation hints.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;
use tracing::warn;
use zeroize::Zeroizing;

use crate::config::{PolicyConfig, RotationConfig};
use crate::error::{Result, SessionError};
use crate::policy::{NegotiatedParams, PolicyEnforcer};
use crate::replay::ReplayWindow;
use crate::rotation::RotationManager;
use crate::wire::Envelope;

/// Canonical name of the only AEAD suite this build implements.
pub const XCHACHA20POLY1305: &str = "xchacha20poly1305";

/// Which side of the handshake this session was built from. Determines
/// the send/receive key assignment and the role byte folded into nonce
/// derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The handshake initiator.
    Initiator,
    /// The handshake responder.
    Responder,
}

impl Role {
    fn byte(self) -> u8 {
        match self {
            Role::Initiator => 0,
            Role::Responder => 1,
        }
    }

    fn peer(self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

/// Build the AAD bytes for a metadata map: `"meta:v1;"` followed by sorted
/// `k=v;` pairs. Exposed standalone so a transport can precompute AAD
/// without a live `RecordSession`.
pub fn aad_bytes(metadata: &BTreeMap<String, String>) -> Vec<u8> {
    let mut out = Vec::from(b"meta:v1;".as_slice());
    for (k, v) in metadata {
        out.extend_from_slice(k.as_bytes());
        out.push(b'=');
        out.extend_from_slice(v.as_bytes());
        out.push(b';');
    }
    out
}

/// Derive the 24-byte nonce for `(session_id, seq, role)`.
pub fn derive_nonce(session_id: &[u8; 32], seq: u64, role: Role) -> [u8; 24] {
    let mut keyed = blake3::Hasher::new_keyed(session_id);
    keyed.update(&seq.to_be_bytes());
    keyed.update(&[role.byte()]);
    let digest = keyed.finalize();
    let mut nonce = [0u8; 24];
    nonce.copy_from_slice(&digest.as_bytes()[..24]);
    nonce
}

struct SendState {
    sequence: u64,
}

/// A bidirectional, sequenced AEAD session derived from a completed
/// handshake.
///
/// Send state is guarded by its own mutex; the receive path is guarded
/// only by the replay window's internal mutex, so concurrent senders and
/// receivers never contend with each other (matching the independence of
/// the two directions).
pub struct RecordSession {
    role: Role,
    session_id: [u8; 32],
    send_key: Zeroizing<[u8; 32]>,
    recv_key: Zeroizing<[u8; 32]>,
    send: Mutex<SendState>,
    rotation: RotationManager,
    replay: ReplayWindow,
    epoch: AtomicU64,
}

impl RecordSession {
    /// Build a session from a completed handshake's keys.
    ///
    /// `aead_name` and the rotation interval carried in `rotation_config`
    /// are checked against `policy` exactly once, here.
    pub fn new(
        role: Role,
        session_id: [u8; 32],
        c2s_key: Zeroizing<[u8; 32]>,
        s2c_key: Zeroizing<[u8; 32]>,
        mode: &str,
        aead_name: &str,
        rotation_config: RotationConfig,
        replay_depth: u64,
        policy: &PolicyEnforcer,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        policy.validate(&NegotiatedParams {
            mode,
            aead: aead_name,
            rotation_interval: rotation_config.interval,
        })?;

        if aead_name != XCHACHA20POLY1305 {
            return Err(SessionError::UnsupportedAead(aead_name.to_string()));
        }

        let (send_key, recv_key) = match role {
            Role::Initiator => (c2s_key, s2c_key),
            Role::Responder => (s2c_key, c2s_key),
        };

        Ok(Self {
            role,
            session_id,
            send_key,
            recv_key,
            send: Mutex::new(SendState { sequence: 0 }),
            rotation: RotationManager::new(rotation_config, now, 0),
            replay: ReplayWindow::new(replay_depth),
            epoch: AtomicU64::new(0),
        })
    }

    /// Seal `plaintext` under `metadata`, returning the wire envelope and a
    /// hint telling the caller whether a fresh handshake is now due.
    pub fn encrypt(&self, plaintext: &[u8], metadata: BTreeMap<String, String>) -> Result<(Envelope, bool)> {
        let seq = {
            let mut state = self.send.lock().expect("send mutex poisoned");
            state.sequence += 1;
            state.sequence
        };

        let nonce = derive_nonce(&self.session_id, seq, self.role);
        let now = Utc::now();
        let rotate = self.rotation.record(now);
        let epoch = self.rotation.current_epoch();
        self.epoch.store(epoch, Ordering::SeqCst);

        let aad = aad_bytes(&metadata);
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&*self.send_key));
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| SessionError::AeadFailure)?;

        Ok((
            Envelope {
                ciphertext,
                nonce,
                sequence: seq,
                epoch,
                metadata,
            },
            rotate,
        ))
    }

    /// Open `env`, returning the plaintext and a rotation hint.
    ///
    /// `ReplayDuplicate`/`ReplayStale`/`NonceMismatch`/`AeadFailure` are
    /// frame-local: the session remains usable for subsequent frames after
    /// any of these.
    pub fn decrypt(&self, env: &Envelope) -> Result<(Vec<u8>, bool)> {
        if env.sequence == 0 {
            return Err(SessionError::SeqInvalid);
        }

        self.replay.accept(env.sequence)?;

        let expected_nonce = derive_nonce(&self.session_id, env.sequence, self.role.peer());
        let has_nonce = env.nonce != [0u8; 24];
        if has_nonce && !bool::from(expected_nonce.ct_eq(&env.nonce)) {
            warn!(session_id = ?self.session_id, sequence = env.sequence, "record nonce mismatch");
            return Err(SessionError::NonceMismatch);
        }

        let aad = aad_bytes(&env.metadata);
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&*self.recv_key));
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(&expected_nonce),
                Payload {
                    msg: &env.ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| {
                warn!(session_id = ?self.session_id, sequence = env.sequence, "record AEAD open failed");
                SessionError::AeadFailure
            })?;

        let rotate = self.rotation.should_rotate(Utc::now());
        Ok((plaintext, rotate))
    }

    /// The session identifier negotiated during the handshake.
    pub fn session_id(&self) -> [u8; 32] {
        self.session_id
    }

    /// Current epoch, as observed from the send side.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> PolicyEnforcer {
        PolicyEnforcer::new(PolicyConfig::default())
    }

    fn pair(rotation: RotationConfig, replay_depth: u64) -> (RecordSession, RecordSession) {
        let session_id = [42u8; 32];
        let c2s = Zeroizing::new([1u8; 32]);
        let s2c = Zeroizing::new([2u8; 32]);
        let now = Utc::now();

        let initiator = RecordSession::new(
            Role::Initiator,
            session_id,
            c2s.clone(),
            s2c.clone(),
            "strict",
            XCHACHA20POLY1305,
            rotation,
            replay_depth,
            &policy(),
            now,
        )
        .unwrap();

        let responder = RecordSession::new(
            Role::Responder,
            session_id,
            c2s,
            s2c,
            "strict",
            XCHACHA20POLY1305,
            rotation,
            replay_depth,
            &policy(),
            now,
        )
        .unwrap();

        (initiator, responder)
    }

    fn default_rotation() -> RotationConfig {
        RotationConfig {
            interval: Duration::hours(1),
            max_packets: 0,
            skew: Duration::seconds(5),
        }
    }

    #[test]
    fn round_trips_plaintext() {
        let (initiator, responder) = pair(default_rotation(), 2048);
        let (env, _rotate) = initiator.encrypt(b"hello quantum", BTreeMap::new()).unwrap();
        let (plaintext, _rotate) = responder.decrypt(&env).unwrap();
        assert_eq!(plaintext, b"hello quantum");
    }

    #[test]
    fn rejects_replayed_envelope() {
        let (initiator, responder) = pair(default_rotation(), 2048);
        let (env, _) = initiator.encrypt(b"once", BTreeMap::new()).unwrap();
        responder.decrypt(&env).unwrap();
        let err = responder.decrypt(&env).unwrap_err();
        assert!(matches!(err, SessionError::ReplayDuplicate(1)));
    }

    #[test]
    fn rejects_stale_sequence() {
        let (initiator, responder) = pair(default_rotation(), 4);
        for _ in 0..5 {
            let (env, _) = initiator.encrypt(b"msg", BTreeMap::new()).unwrap();
            responder.decrypt(&env).unwrap();
        }
        let stale = Envelope {
            ciphertext: vec![0u8; 16],
            nonce: [0u8; 24],
            sequence: 1,
            epoch: 0,
            metadata: BTreeMap::new(),
        };
        let err = responder.decrypt(&stale).unwrap_err();
        assert!(matches!(err, SessionError::ReplayStale(1)));
    }

    #[test]
    fn bit_flip_in_ciphertext_fails_open() {
        let (initiator, responder) = pair(default_rotation(), 2048);
        let (mut env, _) = initiator.encrypt(b"hello", BTreeMap::new()).unwrap();
        env.ciphertext[0] ^= 0xFF;
        let err = responder.decrypt(&env).unwrap_err();
        assert!(matches!(err, SessionError::AeadFailure));
    }

    #[test]
    fn bit_flip_in_metadata_fails_open() {
        let (initiator, responder) = pair(default_rotation(), 2048);
        let mut metadata = BTreeMap::new();
        metadata.insert("k".to_string(), "v".to_string());
        let (mut env, _) = initiator.encrypt(b"hello", metadata).unwrap();
        env.metadata.insert("k".to_string(), "tampered".to_string());
        let err = responder.decrypt(&env).unwrap_err();
        assert!(matches!(err, SessionError::AeadFailure));
    }

    #[test]
    fn zero_sequence_is_rejected() {
        let (_initiator, responder) = pair(default_rotation(), 2048);
        let env = Envelope {
            ciphertext: vec![0u8; 16],
            nonce: [0u8; 24],
            sequence: 0,
            epoch: 0,
            metadata: BTreeMap::new(),
        };
        let err = responder.decrypt(&env).unwrap_err();
        assert!(matches!(err, SessionError::SeqInvalid));
    }

    #[test]
    fn sequences_are_contiguous_from_one() {
        let (initiator, _responder) = pair(default_rotation(), 2048);
        let (env1, _) = initiator.encrypt(b"a", BTreeMap::new()).unwrap();
        let (env2, _) = initiator.encrypt(b"b", BTreeMap::new()).unwrap();
        assert_eq!(env1.sequence, 1);
        assert_eq!(env2.sequence, 2);
    }

    #[test]
    fn packet_count_rotation_hint_fires_on_third_send() {
        let rotation = RotationConfig {
            interval: Duration::hours(1),
            max_packets: 3,
            skew: Duration::seconds(0),
        };
        let (initiator, _responder) = pair(rotation, 2048);
        let (_e1, r1) = initiator.encrypt(b"a", BTreeMap::new()).unwrap();
        let (_e2, r2) = initiator.encrypt(b"b", BTreeMap::new()).unwrap();
        let (_e3, r3) = initiator.encrypt(b"c", BTreeMap::new()).unwrap();
        assert!(!r1);
        assert!(!r2);
        assert!(r3);
    }
}
