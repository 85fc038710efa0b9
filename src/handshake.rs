//! Handshake state machine: initiator and responder sides of the
//! authenticated hybrid key exchange.
//!
//! The initiator's side is typed as a small state machine (`Idle` ->
//! `Initiated` -> terminal) so that calling `finish` twice, or finishing
//! before `initiate`, is a compile error rather than a runtime check.

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use tracing::warn;
use zeroize::Zeroizing;

use crate::capability::CapabilitySet;
use crate::config::KeyScheduleConfig;
use crate::error::{Result, SessionError};
use crate::kem;
use crate::schedule::{self, SchedulerKeys};
use crate::sig;
use crate::transcript::Transcript;
use crate::wire::{ClientInit, ServerPayload, ServerResponse};

const HANDSHAKE_DOMAIN: &str = "qsafe-handshake";

/// Configuration the initiator and responder agree to check against each
/// other: protocol version, negotiation mode, and the key scheduler's
/// knobs.
#[derive(Clone, Debug)]
pub struct HandshakeConfig {
    /// Protocol version this endpoint speaks.
    pub version: u32,
    /// Negotiation mode this endpoint expects the peer to match, e.g.
    /// `"strict"` or `"hybrid"`.
    pub mode: String,
    /// This endpoint's advertised capabilities.
    pub capabilities: CapabilitySet,
    /// Rotation interval, in seconds, the responder advertises in its
    /// `ServerPayload`.
    pub rotation_secs: u32,
    /// Key scheduler configuration (salt, mode, rotation interval).
    pub key_schedule: KeyScheduleConfig,
}

/// Initiator state before `initiate()` has been called.
pub struct Idle {
    config: HandshakeConfig,
}

/// Initiator state after `initiate()`, holding everything `finish()` needs
/// and nothing else. Dropping an `Initiated` without calling `finish`
/// zeroizes the shared secret along with the rest of the struct.
pub struct Initiated {
    config: HandshakeConfig,
    transcript: Transcript,
    shared_secret: Zeroizing<[u8; kem::SHARED_SECRET_LEN]>,
}

impl Idle {
    /// Start an initiator handshake under the given configuration.
    pub fn new(config: HandshakeConfig) -> Self {
        Self { config }
    }

    /// Encapsulate to the responder's KEM public key and produce the first
    /// wire message.
    ///
    /// Consumes `self` and returns the `Initiated` state plus the
    /// `ClientInit` to send. The raw ciphertext goes out on the wire; only
    /// its BLAKE3 commitment is folded into the transcript.
    pub fn initiate(self, responder_kem_pub: &kem::PublicKey) -> Result<(Initiated, ClientInit)> {
        let transcript = Transcript::new(HANDSHAKE_DOMAIN);

        let mut nonce = [0u8; 32];
        OsRng.fill_bytes(&mut nonce);

        let (shared_secret, ciphertext) = kem::encapsulate(responder_kem_pub)?;

        let client_init = ClientInit {
            version: self.config.version,
            mode: self.config.mode.clone(),
            timestamp: Utc::now(),
            nonce,
            ciphertext: kem::ciphertext_to_bytes(&ciphertext).to_vec(),
            capabilities: self.config.capabilities.clone(),
        };

        let form = client_init.transcript_form()?;
        transcript.append(b"client_init", &form);

        Ok((
            Initiated {
                config: self.config,
                transcript,
                shared_secret: Zeroizing::new(shared_secret),
            },
            client_init,
        ))
    }
}

impl Initiated {
    /// Verify `resp` against the responder's signing identity, derive
    /// matching keys, and consume this state.
    ///
    /// `responder_verifying_key` is the responder's ML-DSA-65 public key;
    /// sourcing and trusting that key (static config, directory lookup,
    /// attested identity) is a caller concern -- this crate accepts opaque
    /// signature-backed identity keys and does not validate how the caller
    /// obtained them. On any failure the shared secret and transcript are
    /// dropped (and zeroized) along with `self`; the caller has nothing
    /// left to clean up.
    pub fn finish(
        self,
        resp: &ServerResponse,
        responder_verifying_key: &sig::VerifyingKey,
    ) -> Result<SchedulerKeys> {
        if resp.payload.mode != self.config.mode {
            warn!(expected = %self.config.mode, got = %resp.payload.mode, "handshake mode mismatch");
            return Err(SessionError::ModeMismatch {
                expected: self.config.mode.clone(),
                got: resp.payload.mode.clone(),
            });
        }

        let form = resp.payload.transcript_form()?;
        self.transcript.append(b"server_payload", &form);
        let local_digest = self.transcript.snapshot();

        if !schedule::ct_eq32(&local_digest, &resp.transcript_hash) {
            warn!("handshake transcript digest mismatch");
            return Err(SessionError::TranscriptMismatch);
        }

        sig::verify(responder_verifying_key, &local_digest, &resp.signature).map_err(|_| {
            warn!("handshake signature verification failed");
            SessionError::SignatureInvalid
        })?;

        let keys = schedule::derive(&*self.shared_secret, &local_digest, &self.config.key_schedule)?;

        let expected_tag = schedule::confirm(&*keys.s2c_key, &local_digest);
        if !schedule::ct_eq32(&expected_tag, &resp.confirmation) {
            warn!("handshake key confirmation mismatch");
            return Err(SessionError::ConfirmationMismatch);
        }

        Ok(keys)
    }
}

/// Responder side: single-shot `accept`.
pub struct Responder {
    config: HandshakeConfig,
}

impl Responder {
    /// Build a responder under the given configuration.
    pub fn new(config: HandshakeConfig) -> Self {
        Self { config }
    }

    /// Consume a `ClientInit`, producing a `ServerResponse` and the
    /// matching `SchedulerKeys`.
    ///
    /// `kem_secret` is this endpoint's KEM decapsulation key; `sig_secret`
    /// is the signing key used to bind the transcript digest.
    pub fn accept(
        &self,
        init: &ClientInit,
        kem_secret: &kem::SecretKey,
        sig_secret: &sig::SigningKey,
    ) -> Result<(ServerResponse, SchedulerKeys)> {
        let transcript = Transcript::new(HANDSHAKE_DOMAIN);

        let form = init.transcript_form()?;
        transcript.append(b"client_init", &form);

        if init.mode != self.config.mode {
            warn!(expected = %self.config.mode, got = %init.mode, "handshake mode mismatch");
            return Err(SessionError::ModeMismatch {
                expected: self.config.mode.clone(),
                got: init.mode.clone(),
            });
        }

        let ciphertext = kem::ciphertext_from_bytes(&init.ciphertext)?;
        let shared_secret = Zeroizing::new(kem::decapsulate(kem_secret, &ciphertext)?);

        let mut nonce = [0u8; 32];
        OsRng.fill_bytes(&mut nonce);

        let payload = ServerPayload {
            version: self.config.version,
            mode: self.config.mode.clone(),
            timestamp: Utc::now(),
            nonce,
            rotation_secs: self.config.rotation_secs,
            capabilities: self.config.capabilities.clone(),
        };

        let payload_form = payload.transcript_form()?;
        transcript.append(b"server_payload", &payload_form);
        let digest = transcript.snapshot();

        let keys = schedule::derive(&*shared_secret, &digest, &self.config.key_schedule)?;
        let signature = sig::sign(sig_secret, &digest)?;
        let confirmation = schedule::confirm(&*keys.s2c_key, &digest);

        Ok((
            ServerResponse {
                payload,
                transcript_hash: digest,
                signature,
                confirmation,
            },
            keys,
        ))
    }
}
