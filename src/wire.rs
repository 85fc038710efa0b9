//! On-the-wire handshake and record messages.
//!
//! Encoded as JSON for transmission (`serde_json`); field order inside each
//! struct is fixed by declaration order, which is what both endpoints rely
//! on when folding a message into the transcript in canonical form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;
use crate::error::{Result, SessionError};

/// First handshake message, sent initiator -> responder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientInit {
    /// Protocol version.
    pub version: u32,
    /// Negotiation mode, e.g. `"strict"` or `"hybrid"`.
    pub mode: String,
    /// UTC timestamp, informational only (folded into the transcript for
    /// per-handshake freshness binding, not used for freshness checks by
    /// the core).
    pub timestamp: DateTime<Utc>,
    /// 32-byte client nonce.
    pub nonce: [u8; 32],
    /// KEM ciphertext (opaque, KEM-defined length). Not hashed verbatim
    /// into the transcript -- see [`ClientInit::transcript_form`].
    pub ciphertext: Vec<u8>,
    /// Advertised capabilities.
    pub capabilities: CapabilitySet,
}

/// Canonical form of a `ClientInit` for transcript hashing: the raw
/// ciphertext is replaced with a commitment, `BLAKE3(ciphertext)`.
#[derive(Clone, Debug, Serialize)]
pub struct ClientInitTranscriptForm {
    version: u32,
    mode: String,
    timestamp: DateTime<Utc>,
    nonce: [u8; 32],
    capabilities: CapabilitySet,
    ciphertext_hash: [u8; 32],
}

impl ClientInit {
    /// Canonical, length-unambiguous byte form to fold into the transcript
    /// under the `"client_init"` label: the ciphertext is replaced by its
    /// BLAKE3 commitment, never carried into the hash verbatim.
    pub fn transcript_form(&self) -> Result<Vec<u8>> {
        let form = ClientInitTranscriptForm {
            version: self.version,
            mode: self.mode.clone(),
            timestamp: self.timestamp,
            nonce: self.nonce,
            capabilities: self.capabilities.clone(),
            ciphertext_hash: *blake3::hash(&self.ciphertext).as_bytes(),
        };
        serde_json::to_vec(&form).map_err(|e| SessionError::Codec(e.to_string()))
    }
}

/// Signed portion of the responder's reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPayload {
    /// Protocol version.
    pub version: u32,
    /// Negotiation mode.
    pub mode: String,
    /// UTC timestamp, informational only.
    pub timestamp: DateTime<Utc>,
    /// 32-byte server nonce.
    pub nonce: [u8; 32],
    /// Rotation interval in seconds, as negotiated by the responder.
    pub rotation_secs: u32,
    /// Advertised capabilities.
    pub capabilities: CapabilitySet,
}

impl ServerPayload {
    /// Canonical byte form to fold into the transcript under the
    /// `"server_payload"` label.
    pub fn transcript_form(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SessionError::Codec(e.to_string()))
    }
}

/// The responder's reply to a `ClientInit`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerResponse {
    /// The signed payload.
    pub payload: ServerPayload,
    /// Transcript digest at the point the responder signed.
    pub transcript_hash: [u8; 32],
    /// Signature over `transcript_hash` under the responder's identity key.
    pub signature: Vec<u8>,
    /// Key-confirmation tag, `confirm(s2c_key, transcript_hash)`.
    pub confirmation: [u8; 32],
}

/// A sealed record-layer frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// AEAD ciphertext (includes the authentication tag).
    pub ciphertext: Vec<u8>,
    /// 24-byte XChaCha20-Poly1305 nonce, deterministically derived from
    /// `(session_id, sequence, sender_role)`.
    pub nonce: [u8; 24],
    /// Strictly positive, monotonically assigned sequence number. `0` is
    /// reserved and always invalid.
    pub sequence: u64,
    /// Epoch this frame was produced under.
    pub epoch: u64,
    /// Ordered metadata carried alongside the frame and folded into the
    /// AEAD associated data.
    pub metadata: BTreeMap<String, String>,
}
