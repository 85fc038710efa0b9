//! Error taxonomy for the post-quantum session core.
//!
//! Handshake errors are fatal to the session; frame-level errors are fatal
//! only to the offending frame.

use thiserror::Error;

/// Errors raised by the handshake state machine, the key scheduler, the
/// record session, or policy enforcement.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Peer advertised a different negotiation mode than we expected.
    #[error("mode mismatch: expected {expected:?}, got {got:?}")]
    ModeMismatch {
        /// Mode this endpoint was configured with.
        expected: String,
        /// Mode the peer actually sent.
        got: String,
    },

    /// Locally recomputed transcript digest does not match the peer's.
    #[error("transcript digest mismatch")]
    TranscriptMismatch,

    /// Signature over the transcript digest failed verification.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Key-confirmation tag did not match the expected value.
    #[error("key confirmation mismatch")]
    ConfirmationMismatch,

    /// KEM encapsulation or decapsulation failed.
    #[error("KEM operation failed: {0}")]
    KemFailure(String),

    /// Session or handshake construction violated the configured policy.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// An `Envelope` carried sequence number `0`, which is reserved.
    #[error("sequence number 0 is invalid")]
    SeqInvalid,

    /// A sequence number was observed a second time within the replay window.
    #[error("duplicate sequence number {0}")]
    ReplayDuplicate(u64),

    /// A sequence number fell behind the replay window's trailing edge.
    #[error("stale sequence number {0}")]
    ReplayStale(u64),

    /// The envelope's carried nonce does not match the derived nonce.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// AEAD seal or open failed (authentication failure on open).
    #[error("AEAD operation failed")]
    AeadFailure,

    /// Negotiated AEAD algorithm is not one this build supports.
    #[error("unsupported AEAD suite: {0}")]
    UnsupportedAead(String),

    /// Transcript or wire-message (de)serialization failed.
    #[error("(de)serialization error: {0}")]
    Codec(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SessionError>;
