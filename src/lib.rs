//! Post-quantum session core: an authenticated hybrid handshake
//! (ML-KEM-768 + ML-DSA-65), a transcript-binding key schedule, and a
//! per-session AEAD record layer with replay protection and rotation
//! scheduling.
//!
//! Transport, CLI wiring, attestation evidence collection, and persistent
//! key storage are callers' concerns; this crate accepts opaque
//! signature-backed identity keys and produces/consumes plain byte
//! structures that a transport carries.
#![forbid(unsafe_code)]

pub mod capability;
pub mod config;
pub mod error;
pub mod handshake;
pub mod kem;
pub mod policy;
pub mod replay;
pub mod rotation;
pub mod schedule;
pub mod session;
pub mod sig;
pub mod transcript;
pub mod wire;

pub use capability::CapabilitySet;
pub use error::{Result, SessionError};
pub use handshake::{HandshakeConfig, Idle, Initiated, Responder};
pub use schedule::SchedulerKeys;
pub use session::{RecordSession, Role};
pub use wire::{ClientInit, Envelope, ServerPayload, ServerResponse};

/// Library version, forwarded from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
