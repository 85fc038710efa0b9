//! Advertised algorithm identifiers exchanged during the handshake.

use serde::{Deserialize, Serialize};

/// Canonical algorithm-identifier strings advertised by an endpoint.
///
/// `transports` preserves preference order: the first entry is the sender's
/// most-preferred transport. Ordering of the other fields carries no
/// meaning beyond identifying a single negotiated algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// Post-quantum KEM identifier, e.g. `"ML-KEM-768"`.
    pub pq_kem: String,
    /// Post-quantum signature identifier, e.g. `"ML-DSA-65"`.
    pub pq_sigs: String,
    /// AEAD identifier, e.g. `"xchacha20poly1305"`.
    pub aead: String,
    /// Transport identifiers in preference order.
    pub transports: Vec<String>,
}

impl CapabilitySet {
    /// Build a capability set with an explicit transport preference list.
    pub fn new(
        pq_kem: impl Into<String>,
        pq_sigs: impl Into<String>,
        aead: impl Into<String>,
        transports: Vec<String>,
    ) -> Self {
        Self {
            pq_kem: pq_kem.into(),
            pq_sigs: pq_sigs.into(),
            aead: aead.into(),
            transports,
        }
    }

    /// Pick the first transport this set prefers that the peer also
    /// supports, preserving our own preference order.
    ///
    /// This is a convenience for the transport wiring the core up (out of
    /// scope for the core itself) and has no bearing on transcript hashing.
    pub fn negotiate_transport(&self, peer: &CapabilitySet) -> Option<String> {
        self.transports
            .iter()
            .find(|t| peer.transports.contains(t))
            .cloned()
    }
}
