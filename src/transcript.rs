//! Append-only, domain-separated transcript accumulator.
//!
//! Keyed on BLAKE3 (used here for the transcript, session id, nonce
//! derivation, and confirmation tags); `snapshot()` does not consume the
//! accumulator.

use std::sync::Mutex;

/// Domain prefix folded into every transcript before any contribution.
const DOMAIN_PREFIX: &[u8] = b"domain:";

/// Append-only, length-framed, domain-separated hash of handshake
/// contributions.
///
/// Every `append(label, value)` folds `label || u64_be(len(value)) || value`
/// into the running hash, so two endpoints that append the same
/// contributions in the same order always agree on the resulting digest
/// Internally mutex-guarded so a transcript can be shared
/// across threads without the caller serializing appends by hand.
pub struct Transcript {
    inner: Mutex<blake3::Hasher>,
}

impl Transcript {
    /// Start a new transcript under the given domain name.
    ///
    /// `domain_name` is folded in as `"domain:" || domain_name` before any
    /// contribution, preventing cross-protocol transcript collisions.
    pub fn new(domain_name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN_PREFIX);
        hasher.update(domain_name.as_bytes());
        Self {
            inner: Mutex::new(hasher),
        }
    }

    /// Fold a labeled, length-prefixed contribution into the transcript.
    pub fn append(&self, label: &[u8], value: &[u8]) {
        let mut hasher = self.inner.lock().expect("transcript mutex poisoned");
        hasher.update(label);
        hasher.update(&(value.len() as u64).to_be_bytes());
        hasher.update(value);
    }

    /// Return the current digest without consuming the accumulator.
    pub fn snapshot(&self) -> [u8; 32] {
        let hasher = self.inner.lock().expect("transcript mutex poisoned");
        *hasher.finalize().as_bytes()
    }

    /// Clone the accumulator's current state into an independent instance.
    ///
    /// Useful when a caller needs to fork the transcript to compute a
    /// digest without losing the ability to keep appending.
    pub fn fork(&self) -> Self {
        let hasher = self.inner.lock().expect("transcript mutex poisoned");
        Self {
            inner: Mutex::new(hasher.clone()),
        }
    }
}
