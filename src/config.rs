//! Configuration knobs for the key schedule, rotation manager, and policy
//! enforcer: small, `Default`-able structs gathered by concern rather than
//! one God struct.

use chrono::Duration;

/// Inputs the key scheduler needs beyond the shared secret and transcript
/// digest.
#[derive(Clone, Debug)]
pub struct KeyScheduleConfig {
    /// HKDF salt. May be empty.
    pub salt: Vec<u8>,
    /// Negotiated handshake mode, folded into the HKDF `info` parameter.
    pub mode: String,
    /// How long freshly derived keys remain current before a rotation hint
    /// is due.
    pub rotation_interval: Duration,
}

impl Default for KeyScheduleConfig {
    fn default() -> Self {
        Self {
            salt: Vec::new(),
            mode: "strict".to_string(),
            rotation_interval: Duration::minutes(15),
        }
    }
}

/// Rotation manager thresholds.
#[derive(Clone, Copy, Debug)]
pub struct RotationConfig {
    /// Wall-clock interval after which rotation is due.
    pub interval: Duration,
    /// Packet count after which rotation is due, or `0` to disable the
    /// packet-count trigger.
    pub max_packets: u64,
    /// Safety margin subtracted from `interval` before the time-based
    /// trigger fires. Ignored if `skew >= interval`.
    pub skew: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::minutes(15),
            max_packets: 0,
            skew: Duration::seconds(5),
        }
    }
}

/// Replay window depth.
#[derive(Clone, Copy, Debug)]
pub struct ReplayConfig {
    /// Number of trailing sequence numbers tracked behind the highest
    /// observed one.
    pub depth: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { depth: 2048 }
    }
}

/// Static policy over negotiated handshake/session parameters.
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    /// Modes this endpoint will accept.
    pub allowed_modes: Vec<String>,
    /// AEAD suite names this endpoint will accept.
    pub allowed_aead: Vec<String>,
    /// Minimum acceptable rotation interval.
    pub min_rotation: Duration,
    /// Maximum acceptable rotation interval.
    pub max_rotation: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_modes: vec!["strict".to_string(), "hybrid".to_string()],
            allowed_aead: vec!["xchacha20poly1305".to_string()],
            min_rotation: Duration::minutes(1),
            max_rotation: Duration::hours(24),
        }
    }
}
