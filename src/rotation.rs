//! Rotation manager: a hint generator telling the transport when it should
//! initiate a fresh handshake. Rotation never rekeys by itself.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::config::RotationConfig;

struct RotationState {
    start: DateTime<Utc>,
    packets: u64,
    epoch: u64,
}

/// Tracks packet counts and wall-clock age to decide when a session is due
/// for rotation. Internally mutex-guarded so `record` can be called from the
/// send path while `should_rotate`/`current_epoch` are read elsewhere
/// without external locking.
pub struct RotationManager {
    config: RotationConfig,
    state: Mutex<RotationState>,
}

impl RotationManager {
    /// Start a rotation manager at `now`, beginning at `initial_epoch`.
    pub fn new(config: RotationConfig, now: DateTime<Utc>, initial_epoch: u64) -> Self {
        Self {
            config,
            state: Mutex::new(RotationState {
                start: now,
                packets: 0,
                epoch: initial_epoch,
            }),
        }
    }

    /// Record one outgoing packet and report whether rotation is now due.
    pub fn record(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().expect("rotation mutex poisoned");
        state.packets += 1;
        Self::should_rotate_locked(&self.config, &state, now)
    }

    /// Pure check: is rotation due, without mutating any counters?
    pub fn should_rotate(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.lock().expect("rotation mutex poisoned");
        Self::should_rotate_locked(&self.config, &state, now)
    }

    fn should_rotate_locked(config: &RotationConfig, state: &RotationState, now: DateTime<Utc>) -> bool {
        let packet_triggered = config.max_packets > 0 && state.packets >= config.max_packets;
        let effective_skew = if config.skew >= config.interval {
            chrono::Duration::zero()
        } else {
            config.skew
        };
        let time_triggered = now >= state.start + (config.interval - effective_skew);
        packet_triggered || time_triggered
    }

    /// Reset the rotation window at `now` and advance the epoch.
    pub fn reset(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().expect("rotation mutex poisoned");
        state.start = now;
        state.packets = 0;
        state.epoch += 1;
    }

    /// The epoch the session currently operates under.
    pub fn current_epoch(&self) -> u64 {
        self.state.lock().expect("rotation mutex poisoned").epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn packet_threshold_triggers_rotation() {
        let cfg = RotationConfig {
            interval: Duration::hours(1),
            max_packets: 3,
            skew: Duration::seconds(5),
        };
        let now = Utc::now();
        let mgr = RotationManager::new(cfg, now, 0);
        assert!(!mgr.record(now));
        assert!(!mgr.record(now));
        assert!(mgr.record(now));
    }

    #[test]
    fn time_threshold_triggers_rotation() {
        let cfg = RotationConfig {
            interval: Duration::seconds(10),
            max_packets: 0,
            skew: Duration::seconds(2),
        };
        let now = Utc::now();
        let mgr = RotationManager::new(cfg, now, 0);
        assert!(!mgr.should_rotate(now));
        assert!(mgr.should_rotate(now + Duration::seconds(9)));
    }

    #[test]
    fn skew_ignored_when_not_smaller_than_interval() {
        let cfg = RotationConfig {
            interval: Duration::seconds(10),
            max_packets: 0,
            skew: Duration::seconds(20),
        };
        let now = Utc::now();
        let mgr = RotationManager::new(cfg, now, 0);
        assert!(!mgr.should_rotate(now + Duration::seconds(9)));
        assert!(mgr.should_rotate(now + Duration::seconds(10)));
    }

    #[test]
    fn reset_advances_epoch_and_clears_counters() {
        let cfg = RotationConfig {
            interval: Duration::hours(1),
            max_packets: 1,
            skew: Duration::seconds(0),
        };
        let now = Utc::now();
        let mgr = RotationManager::new(cfg, now, 0);
        assert!(mgr.record(now));
        mgr.reset(now);
        assert_eq!(mgr.current_epoch(), 1);
        assert!(!mgr.should_rotate(now));
    }
}
