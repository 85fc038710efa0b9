//! Static policy enforcement over negotiated handshake/session parameters.
//! Invoked exactly once, at session construction.

use chrono::Duration;

use crate::config::PolicyConfig;
use crate::error::{Result, SessionError};

/// The subset of negotiated parameters policy cares about.
pub struct NegotiatedParams<'a> {
    /// Negotiated handshake mode.
    pub mode: &'a str,
    /// Negotiated AEAD suite name.
    pub aead: &'a str,
    /// Negotiated rotation interval.
    pub rotation_interval: Duration,
}

/// Validates negotiated parameters against a static allow-list/range
/// configuration, returning the first violation found.
pub struct PolicyEnforcer {
    config: PolicyConfig,
}

impl PolicyEnforcer {
    /// Build an enforcer from a policy configuration.
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Validate `params`, returning the first violation as an error.
    pub fn validate(&self, params: &NegotiatedParams<'_>) -> Result<()> {
        if !self
            .config
            .allowed_modes
            .iter()
            .any(|m| m == params.mode)
        {
            return Err(SessionError::PolicyViolation(format!(
                "mode {:?} is not in the allowed set",
                params.mode
            )));
        }

        if !self
            .config
            .allowed_aead
            .iter()
            .any(|a| a == params.aead)
        {
            return Err(SessionError::UnsupportedAead(params.aead.to_string()));
        }

        if params.rotation_interval < self.config.min_rotation {
            return Err(SessionError::PolicyViolation(format!(
                "rotation interval {:?} is below the minimum {:?}",
                params.rotation_interval, self.config.min_rotation
            )));
        }

        if params.rotation_interval > self.config.max_rotation {
            return Err(SessionError::PolicyViolation(format!(
                "rotation interval {:?} is above the maximum {:?}",
                params.rotation_interval, self.config.max_rotation
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcer() -> PolicyEnforcer {
        PolicyEnforcer::new(PolicyConfig::default())
    }

    #[test]
    fn accepts_default_params() {
        let params = NegotiatedParams {
            mode: "strict",
            aead: "xchacha20poly1305",
            rotation_interval: Duration::minutes(15),
        };
        assert!(enforcer().validate(&params).is_ok());
    }

    #[test]
    fn rejects_unknown_mode() {
        let params = NegotiatedParams {
            mode: "yolo",
            aead: "xchacha20poly1305",
            rotation_interval: Duration::minutes(15),
        };
        assert!(matches!(
            enforcer().validate(&params),
            Err(SessionError::PolicyViolation(_))
        ));
    }

    #[test]
    fn rejects_unknown_aead() {
        let params = NegotiatedParams {
            mode: "strict",
            aead: "aes-gcm",
            rotation_interval: Duration::minutes(15),
        };
        assert!(matches!(
            enforcer().validate(&params),
            Err(SessionError::UnsupportedAead(_))
        ));
    }

    #[test]
    fn rejects_rotation_window_out_of_range() {
        let too_short = NegotiatedParams {
            mode: "strict",
            aead: "xchacha20poly1305",
            rotation_interval: Duration::seconds(1),
        };
        assert!(enforcer().validate(&too_short).is_err());

        let too_long = NegotiatedParams {
            mode: "strict",
            aead: "xchacha20poly1305",
            rotation_interval: Duration::days(30),
        };
        assert!(enforcer().validate(&too_long).is_err());
    }
}
