//! Timing profiles for spin-round sequencing

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timing profile for round sequencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingProfile {
    /// Normal gameplay timing
    Normal,
    /// Fast/Turbo mode
    Turbo,
    /// Studio mode (short waits for testing)
    Studio,
    /// Custom timing multiplier
    Custom,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::Normal
    }
}

/// Waits inserted between sequencing commands, in seconds of simulation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Profile type
    pub profile: TimingProfile,

    /// Delay after each per-reel spin/stop command
    pub inter_reel_delay_secs: f64,

    /// Time all reels cruise before the stop cascade begins
    pub pre_stop_dwell_secs: f64,

    /// Time the win highlight plays before the round reports
    pub post_win_dwell_secs: f64,
}

impl TimingConfig {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            inter_reel_delay_secs: 0.2,
            pre_stop_dwell_secs: 5.0,
            post_win_dwell_secs: 2.0,
        }
    }

    /// Turbo mode
    pub fn turbo() -> Self {
        Self {
            profile: TimingProfile::Turbo,
            inter_reel_delay_secs: 0.1,
            pre_stop_dwell_secs: 2.0,
            post_win_dwell_secs: 1.0,
        }
    }

    /// Studio mode (keeps the cascade visible but short)
    pub fn studio() -> Self {
        Self {
            profile: TimingProfile::Studio,
            inter_reel_delay_secs: 0.05,
            pre_stop_dwell_secs: 0.5,
            post_win_dwell_secs: 0.25,
        }
    }

    /// Get config for profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Studio => Self::studio(),
            TimingProfile::Custom => Self::normal(),
        }
    }

    /// Scale timing by factor (< 1.0 = faster)
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            profile: TimingProfile::Custom,
            inter_reel_delay_secs: self.inter_reel_delay_secs * factor,
            pre_stop_dwell_secs: self.pre_stop_dwell_secs * factor,
            post_win_dwell_secs: self.post_win_dwell_secs * factor,
        }
    }

    /// Scheduled time from round start until the last stop command's delay ends.
    ///
    /// Does not include the settle wait, which depends on reel speed.
    pub fn total_round_secs(&self, reel_count: usize) -> f64 {
        2.0 * reel_count as f64 * self.inter_reel_delay_secs + self.pre_stop_dwell_secs
    }

    /// Reject negative or non-finite waits
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("inter_reel_delay_secs", self.inter_reel_delay_secs),
            ("pre_stop_dwell_secs", self.pre_stop_dwell_secs),
            ("post_win_dwell_secs", self.post_win_dwell_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::normal()
    }
}

/// Countdown for a single timed wait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f64,
}

impl Countdown {
    /// Create a countdown of `secs`
    pub fn new(secs: f64) -> Self {
        Self {
            remaining: secs.max(0.0),
        }
    }

    /// Time left
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Consume up to `dt` seconds.
    ///
    /// Returns the unused part of `dt` once the wait has elapsed, `None` while
    /// still waiting.
    pub fn advance(&mut self, dt: f64) -> Option<f64> {
        if dt >= self.remaining {
            let leftover = dt - self.remaining;
            self.remaining = 0.0;
            Some(leftover)
        } else {
            self.remaining -= dt;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_profiles() {
        let normal = TimingConfig::normal();
        let turbo = TimingConfig::turbo();
        let studio = TimingConfig::studio();

        assert!(turbo.pre_stop_dwell_secs < normal.pre_stop_dwell_secs);
        assert!(studio.pre_stop_dwell_secs < turbo.pre_stop_dwell_secs);
        assert!(turbo.inter_reel_delay_secs < normal.inter_reel_delay_secs);

        assert_eq!(
            TimingConfig::from_profile(TimingProfile::Custom),
            TimingConfig::normal()
        );
    }

    #[test]
    fn test_scaled_marks_custom() {
        let half = TimingConfig::normal().scaled(0.5);
        assert_eq!(half.profile, TimingProfile::Custom);
        assert_eq!(half.pre_stop_dwell_secs, 2.5);
        assert_eq!(half.post_win_dwell_secs, 1.0);
    }

    #[test]
    fn test_total_round_secs() {
        let config = TimingConfig::normal();
        // 5 spin delays + dwell + 5 stop delays
        let expected = 10.0 * 0.2 + 5.0;
        assert!((config.total_round_secs(5) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_negative() {
        let mut config = TimingConfig::turbo();
        assert!(config.validate().is_ok());

        config.post_win_dwell_secs = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        config.post_win_dwell_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_countdown_carries_leftover() {
        let mut wait = Countdown::new(0.5);
        assert_eq!(wait.advance(0.2), None);
        assert!((wait.remaining() - 0.3).abs() < 1e-9);

        let leftover = wait.advance(0.5).unwrap();
        assert!((leftover - 0.2).abs() < 1e-9);
        assert_eq!(wait.remaining(), 0.0);
    }

    #[test]
    fn test_zero_countdown_elapses_immediately() {
        let mut wait = Countdown::new(0.0);
        assert_eq!(wait.advance(0.0), Some(0.0));
    }
}
