//! # Engine Configuration
//!
//! Tunables read from the environment with sensible defaults. The
//! engine itself never consults a clock or the environment at sweep
//! time — configuration is resolved once at startup.

use chrono::Duration;

/// Configuration for the lifecycle engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum gap between two reminders for the same payment.
    pub reminder_cooldown: Duration,
    /// How long after the downpayment clears the final payment is due.
    pub final_payment_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reminder_cooldown: Duration::hours(6),
            final_payment_window: Duration::hours(72),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the environment, falling back to
    /// defaults for unset or unparsable values:
    ///
    /// - `SIAGA_REMINDER_COOLDOWN_HOURS` (default 6)
    /// - `SIAGA_FINAL_PAYMENT_WINDOW_HOURS` (default 72)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reminder_cooldown: env_hours("SIAGA_REMINDER_COOLDOWN_HOURS")
                .unwrap_or(defaults.reminder_cooldown),
            final_payment_window: env_hours("SIAGA_FINAL_PAYMENT_WINDOW_HOURS")
                .unwrap_or(defaults.final_payment_window),
        }
    }
}

fn env_hours(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<i64>() {
        Ok(hours) if hours > 0 => Some(Duration::hours(hours)),
        _ => {
            tracing::warn!(var, value = %raw, "invalid hours value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.reminder_cooldown, Duration::hours(6));
        assert_eq!(config.final_payment_window, Duration::hours(72));
    }
}
