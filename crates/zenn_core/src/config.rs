//! Coordinator configuration.
//!
//! # Responsibility
//! - Hold the tunable timings of the mutation coordinator.
//! - Load overrides from `{prefix}_*` environment variables.
//!
//! Insight thresholds are not configurable; they live as named constants in
//! the `insight` modules.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Deadline for one remote store call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
/// Time a hidden row keeps rendering so its exit animation can finish.
pub const DEFAULT_EXIT_ANIMATION_DELAY: Duration = Duration::from_millis(350);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { name: String, value: String },
    ZeroTimeout { name: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, value } => {
                write!(f, "{name} must be a whole number of milliseconds, got `{value}`")
            }
            Self::ZeroTimeout { name } => write!(f, "{name} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub remote_timeout: Duration,
    pub exit_animation_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            exit_animation_delay: DEFAULT_EXIT_ANIMATION_DELAY,
        }
    }
}

impl CoordinatorConfig {
    /// Reads overrides from the environment.
    ///
    /// - `{prefix}_REMOTE_TIMEOUT_MS`: remote call deadline, must be > 0.
    /// - `{prefix}_EXIT_DELAY_MS`: exit animation delay, may be 0.
    ///
    /// Missing variables keep their defaults.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let timeout_name = format!("{prefix}_REMOTE_TIMEOUT_MS");
        let remote_timeout = parse_env_millis(&timeout_name, DEFAULT_REMOTE_TIMEOUT)?;
        if remote_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout { name: timeout_name });
        }
        let exit_animation_delay = parse_env_millis(
            &format!("{prefix}_EXIT_DELAY_MS"),
            DEFAULT_EXIT_ANIMATION_DELAY,
        )?;
        Ok(Self {
            remote_timeout,
            exit_animation_delay,
        })
    }

    pub fn with_remote_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    pub fn with_exit_animation_delay(mut self, delay: Duration) -> Self {
        self.exit_animation_delay = delay;
        self
    }
}

fn parse_env_millis(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(default),
    }
}
