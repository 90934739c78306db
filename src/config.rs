//! Container configuration.
//!
//! Values come from code (`ContainerConfig::default()` plus builder
//! methods), from the environment (`ContainerConfig::from_env`) or, with the
//! `config` feature, from any serde format.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Environment variable selecting the lifetime-violation policy.
pub const ENV_LIFETIME_VIOLATIONS: &str = "FERROUS_INJECT_LIFETIME_VIOLATIONS";
/// Environment variable toggling warnings for unresolved route dependencies.
pub const ENV_WARN_UNRESOLVED: &str = "FERROUS_INJECT_WARN_UNRESOLVED";

/// What to do when a longer-lived service depends on a shorter-lived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ViolationPolicy {
    /// Log a warning and register anyway.
    #[default]
    Warn,
    /// Fail the registration with `DiError::LifetimeViolation`.
    Deny,
    /// Register silently.
    Ignore,
}

impl FromStr for ViolationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(ViolationPolicy::Warn),
            "deny" | "error" => Ok(ViolationPolicy::Deny),
            "ignore" | "off" => Ok(ViolationPolicy::Ignore),
            other => Err(format!("unknown violation policy: {}", other)),
        }
    }
}

/// Container behaviour switches.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, ContainerConfig, ViolationPolicy};
///
/// let config = ContainerConfig::default().lifetime_violations(ViolationPolicy::Deny);
/// let container = Container::with_config(config);
/// assert_eq!(container.config().lifetime_violations, ViolationPolicy::Deny);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    pub lifetime_violations: ViolationPolicy,
    /// Warn when a route-level protocol dependency is not registered.
    pub warn_unresolved_dependencies: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            lifetime_violations: ViolationPolicy::Warn,
            warn_unresolved_dependencies: true,
        }
    }
}

impl ContainerConfig {
    /// Sets the lifetime-violation policy.
    pub fn lifetime_violations(mut self, policy: ViolationPolicy) -> Self {
        self.lifetime_violations = policy;
        self
    }

    /// Toggles warnings for unresolved route dependencies.
    pub fn warn_unresolved_dependencies(mut self, warn: bool) -> Self {
        self.warn_unresolved_dependencies = warn;
        self
    }

    /// Defaults overlaid with the `FERROUS_INJECT_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = ContainerConfig::default();

        if let Ok(value) = env::var(ENV_LIFETIME_VIOLATIONS) {
            match value.parse() {
                Ok(policy) => config.lifetime_violations = policy,
                Err(err) => tracing::warn!(variable = ENV_LIFETIME_VIOLATIONS, %err, "ignoring invalid value"),
            }
        }

        if let Ok(value) = env::var(ENV_WARN_UNRESOLVED) {
            match value.trim().parse::<bool>() {
                Ok(flag) => config.warn_unresolved_dependencies = flag,
                Err(err) => tracing::warn!(variable = ENV_WARN_UNRESOLVED, %err, "ignoring invalid value"),
            }
        }

        config
    }
}
