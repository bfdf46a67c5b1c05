//! Configuration APIs
//!
//! Every configurable part of a measurement run implements the [`Config`]
//! trait, which provides validation, environment initialization, presets and
//! JSON file round trips.
//!
//! # Presets
//!
//! ```rust
//! use stackmap_compress::config::{Config, ExperimentConfig};
//!
//! // Only the two cheapest schemes
//! let config = ExperimentConfig::performance_preset();
//!
//! // Compact tables, frequency ordering, every size estimate
//! let config = ExperimentConfig::memory_preset();
//!
//! // Only the schemes with a working decoder
//! let config = ExperimentConfig::realtime_preset();
//! ```
//!
//! # Environment Initialization
//!
//! ```rust
//! use stackmap_compress::config::{Config, ExperimentConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads STACKMAP_LAYOUT, STACKMAP_BITMAP_ORDER, STACKMAP_EXTRA_BYTES,
//! // STACKMAP_FILTER_LIVE_TO_DEAD and STACKMAP_SCHEMES
//! let config = ExperimentConfig::from_env()?;
//!
//! let config = ExperimentConfig::from_env_with_prefix("MYTOOL_")?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use std::env;
use std::fmt;
use std::path::Path;

pub mod experiment;


pub use experiment::ExperimentConfig;

/// Environment variable prefix used by [`Config::from_env`]
pub const ENV_PREFIX: &str = "STACKMAP_";

/// Common configuration trait providing validation, environment initialization,
/// and preset management functionality.
pub trait Config: Clone + fmt::Debug {
    /// Validate the configuration for correctness and consistency.
    fn validate(&self) -> Result<()>;

    /// Initialize configuration from `STACKMAP_`-prefixed environment variables.
    ///
    /// Unset variables keep their default values.
    fn from_env() -> Result<Self>
    where
        Self: Default,
    {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Initialize configuration from environment variables with a custom prefix.
    fn from_env_with_prefix(prefix: &str) -> Result<Self>
    where
        Self: Default;

    /// Preset that finishes fastest.
    fn performance_preset() -> Self;

    /// Preset aimed at the smallest encodings.
    fn memory_preset() -> Self;

    /// Preset restricted to layouts a runtime could decode directly.
    fn realtime_preset() -> Self;

    /// Balanced preset; the default configuration.
    fn balanced_preset() -> Self
    where
        Self: Default,
    {
        Self::default()
    }

    /// Save configuration to a file as pretty-printed JSON.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Load and validate configuration from a JSON file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>;
}

/// Parse environment variable `var_name`, falling back to `default` when it
/// is unset or does not parse.
pub fn parse_env_var<T>(var_name: &str, default: T) -> T
where
    T: std::str::FromStr + Clone,
{
    env::var(var_name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean environment variable.
///
/// Accepts "true", "1", "yes", "on" (case-insensitive) as true,
/// everything else as false.
pub fn parse_env_bool(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .map(|s| {
            let s = s.to_lowercase();
            matches!(s.as_str(), "true" | "1" | "yes" | "on")
        })
        .unwrap_or(default)
}
