//! Configuration of a measurement run.

use super::{parse_env_bool, parse_env_var, Config};
use crate::error::{Result, StackMapError};
use crate::experiment::{BitmapOrder, EncodingScheme};
use crate::stackmap::TableLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default per-function overhead: an 8-byte table pointer plus a 4-byte pcdata offset
pub const DEFAULT_EXTRA_BYTES: u64 = 8 + 4;

/// Settings shared by every scheme of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Table layout for the deduplicating and estimate-only schemes
    pub layout: TableLayout,
    /// How table indices are assigned
    pub bitmap_order: BitmapOrder,
    /// Fixed bytes charged per function by table-based schemes
    pub extra_bytes_per_function: u64,
    /// Drop points where nothing becomes newly live before measuring
    pub filter_live_to_dead: bool,
    /// Schemes to evaluate, in report order
    pub schemes: Vec<EncodingScheme>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            layout: TableLayout::Expanded,
            bitmap_order: BitmapOrder::Insertion,
            extra_bytes_per_function: DEFAULT_EXTRA_BYTES,
            filter_live_to_dead: false,
            schemes: EncodingScheme::default_set(),
        }
    }
}

impl ExperimentConfig {
    /// Replace the scheme list
    pub fn with_schemes(mut self, schemes: Vec<EncodingScheme>) -> Self {
        self.schemes = schemes;
        self
    }

    /// Parse a comma-separated scheme list such as `dedup,huffman(8),gr(3)`
    pub fn parse_schemes(list: &str) -> Result<Vec<EncodingScheme>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl Config for ExperimentConfig {
    fn validate(&self) -> Result<()> {
        if self.schemes.is_empty() {
            return Err(StackMapError::configuration("schemes must not be empty"));
        }
        for scheme in &self.schemes {
            scheme.validate()?;
        }
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.layout = parse_env_var(&format!("{}LAYOUT", prefix), config.layout);
        config.bitmap_order =
            parse_env_var(&format!("{}BITMAP_ORDER", prefix), config.bitmap_order);
        config.extra_bytes_per_function =
            parse_env_var(&format!("{}EXTRA_BYTES", prefix), config.extra_bytes_per_function);
        config.filter_live_to_dead =
            parse_env_bool(&format!("{}FILTER_LIVE_TO_DEAD", prefix), config.filter_live_to_dead);
        if let Ok(list) = std::env::var(format!("{}SCHEMES", prefix)) {
            config.schemes = Self::parse_schemes(&list)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn performance_preset() -> Self {
        Self::default().with_schemes(vec![
            EncodingScheme::Deduplicated,
            EncodingScheme::DeltaHuffman { stream_align: 8 },
        ])
    }

    fn memory_preset() -> Self {
        let mut schemes = vec![EncodingScheme::Huffman { stream_align: 1 }];
        schemes.extend((0..8).map(|n| EncodingScheme::GolombRice { n }));
        schemes.push(EncodingScheme::DeltaHuffman { stream_align: 1 });
        Self {
            layout: TableLayout::Compact,
            bitmap_order: BitmapOrder::Frequency,
            ..Self::default()
        }
        .with_schemes(schemes)
    }

    fn realtime_preset() -> Self {
        Self::default().with_schemes(vec![
            EncodingScheme::Expanded,
            EncodingScheme::Compact,
            EncodingScheme::Deduplicated,
        ])
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self).map_err(|e| {
            StackMapError::configuration(format!("Failed to serialize experiment config: {}", e))
        })?;
        std::fs::write(path, serialized).map_err(|e| {
            StackMapError::configuration(format!("Failed to write experiment config file: {}", e))
        })?;
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StackMapError::configuration(format!("Failed to read experiment config file: {}", e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            StackMapError::configuration(format!("Failed to parse experiment config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}
