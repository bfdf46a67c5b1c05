//! Per-scheme size reports

use serde::Serialize;
use std::fmt;

/// Segment holding stored bitmap tables
pub const TABLE_BYTES: &str = "table bytes";
/// Segment holding pc-indexed records
pub const PCDATA_BYTES: &str = "pcdata bytes";
/// Segment holding fixed per-function pointers and offsets
pub const EXTRA_BYTES: &str = "extra per-function overhead";

/// Byte counts by named segment, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    segments: Vec<(String, u64)>,
}

impl SizeReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Report with the three standard segments
    pub fn with_segments(table: u64, pcdata: u64, extra: u64) -> Self {
        let mut report = Self::new();
        report.add(TABLE_BYTES, table);
        report.add(PCDATA_BYTES, pcdata);
        report.add(EXTRA_BYTES, extra);
        report
    }

    /// Add `bytes` to `segment`, creating it at the end if new
    pub fn add(&mut self, segment: &str, bytes: u64) {
        match self.segments.iter_mut().find(|(name, _)| name == segment) {
            Some((_, total)) => *total += bytes,
            None => self.segments.push((segment.to_string(), bytes)),
        }
    }

    /// Bytes in `segment`, 0 if absent
    pub fn get(&self, segment: &str) -> u64 {
        self.segments
            .iter()
            .find(|(name, _)| name == segment)
            .map_or(0, |(_, bytes)| *bytes)
    }

    /// Segments in insertion order
    pub fn segments(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.segments.iter().map(|(name, bytes)| (name.as_str(), *bytes))
    }

    /// Sum of all segments
    pub fn total(&self) -> u64 {
        self.segments.iter().map(|(_, bytes)| bytes).sum()
    }
}

fn short_name(segment: &str) -> &str {
    match segment {
        TABLE_BYTES => "table",
        PCDATA_BYTES => "pcdata",
        EXTRA_BYTES => "extra",
        other => other,
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, bytes) in self.segments() {
            write!(f, "{}={} ", short_name(name), bytes)?;
        }
        write!(f, "total={}", self.total())
    }
}

/// A report labelled with the scheme that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeReport {
    /// Scheme name as displayed
    pub scheme: String,
    /// Sizes
    pub sizes: SizeReport,
}

impl fmt::Display for SchemeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scheme, self.sizes)
    }
}
