use serde::{Serialize, Serializer};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::RecoveryError;

/// Newtype wrapper for the 64-bit content hash an archive indexes its members by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub u64);

impl ContentHash {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Lower 32 bits
    pub fn low(&self) -> u32 {
        self.0 as u32
    }

    /// Upper 32 bits
    pub fn high(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = RecoveryError;

    /// Parses 1 to 16 hex digits, with or without a `0x` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() || digits.len() > 16 {
            return Err(RecoveryError::Parse(format!("not a content hash: '{s}'")));
        }

        u64::from_str_radix(digits, 16)
            .map(ContentHash)
            .map_err(|err| RecoveryError::Parse(format!("not a content hash: '{s}': {err}")))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Recovery configuration
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Number of threads (0 = auto)
    pub num_threads: usize,

    /// Candidates pulled per brute-force batch; cancellation is polled between batches
    pub batch_size: usize,

    /// Bit width of the fuzzy histograms used for reference matching
    pub fuzzy_bit_width: u8,

    /// Minimum similarity (0-100) for a reference file to count as a match
    pub similarity_threshold: f64,

    /// Assign placeholder names to entries that stay unknown
    pub sniff_placeholders: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            batch_size: 64 * 1024,
            fuzzy_bit_width: 8,
            similarity_threshold: 95.0,
            sniff_placeholders: true,
        }
    }
}

impl RecoveryConfig {
    /// Create a validated config
    pub fn new(num_threads: usize, batch_size: usize) -> crate::Result<Self> {
        let config = Self {
            num_threads,
            batch_size,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(RecoveryError::Config("batch size must be greater than 0".to_string()));
        }
        if !crate::fuzzy::BIT_WIDTH_RANGE.contains(&self.fuzzy_bit_width) {
            return Err(RecoveryError::Config(format!(
                "fuzzy bit width {} outside {:?}",
                self.fuzzy_bit_width,
                crate::fuzzy::BIT_WIDTH_RANGE
            )));
        }
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(RecoveryError::Config(format!(
                "similarity threshold {} outside 0-100",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Where a recovered name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscoverySource {
    Dictionary,
    Reference,
    BruteForce,
}

/// Recovery phases reported over the progress channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    DictionaryProbe,
    ReferenceMatch,
    BruteForce,
    FormatSniff,
}

/// Progress update sent via tokio channel
#[derive(Debug, Clone)]
pub enum RecoveryProgress {
    /// A phase started with this many entries still unknown
    PhaseStarted(RecoveryPhase, usize),
    /// A name was verified and registered
    Discovered(ContentHash, String),
    /// Brute-force batch finished; total candidates tested so far
    BatchCompleted(u64),
    /// Brute force stopped on the cancellation flag
    Cancelled,
}

/// Recovery statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryStats {
    pub total_unknown: usize,
    pub dictionary_hits: usize,
    pub reference_hits: usize,
    pub brute_force_hits: usize,
    pub candidates_tested: u64,
    pub rejected_candidates: usize,
    pub placeholders: usize,
}

impl RecoveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discovered(&self) -> usize {
        self.dictionary_hits + self.reference_hits + self.brute_force_hits
    }

    pub fn completion_percentage(&self) -> f32 {
        if self.total_unknown == 0 {
            0.0
        } else {
            (self.discovered() as f32 / self.total_unknown as f32) * 100.0
        }
    }
}

/// Shared cancellation signal for cooperative loops
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
