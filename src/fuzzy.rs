//! Byte-histogram fingerprints for approximate content matching.
//!
//! A fingerprint folds byte values into `2^bit_width` buckets whose counts
//! wrap modulo `2^bit_width - 1`, and keeps the original length. Two
//! fingerprints score 0-100: the mean of a histogram-distance term and an
//! exponential length-ratio term. The score is symmetric and reflexive but
//! is not a metric.

use log::debug;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{RecoveryError, Result};

/// Accepted histogram bit widths
pub const BIT_WIDTH_RANGE: RangeInclusive<u8> = 2..=16;

/// Sharpness of the length penalty
const LENGTH_SHARPNESS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyHash {
    bit_width: u8,
    histogram: Vec<u32>,
    original_length: u64,
}

impl FuzzyHash {
    pub fn compute(data: &[u8], bit_width: u8) -> Result<Self> {
        if !BIT_WIDTH_RANGE.contains(&bit_width) {
            return Err(RecoveryError::InvalidArgument(format!(
                "fuzzy hash bit width {} outside {:?}",
                bit_width, BIT_WIDTH_RANGE
            )));
        }

        let buckets = 1usize << bit_width;
        let modulo = (buckets - 1) as u32;
        let mut histogram = vec![0u32; buckets];

        for &byte in data {
            let slot = &mut histogram[byte as usize % buckets];
            *slot = (*slot + 1) % modulo;
        }

        Ok(Self {
            bit_width,
            histogram,
            original_length: data.len() as u64,
        })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    pub fn histogram(&self) -> &[u32] {
        &self.histogram
    }

    pub fn original_length(&self) -> u64 {
        self.original_length
    }

    fn modulo(&self) -> u32 {
        (1u32 << self.bit_width) - 1
    }

    /// Similarity in `[0, 100]`; fails when the bit widths differ
    pub fn similarity(&self, other: &Self) -> Result<f64> {
        if self.bit_width != other.bit_width {
            return Err(RecoveryError::BitWidthMismatch {
                left: self.bit_width,
                right: other.bit_width,
            });
        }

        let total_diff: u64 = self
            .histogram
            .iter()
            .zip(&other.histogram)
            .map(|(&a, &b)| a.abs_diff(b) as u64)
            .sum();
        let avg_diff = total_diff as f64 / self.histogram.len() as f64;
        let histogram_score = 100.0 - avg_diff / (self.modulo() - 1) as f64 * 100.0;

        let longest = self.original_length.max(other.original_length);
        let length_score = if longest == 0 {
            100.0
        } else {
            let ratio = self.original_length.abs_diff(other.original_length) as f64 / longest as f64;
            100.0 * (-LENGTH_SHARPNESS * ratio).exp()
        };

        Ok((histogram_score + length_score) / 2.0)
    }
}

/// Free-function form of [`FuzzyHash::similarity`]
pub fn similarity(a: &FuzzyHash, b: &FuzzyHash) -> Result<f64> {
    a.similarity(b)
}

/// A known file kept for approximate matching
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    pub name: String,
    pub fingerprint: FuzzyHash,
}

/// Fingerprints of known files, all at the same bit width
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    bit_width: u8,
    files: Vec<ReferenceFile>,
}

impl ReferenceLibrary {
    pub fn new(bit_width: u8) -> Result<Self> {
        // validates the width up front
        FuzzyHash::compute(&[], bit_width)?;
        Ok(Self {
            bit_width,
            files: Vec::new(),
        })
    }

    /// Load every file below `root`, naming each by its relative path with
    /// backslash separators
    pub fn from_dir<P: AsRef<Path>>(root: P, bit_width: u8) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(RecoveryError::FileNotFound(root.display().to_string()));
        }

        let mut library = Self::new(bit_width)?;
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }

                let relative = path.strip_prefix(root).unwrap_or(&path);
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("\\");
                let data = fs::read(&path)?;
                library.add(name, &data)?;
            }
        }

        debug!("Loaded {} reference files from {}", library.len(), root.display());
        Ok(library)
    }

    pub fn add(&mut self, name: impl Into<String>, data: &[u8]) -> Result<()> {
        let fingerprint = FuzzyHash::compute(data, self.bit_width)?;
        self.files.push(ReferenceFile {
            name: name.into(),
            fingerprint,
        });
        Ok(())
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Highest-scoring reference at or above `threshold`; earlier files win ties
    pub fn best_match(&self, fingerprint: &FuzzyHash, threshold: f64) -> Result<Option<(&ReferenceFile, f64)>> {
        let mut best: Option<(&ReferenceFile, f64)> = None;
        for file in &self.files {
            let score = file.fingerprint.similarity(fingerprint)?;
            if score < threshold {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((file, score));
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn test_histogram_wraps_modulo() {
        // bit width 2: 4 buckets, counts modulo 3
        let hash = FuzzyHash::compute(&[0, 0, 0, 0, 1, 5], 2).unwrap();
        assert_eq!(hash.histogram(), &[1, 2, 0, 0]);
        assert_eq!(hash.original_length(), 6);
    }

    #[test]
    fn test_self_similarity_is_100() {
        for data in [&b""[..], b"a", b"hello world", &[0xFFu8; 1000][..]] {
            let hash = FuzzyHash::compute(data, 8).unwrap();
            assert!(approx_eq(hash.similarity(&hash).unwrap(), 100.0));
        }
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = FuzzyHash::compute(b"function main takes nothing returns nothing", 8).unwrap();
        let b = FuzzyHash::compute(b"function config takes nothing returns nothing endfunction", 8).unwrap();
        let ab = a.similarity(&b).unwrap();
        let ba = b.similarity(&a).unwrap();
        assert!(approx_eq(ab, ba));
        assert!(ab < 100.0);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_length_term() {
        // same histogram, double length: histogram term 100, length term 100*e^-5
        let a = FuzzyHash::compute(&[], 4).unwrap();
        let mut b = a.clone();
        b.original_length = 0;
        assert!(approx_eq(a.similarity(&b).unwrap(), 100.0));

        let c = FuzzyHash::compute(b"ab", 8).unwrap();
        let mut d = c.clone();
        d.original_length = 4;
        let expected = (100.0 + 100.0 * (-10.0f64 * 0.5).exp()) / 2.0;
        assert!(approx_eq(c.similarity(&d).unwrap(), expected));
    }

    #[test]
    fn test_bit_width_mismatch_fails() {
        let a = FuzzyHash::compute(b"abc", 8).unwrap();
        let b = FuzzyHash::compute(b"abc", 4).unwrap();
        assert!(matches!(
            similarity(&a, &b),
            Err(RecoveryError::BitWidthMismatch { left: 8, right: 4 })
        ));
    }

    #[test]
    fn test_invalid_bit_width() {
        assert!(FuzzyHash::compute(b"abc", 1).is_err());
        assert!(FuzzyHash::compute(b"abc", 17).is_err());
    }

    #[test]
    fn test_reference_library_best_match() {
        let mut library = ReferenceLibrary::new(8).unwrap();
        library.add("war3map.j", b"function main takes nothing returns nothing\nendfunction\n").unwrap();
        library.add("noise.bin", &[0xAB; 4096]).unwrap();

        let probe = FuzzyHash::compute(b"function main takes nothing returns nothing\nendfunction\n", 8).unwrap();
        let (file, score) = library.best_match(&probe, 90.0).unwrap().unwrap();
        assert_eq!(file.name, "war3map.j");
        assert!(approx_eq(score, 100.0));

        let unrelated = FuzzyHash::compute(&[0x01; 10], 8).unwrap();
        assert!(library.best_match(&unrelated, 99.0).unwrap().is_none());
    }
}
