//! Summary of one recovery pass, written as JSON by the CLI.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::archive::Archive;
use crate::error::Result;
use crate::hashing::HashPacking;
use crate::recovery::engine::{Discovery, Placeholder};
use crate::types::{ContentHash, DiscoverySource, RecoveryStats};

/// Compute SHA-256 of member content, hex encoded
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedName {
    pub hash: ContentHash,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DiscoverySource>,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub timestamp: String,
    pub tool_version: String,
    pub packing: HashPacking,
    pub stats: RecoveryStats,
    pub discoveries: Vec<ReportedName>,
    pub placeholders: Vec<ReportedName>,
    /// Members without a verified name, placeholders included
    pub unresolved: Vec<ContentHash>,
}

impl RecoveryReport {
    pub fn build<A: Archive>(
        archive: &A,
        stats: RecoveryStats,
        discoveries: Vec<Discovery>,
        placeholders: Vec<Placeholder>,
    ) -> Self {
        let describe = |hash: ContentHash, name: String, source: Option<DiscoverySource>| {
            let data = archive.content(hash).unwrap_or_default();
            ReportedName {
                hash,
                name,
                source,
                size: data.len() as u64,
                sha256: sha256_hex(data),
            }
        };

        Self {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            packing: archive.packing(),
            stats,
            discoveries: discoveries
                .into_iter()
                .map(|d| describe(d.hash, d.name, Some(d.source)))
                .collect(),
            placeholders: placeholders
                .into_iter()
                .map(|p| describe(p.hash, p.name, None))
                .collect(),
            unresolved: archive.unknown_hashes(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Archive path to extract each member to: its verified name or its placeholder
    pub fn extraction_names(&self) -> impl Iterator<Item = (ContentHash, &str)> {
        self.discoveries
            .iter()
            .chain(self.placeholders.iter())
            .map(|entry| (entry.hash, entry.name.as_str()))
    }
}
