use log::debug;
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use crate::error::{RecoveryError, Result};
use crate::hashing::HashPacking;
use crate::types::ContentHash;

/// Name state of one archive member. `Discovered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unknown,
    Discovered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub hash: ContentHash,
    pub discovered_name: Option<String>,
}

impl ArchiveEntry {
    pub fn unknown(hash: ContentHash) -> Self {
        Self {
            hash,
            discovered_name: None,
        }
    }

    pub fn state(&self) -> EntryState {
        if self.discovered_name.is_some() {
            EntryState::Discovered
        } else {
            EntryState::Unknown
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.state() == EntryState::Unknown
    }
}

/// The container a recovery pass proposes names to.
///
/// Implementations own the bytes and the name registry; recovery only reads
/// content and calls [`Archive::discover_file`].
pub trait Archive {
    /// Packing this archive's producer used for content hashes
    fn packing(&self) -> HashPacking;

    /// Hashes of members that have no name yet
    fn unknown_hashes(&self) -> Vec<ContentHash>;

    /// Raw content of a member
    fn content(&self, hash: ContentHash) -> Option<&[u8]>;

    /// Hash `name`, and if it matches an unknown member register it.
    ///
    /// Returns true when `name` names a member (newly or already). A member
    /// that already has a name keeps it.
    fn discover_file(&mut self, name: &str) -> bool;
}

/// Member bytes, owned or memory-mapped
#[derive(Debug, Clone)]
enum Content {
    Owned(Vec<u8>),
    Mapped(Arc<Mmap>),
}

impl Deref for Content {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Content::Owned(data) => data,
            Content::Mapped(mmap) => mmap,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: ArchiveEntry,
    content: Content,
}

/// In-memory archive keyed by content hash
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    packing: HashPacking,
    entries: BTreeMap<ContentHash, StoredEntry>,
}

impl MemoryArchive {
    pub fn new(packing: HashPacking) -> Self {
        Self {
            packing,
            entries: BTreeMap::new(),
        }
    }

    /// Add a member known only by its hash
    pub fn insert_unknown(&mut self, hash: ContentHash, content: Vec<u8>) {
        self.entries.insert(
            hash,
            StoredEntry {
                entry: ArchiveEntry::unknown(hash),
                content: Content::Owned(content),
            },
        );
    }

    /// Add a member whose name is already listed
    pub fn insert_named(&mut self, name: &str, content: Vec<u8>) -> ContentHash {
        let hash = self.packing.hash(name);
        self.entries.insert(
            hash,
            StoredEntry {
                entry: ArchiveEntry {
                    hash,
                    discovered_name: Some(name.to_string()),
                },
                content: Content::Owned(content),
            },
        );
        hash
    }

    /// Load a directory of extracted unknown members, each file named by its
    /// 16-hex-digit content hash (an extension is allowed and ignored)
    pub fn from_dump_dir<P: AsRef<Path>>(dir: P, packing: HashPacking) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(RecoveryError::FileNotFound(dir.display().to_string()));
        }

        let mut archive = Self::new(packing);
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let hash = match stem.parse::<ContentHash>() {
                Ok(hash) if stem.len() == 16 => hash,
                _ => {
                    debug!("Skipping {}: not named by a content hash", path.display());
                    continue;
                }
            };

            let content = map_file(&path)?;
            archive.entries.insert(
                hash,
                StoredEntry {
                    entry: ArchiveEntry::unknown(hash),
                    content,
                },
            );
        }

        debug!("Loaded {} members from {}", archive.len(), dir.display());
        Ok(archive)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, hash: ContentHash) -> Option<&ArchiveEntry> {
        self.entries.get(&hash).map(|stored| &stored.entry)
    }

    /// Entries in hash order
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.values().map(|stored| &stored.entry)
    }

    pub fn name_of(&self, hash: ContentHash) -> Option<&str> {
        self.entry(hash).and_then(|entry| entry.discovered_name.as_deref())
    }
}

fn map_file(path: &Path) -> Result<Content> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Content::Owned(Vec::new()));
    }

    let mmap = unsafe {
        Mmap::map(&file)
            .map_err(|e| RecoveryError::Mmap(format!("Failed to mmap {}: {}", path.display(), e)))?
    };
    Ok(Content::Mapped(Arc::new(mmap)))
}

impl Archive for MemoryArchive {
    fn packing(&self) -> HashPacking {
        self.packing
    }

    fn unknown_hashes(&self) -> Vec<ContentHash> {
        self.entries
            .values()
            .filter(|stored| stored.entry.is_unknown())
            .map(|stored| stored.entry.hash)
            .collect()
    }

    fn content(&self, hash: ContentHash) -> Option<&[u8]> {
        self.entries.get(&hash).map(|stored| &*stored.content)
    }

    fn discover_file(&mut self, name: &str) -> bool {
        let hash = self.packing.hash(name);
        let Some(stored) = self.entries.get_mut(&hash) else {
            return false;
        };

        match &stored.entry.discovered_name {
            Some(existing) => existing.eq_ignore_ascii_case(name),
            None => {
                stored.entry.discovered_name = Some(name.to_string());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::content_hash;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        dir.push(format!("map_recovery_archive_{unique}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_discover_transitions_once() {
        let mut archive = MemoryArchive::new(HashPacking::LowHigh);
        let hash = content_hash("war3map.j");
        archive.insert_unknown(hash, b"function main takes nothing returns nothing".to_vec());

        assert_eq!(archive.entry(hash).unwrap().state(), EntryState::Unknown);
        assert!(!archive.discover_file("war3map.lua"));
        assert!(archive.discover_file("war3map.j"));
        assert_eq!(archive.entry(hash).unwrap().state(), EntryState::Discovered);
        assert!(archive.unknown_hashes().is_empty());

        // idempotent, and the first casing sticks
        assert!(archive.discover_file("WAR3MAP.J"));
        assert_eq!(archive.name_of(hash), Some("war3map.j"));
    }

    #[test]
    fn test_insert_named_is_not_unknown() {
        let mut archive = MemoryArchive::new(HashPacking::HighLow);
        let hash = archive.insert_named("war3map.w3e", vec![1, 2, 3]);
        assert_eq!(hash, HashPacking::HighLow.hash("war3map.w3e"));
        assert!(archive.unknown_hashes().is_empty());
        assert_eq!(archive.content(hash), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_from_dump_dir() {
        let dir = temp_dir();
        let hash = content_hash("war3map.w3e");
        fs::write(dir.join(format!("{hash}.bin")), b"W3E!data").unwrap();
        fs::write(dir.join("0000000000000001"), b"").unwrap();
        fs::write(dir.join("readme.txt"), b"ignored").unwrap();

        let mut archive = MemoryArchive::from_dump_dir(&dir, HashPacking::LowHigh).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.content(hash), Some(&b"W3E!data"[..]));
        assert_eq!(archive.content(ContentHash(1)), Some(&b""[..]));
        assert!(archive.discover_file("war3map.w3e"));
    }

    #[test]
    fn test_from_missing_dir_fails() {
        let result = MemoryArchive::from_dump_dir("/definitely/not/here", HashPacking::LowHigh);
        assert!(matches!(result, Err(RecoveryError::FileNotFound(_))));
    }
}
