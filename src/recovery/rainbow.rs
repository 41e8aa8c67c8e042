use ahash::AHashMap;
use log::debug;
use rayon::prelude::*;
use std::collections::hash_map::Entry;

use crate::hashing::HashPacking;
use crate::recovery::candidates::DEFAULT_CANDIDATES;
use crate::types::ContentHash;

/// Precomputed content hash -> candidate name dictionary.
///
/// Names are hashed in parallel, then merged in input order keeping the
/// first name per hash. Distinct names sharing a hash are counted as
/// collisions and dropped; callers re-verify every hit anyway.
#[derive(Debug, Clone)]
pub struct RainbowTable {
    packing: HashPacking,
    entries: AHashMap<ContentHash, String>,
    collisions: usize,
}

impl RainbowTable {
    pub fn new(packing: HashPacking) -> Self {
        Self {
            packing,
            entries: AHashMap::new(),
            collisions: 0,
        }
    }

    /// Hash every candidate in parallel and merge the results
    pub fn build<I, S>(names: I, packing: HashPacking) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(packing);
        table.extend(names);
        table
    }

    /// Table over the built-in candidate corpus
    pub fn with_defaults(packing: HashPacking) -> Self {
        Self::build(DEFAULT_CANDIDATES.iter().copied(), packing)
    }

    /// Wrap an externally supplied dictionary without hashing anything.
    /// Entries are trusted here and verified at lookup sites.
    pub fn from_entries<I>(packing: HashPacking, entries: I) -> Self
    where
        I: IntoIterator<Item = (ContentHash, String)>,
    {
        let mut table = Self::new(packing);
        table.merge(entries.into_iter().collect());
        table
    }

    /// Add more candidates; existing entries win over new ones
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let packing = self.packing;

        // indexed collect keeps input order, which the merge relies on
        let hashed: Vec<(ContentHash, String)> = names
            .into_par_iter()
            .map(|name| (packing.hash(&name), name))
            .collect();

        self.merge(hashed);
    }

    fn merge(&mut self, hashed: Vec<(ContentHash, String)>) {
        for (hash, name) in hashed {
            match self.entries.entry(hash) {
                Entry::Vacant(slot) => {
                    slot.insert(name);
                }
                Entry::Occupied(slot) => {
                    if !slot.get().eq_ignore_ascii_case(&name) {
                        debug!("Hash collision {}: keeping '{}', dropping '{}'", hash, slot.get(), name);
                        self.collisions += 1;
                    }
                }
            }
        }
    }

    pub fn lookup(&self, hash: ContentHash) -> Option<&str> {
        self.entries.get(&hash).map(String::as_str)
    }

    pub fn packing(&self) -> HashPacking {
        self.packing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct names dropped because an earlier name had the same hash
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContentHash, &str)> {
        self.entries.iter().map(|(hash, name)| (*hash, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::content_hash;
    use std::collections::BTreeMap;

    fn as_sorted(table: &RainbowTable) -> BTreeMap<ContentHash, String> {
        table.iter().map(|(hash, name)| (hash, name.to_string())).collect()
    }

    #[test]
    fn test_lookup() {
        let table = RainbowTable::build(["war3map.j", "war3map.w3e"], HashPacking::LowHigh);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(content_hash("war3map.j")), Some("war3map.j"));
        assert_eq!(table.lookup(content_hash("war3map.lua")), None);
    }

    #[test]
    fn test_build_is_order_independent() {
        let names = vec![
            "war3map.j",
            "war3map.w3e",
            "war3map.w3i",
            "war3mapMap.blp",
            "Units\\human\\Footman\\Footman.mdx",
            "war3mapImported\\model.mdx",
        ];
        let forward = RainbowTable::build(names.clone(), HashPacking::LowHigh);
        let mut reversed_names = names.clone();
        reversed_names.reverse();
        let reversed = RainbowTable::build(reversed_names, HashPacking::LowHigh);
        let mut rotated_names = names;
        rotated_names.rotate_left(2);
        let rotated = RainbowTable::build(rotated_names, HashPacking::LowHigh);

        assert_eq!(as_sorted(&forward), as_sorted(&reversed));
        assert_eq!(as_sorted(&forward), as_sorted(&rotated));
    }

    #[test]
    fn test_first_write_wins() {
        // same hash, different casing: the first spelling is kept, not a collision
        let table = RainbowTable::build(["War3Map.j", "WAR3MAP.J"], HashPacking::LowHigh);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(content_hash("war3map.j")), Some("War3Map.j"));
        assert_eq!(table.collisions(), 0);

        let hash = content_hash("war3map.j");
        let table = RainbowTable::from_entries(
            HashPacking::LowHigh,
            vec![(hash, "first.txt".to_string()), (hash, "second.txt".to_string())],
        );
        assert_eq!(table.lookup(hash), Some("first.txt"));
        assert_eq!(table.collisions(), 1);
    }

    #[test]
    fn test_extend_keeps_existing() {
        let mut table = RainbowTable::build(["war3map.j"], HashPacking::HighLow);
        table.extend(["WAR3MAP.J", "war3map.lua"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(HashPacking::HighLow.hash("war3map.j")), Some("war3map.j"));
    }

    #[test]
    fn test_defaults_cover_core_files() {
        let table = RainbowTable::with_defaults(HashPacking::LowHigh);
        for name in ["war3map.j", "war3map.w3e", "war3map.wts", "(listfile)"] {
            assert_eq!(table.lookup(content_hash(name)), Some(name));
        }
    }
}
