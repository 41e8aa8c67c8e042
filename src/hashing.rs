//! Legacy archive name hashing.
//!
//! Archive members are indexed by a 64-bit content hash derived from the
//! uppercased member name. Two 32-bit accumulators ("left" and "right") run
//! the classic crypt-table recurrence over the same input and are packed
//! into one `u64`. Producers disagree on which half goes where, so both
//! packings are kept.
//!
//! Case folding is byte-wise and ASCII-only, matching the legacy uppercase
//! table: `hash(s) == hash(s.to_ascii_uppercase())` for every `s`, while
//! non-ASCII letters such as `ü`/`Ü` hash as distinct bytes.

use crate::types::ContentHash;

const CRYPT_TABLE_SIZE: usize = 0x500;
const CRYPT_TABLE_SEED: u32 = 0x0010_0001;

/// Initial accumulator value
pub const HASH_SEED: u32 = 0x7FED_7FED;
/// Initial per-character secondary seed
pub const CHAR_SEED: u32 = 0xEEEE_EEEE;

const LEFT_OFFSET: usize = 0x100;
const RIGHT_OFFSET: usize = 0x200;

static CRYPT_TABLE: [u32; CRYPT_TABLE_SIZE] = build_crypt_table();

const fn build_crypt_table() -> [u32; CRYPT_TABLE_SIZE] {
    let mut table = [0u32; CRYPT_TABLE_SIZE];
    let mut seed = CRYPT_TABLE_SEED;
    let mut index1 = 0;

    while index1 < 0x100 {
        let mut index2 = index1;
        let mut i = 0;
        while i < 5 {
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let high = (seed & 0xFFFF) << 0x10;
            seed = (seed * 125 + 3) % 0x2A_AAAB;
            let low = seed & 0xFFFF;
            table[index2] = high | low;
            index2 += 0x100;
            i += 1;
        }
        index1 += 1;
    }

    table
}

/// Table region selecting one of the independent 32-bit hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    TableOffset,
    NameA,
    NameB,
    FileKey,
}

impl HashType {
    fn offset(self) -> usize {
        match self {
            HashType::TableOffset => 0x000,
            HashType::NameA => 0x100,
            HashType::NameB => 0x200,
            HashType::FileKey => 0x300,
        }
    }
}

/// One accumulator of the rolling recurrence
#[derive(Clone, Copy)]
struct Accumulator {
    offset: usize,
    value: u32,
    seed: u32,
}

impl Accumulator {
    #[inline]
    fn new(offset: usize) -> Self {
        Self {
            offset,
            value: HASH_SEED,
            seed: CHAR_SEED,
        }
    }

    #[inline]
    fn step(&mut self, ch: u8) {
        let ch = ch.to_ascii_uppercase();
        self.value = CRYPT_TABLE[self.offset + ch as usize] ^ self.value.wrapping_add(self.seed);
        self.seed = (ch as u32)
            .wrapping_add(self.value)
            .wrapping_add(self.seed)
            .wrapping_add(self.seed << 5)
            .wrapping_add(3);
    }
}

/// Hash `text` with a single table region
pub fn hash_string(text: &str, hash_type: HashType) -> u32 {
    let mut acc = Accumulator::new(hash_type.offset());
    for &b in text.as_bytes() {
        acc.step(b);
    }
    acc.value
}

/// Run the left and right accumulators over `text` in one pass
#[inline]
pub fn hash_pair(text: &str) -> (u32, u32) {
    let mut left = Accumulator::new(LEFT_OFFSET);
    let mut right = Accumulator::new(RIGHT_OFFSET);
    for &b in text.as_bytes() {
        left.step(b);
        right.step(b);
    }
    (left.value, right.value)
}

/// How the two 32-bit halves are packed into a [`ContentHash`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum HashPacking {
    /// `left | right << 32`
    #[default]
    LowHigh,
    /// `left << 32 | right`
    HighLow,
}

impl HashPacking {
    #[inline]
    pub fn combine(self, left: u32, right: u32) -> ContentHash {
        let value = match self {
            HashPacking::LowHigh => left as u64 | (right as u64) << 32,
            HashPacking::HighLow => (left as u64) << 32 | right as u64,
        };
        ContentHash(value)
    }

    #[inline]
    pub fn hash(self, text: &str) -> ContentHash {
        let (left, right) = hash_pair(text);
        self.combine(left, right)
    }
}

/// Content hash with the `LowHigh` packing
pub fn content_hash(text: &str) -> ContentHash {
    HashPacking::LowHigh.hash(text)
}

/// Content hash with the `HighLow` packing
pub fn content_hash_high_low(text: &str) -> ContentHash {
    HashPacking::HighLow.hash(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypt_table_known_entries() {
        // first entries of the standard table
        assert_eq!(CRYPT_TABLE[0], 0x55C6_36E2);
        assert_eq!(CRYPT_TABLE[1], 0x02BE_0170);
    }

    #[test]
    fn test_reference_vectors() {
        assert_eq!(hash_string("(listfile)", HashType::TableOffset), 0x5F3D_E859);
        assert_eq!(hash_string("(listfile)", HashType::NameA), 0xFD65_7910);
        assert_eq!(hash_string("(listfile)", HashType::NameB), 0x4E9B_98A7);
        assert_eq!(hash_string("(hash table)", HashType::FileKey), 0xC3AF_3770);
        assert_eq!(hash_string("(block table)", HashType::FileKey), 0xEC83_B3A3);
    }

    #[test]
    fn test_packings() {
        assert_eq!(content_hash("(listfile)"), ContentHash(0x4E9B_98A7_FD65_7910));
        assert_eq!(content_hash_high_low("(listfile)"), ContentHash(0xFD65_7910_4E9B_98A7));
        assert_eq!(content_hash("war3map.j"), ContentHash(0x95B8_144E_C997_07E7));
        assert_eq!(
            content_hash("Units\\human\\Footman\\Footman.mdx"),
            ContentHash(0x886F_27A1_E60B_F3CC)
        );
    }

    #[test]
    fn test_case_insensitive() {
        for name in ["war3map.j", "War3Map.W3E", "abc\\DEF.mdx", "(attributes)"] {
            assert_eq!(content_hash(name), content_hash(&name.to_uppercase()));
            assert_eq!(content_hash_high_low(name), content_hash_high_low(&name.to_lowercase()));
        }
    }

    #[test]
    fn test_empty_string_is_seed() {
        assert_eq!(hash_pair(""), (HASH_SEED, HASH_SEED));
    }

    #[test]
    fn test_case_folding_is_ascii_only() {
        let a = content_hash("Sounds\\Ünïcode.wav");
        let b = content_hash("sounds\\Ünïcode.WAV");
        assert_eq!(a, b);

        let name = "sounds\\ümlaut.wav";
        assert_eq!(content_hash(name), content_hash(&name.to_ascii_uppercase()));
        assert_ne!(content_hash(name), content_hash(&name.to_uppercase()));
    }
}
