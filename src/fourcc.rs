//! Four-character codes.
//!
//! Script literals and binary object tables store the same four characters
//! with opposite byte order, and the script encoding carries into the next
//! more-significant byte whenever a byte is >= 0x80. Both quirks are part of
//! the on-disk formats and are reproduced exactly.

use log::warn;
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A 4-byte type/ability/item tag such as `hfoo`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FourCC([u8; 4]);

impl FourCC {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Build a code from text, never failing.
    ///
    /// Shorter input is null-padded and longer input truncated, both with a
    /// warning. The `tag:extra` shorthand (exactly nine characters with a
    /// colon at index 4) keeps its first four characters silently.
    pub fn parse(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut code = [0u8; 4];

        match bytes.len() {
            4 => code.copy_from_slice(bytes),
            9 if bytes[4] == b':' => code.copy_from_slice(&bytes[..4]),
            len if len < 4 => {
                warn!("FourCC '{}' is {} characters long, padding with nulls", text, len);
                code[..len].copy_from_slice(bytes);
            }
            len => {
                warn!("FourCC '{}' is {} characters long, truncating to 4", text, len);
                code.copy_from_slice(&bytes[..4]);
            }
        }

        Self(code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Decode a script-level integer literal (most significant byte first)
    pub fn from_raw_code(value: i32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Encode as a script-level integer literal
    pub fn to_raw_code(&self) -> i32 {
        pack_with_carry(self.0)
    }

    /// Decode a binary-table object id (least significant byte first)
    pub fn from_object_id(value: i32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Encode as a binary-table object id
    pub fn to_object_id(&self) -> i32 {
        let [a, b, c, d] = self.0;
        pack_with_carry([d, c, b, a])
    }
}

/// Packs bytes most-significant first. A byte >= 0x80 carries 1 into the
/// byte placed before it.
fn pack_with_carry(bytes: [u8; 4]) -> i32 {
    let mut acc: u32 = 0;
    for b in bytes {
        acc <<= 8;
        if b >= 0x80 {
            acc = acc.wrapping_add(0x100);
        }
        acc |= b as u32;
    }
    acc as i32
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({:?})", self.to_string())
    }
}

impl FromStr for FourCC {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for FourCC {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_code_known_values() {
        assert_eq!(FourCC::parse("hfoo").to_raw_code(), 0x6866_6F6F);
        assert_eq!(FourCC::from_raw_code(0x6866_6F6F).to_string(), "hfoo");
        assert_eq!(FourCC::parse("A000").to_raw_code(), 1_093_677_104);
    }

    #[test]
    fn test_object_id_is_byte_reversed() {
        let code = FourCC::parse("hfoo");
        assert_eq!(code.to_object_id(), 0x6F6F_6668);
        assert_eq!(FourCC::from_object_id(0x6F6F_6668), code);
        assert_eq!(code.to_object_id().swap_bytes(), code.to_raw_code());
    }

    #[test]
    fn test_round_trip_without_high_bytes() {
        let samples = [0, 1, 0x7F7F_7F7F, 0x4142_4344, 0x0000_7F00, 0x3031_3233, 0x7F00_0001];
        for value in samples {
            assert_eq!(FourCC::from_raw_code(value).to_raw_code(), value);
            assert_eq!(FourCC::from_object_id(value).to_object_id(), value);
        }
    }

    #[test]
    fn test_high_byte_carries_into_previous_byte() {
        let code = FourCC::new([0x41, 0x80, 0x30, 0x30]);
        assert_eq!(code.to_raw_code(), 0x4280_3030);
        // the decode side does not undo the carry
        assert_ne!(FourCC::from_raw_code(code.to_raw_code()), code);
    }

    #[test]
    fn test_parse_padding_and_truncation() {
        assert_eq!(FourCC::parse("ab").as_bytes(), &[b'a', b'b', 0, 0]);
        assert_eq!(FourCC::parse("").as_bytes(), &[0, 0, 0, 0]);
        assert_eq!(FourCC::parse("hfoo:hkni").to_string(), "hfoo");
        assert_eq!(FourCC::parse("toolong").to_string(), "tool");
    }

    #[test]
    fn test_serialize_as_string() {
        let json = serde_json::to_string(&FourCC::parse("LTlt")).unwrap();
        assert_eq!(json, "\"LTlt\"");
    }
}
