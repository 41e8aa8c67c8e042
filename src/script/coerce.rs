//! Literal coercion.
//!
//! A node is rendered to text, unwrapped, and parsed into the requested
//! target. FourCC looks at the literal kind instead, since a quoted tag may
//! be all digits. Any failure is an absent value, never an error.

use std::borrow::Cow;

use crate::fourcc::FourCC;
use crate::script::node::{NodeData, NodeId};
use crate::script::tree::ScriptTree;

/// A number parsed from script text before it is narrowed to a target type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i128),
    Float(f64),
}

impl Numeric {
    /// Decimal first, then `0x` hexadecimal
    pub fn parse(text: &str) -> Option<Self> {
        let text = strip_parentheses(text.trim()).trim();
        if text.is_empty() {
            return None;
        }

        if let Ok(value) = text.parse::<i128>() {
            return Some(Numeric::Integer(value));
        }
        if let Ok(value) = text.parse::<f64>() {
            // reject "inf", "NaN" and friends
            return value.is_finite().then_some(Numeric::Float(value));
        }

        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let digits = unsigned
            .strip_prefix("0x")
            .or_else(|| unsigned.strip_prefix("0X"))?;
        let value = i128::from_str_radix(digits, 16).ok()?;
        Some(Numeric::Integer(if negative { -value } else { value }))
    }
}

/// Types a literal can be coerced into
pub trait LiteralTarget: Sized {
    fn from_literal(text: &str) -> Option<Self>;

    /// Coerce a tree node; the default goes through [`ScriptTree::literal_text`]
    fn from_node(tree: &ScriptTree, id: NodeId) -> Option<Self> {
        Self::from_literal(&tree.literal_text(id))
    }
}

macro_rules! integer_target {
    ($($ty:ty),*) => {
        $(
            impl LiteralTarget for $ty {
                fn from_literal(text: &str) -> Option<Self> {
                    Some(match Numeric::parse(text)? {
                        Numeric::Integer(value) => <$ty>::try_from(value)
                            .unwrap_or(if value < 0 { <$ty>::MIN } else { <$ty>::MAX }),
                        // float to int `as` saturates
                        Numeric::Float(value) => value as $ty,
                    })
                }
            }
        )*
    };
}

integer_target!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl LiteralTarget for f64 {
    fn from_literal(text: &str) -> Option<Self> {
        Some(match Numeric::parse(text)? {
            Numeric::Integer(value) => value as f64,
            Numeric::Float(value) => value,
        })
    }
}

impl LiteralTarget for f32 {
    fn from_literal(text: &str) -> Option<Self> {
        let value = f64::from_literal(text)?;
        Some(value.clamp(f32::MIN as f64, f32::MAX as f64) as f32)
    }
}

impl LiteralTarget for bool {
    fn from_literal(text: &str) -> Option<Self> {
        match text.trim() {
            "true" => Some(true),
            "false" => Some(false),
            other => match Numeric::parse(other)? {
                Numeric::Integer(value) => Some(value != 0),
                Numeric::Float(value) => Some(value != 0.0),
            },
        }
    }
}

impl LiteralTarget for String {
    fn from_literal(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

/// String literals hold the four characters, so `"1234"` is the tag `1234`.
/// Numbers use the script encoding.
impl LiteralTarget for FourCC {
    /// Bare text has no quotes to tell a tag from a code: integers win
    fn from_literal(text: &str) -> Option<Self> {
        match i32::from_literal(text) {
            Some(code) => Some(FourCC::from_raw_code(code)),
            None if !text.is_empty() => Some(FourCC::parse(text)),
            None => None,
        }
    }

    fn from_node(tree: &ScriptTree, id: NodeId) -> Option<Self> {
        match tree.data(id) {
            NodeData::StringLiteral { raw } => {
                let text = unquote(raw);
                (!text.is_empty()).then(|| FourCC::parse(&text))
            }
            _ => i32::from_node(tree, id).map(FourCC::from_raw_code),
        }
    }
}

/// `nil` is a present-but-empty value; anything else defers to `T`
impl<T: LiteralTarget> LiteralTarget for Option<T> {
    fn from_literal(text: &str) -> Option<Self> {
        if text.trim() == "nil" {
            return Some(None);
        }
        T::from_literal(text).map(Some)
    }

    fn from_node(tree: &ScriptTree, id: NodeId) -> Option<Self> {
        if matches!(tree.data(id), NodeData::NilLiteral) {
            return Some(None);
        }
        T::from_node(tree, id).map(Some)
    }
}

impl ScriptTree {
    /// Text a literal coerces from: strings unquoted, booleans as `1`/`0`,
    /// anything else rendered
    pub fn literal_text(&self, id: NodeId) -> Cow<'_, str> {
        match self.data(id) {
            NodeData::StringLiteral { raw } => Cow::Owned(unquote(raw)),
            NodeData::NumericLiteral { raw } => Cow::Borrowed(raw.as_str()),
            NodeData::BooleanLiteral { value } => Cow::Borrowed(if *value { "1" } else { "0" }),
            _ => Cow::Owned(self.render(id)),
        }
    }

    /// Coerce the node into `T`, or `None` when it does not hold one
    pub fn try_get_value<T: LiteralTarget>(&self, id: NodeId) -> Option<T> {
        T::from_node(self, id)
    }
}

/// Peel parentheses that wrap the whole text
pub fn strip_parentheses(mut text: &str) -> &str {
    while text.starts_with('(') && text.ends_with(')') && wraps_whole(text) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// Whether the opening parenthesis at 0 closes at the last byte
fn wraps_whole(text: &str) -> bool {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Strip matching quotes and resolve simple escapes
pub fn unquote(raw: &str) -> String {
    let inner = match raw.as_bytes() {
        [first, .., last] if first == last && matches!(*first, b'"' | b'\'') => &raw[1..raw.len() - 1],
        _ => raw,
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::raw::RawNode;

    fn tree(raw: RawNode) -> ScriptTree {
        ScriptTree::from_raw(&raw).unwrap()
    }

    fn value<T: LiteralTarget>(raw: RawNode) -> Option<T> {
        let tree = tree(raw);
        tree.try_get_value::<T>(tree.root())
    }

    #[test]
    fn test_decimal_and_hex() {
        assert_eq!(value::<i32>(RawNode::number("42")), Some(42));
        assert_eq!(value::<i32>(RawNode::number("0x1F")), Some(31));
        assert_eq!(value::<i32>(RawNode::number("-0x10")), Some(-16));
        assert_eq!(value::<f32>(RawNode::number("1.5")), Some(1.5));
        assert_eq!(value::<i32>(RawNode::number("1F")), None);
        assert_eq!(value::<f64>(RawNode::number("inf")), None);
    }

    #[test]
    fn test_saturating_casts() {
        assert_eq!(value::<u8>(RawNode::number("300")), Some(u8::MAX));
        assert_eq!(value::<u8>(RawNode::number("-5")), Some(0));
        assert_eq!(value::<i8>(RawNode::number("-1000")), Some(i8::MIN));
        assert_eq!(value::<i32>(RawNode::number("1e20")), Some(i32::MAX));
        assert_eq!(value::<i32>(RawNode::number("99.9")), Some(99));
        assert_eq!(value::<f32>(RawNode::number("1e300")), Some(f32::MAX));
    }

    #[test]
    fn test_unary_and_parentheses() {
        let negative = RawNode::unary("-", RawNode::number("64.0"));
        assert_eq!(value::<f32>(negative), Some(-64.0));

        let wrapped = RawNode::parenthesized(RawNode::parenthesized(RawNode::number("7")));
        assert_eq!(value::<i32>(wrapped), Some(7));

        assert_eq!(strip_parentheses("(1) + (2)"), "(1) + (2)");
        assert_eq!(value::<i32>(RawNode::binary("+", RawNode::number("1"), RawNode::number("2"))), None);
    }

    #[test]
    fn test_strings_and_booleans() {
        assert_eq!(value::<String>(RawNode::string("Sound\\Music\\x.mp3")).as_deref(), Some("Sound\\Music\\x.mp3"));
        assert_eq!(value::<i32>(RawNode::string("12")), Some(12));
        assert_eq!(value::<bool>(RawNode::boolean(true)), Some(true));
        assert_eq!(value::<i32>(RawNode::boolean(false)), Some(0));
        assert_eq!(value::<bool>(RawNode::identifier("x")), None);
    }

    #[test]
    fn test_optional_targets_wrap() {
        assert_eq!(value::<Option<i32>>(RawNode::number("5")), Some(Some(5)));
        assert_eq!(value::<Option<i32>>(RawNode::nil()), Some(None));
        assert_eq!(value::<Option<i32>>(RawNode::identifier("bj_lastCreatedUnit")), None);
    }

    #[test]
    fn test_fourcc_target() {
        assert_eq!(value::<FourCC>(RawNode::string("hfoo")), Some(FourCC::parse("hfoo")));
        assert_eq!(value::<FourCC>(RawNode::number("1751543663")), Some(FourCC::parse("hfoo")));
        assert_eq!(value::<FourCC>(RawNode::string("")), None);
        assert_eq!(value::<FourCC>(RawNode::identifier("x")), None);
    }

    #[test]
    fn test_quoted_digit_tags_stay_text() {
        assert_eq!(value::<FourCC>(RawNode::string("1234")), Some(FourCC::parse("1234")));
        assert_eq!(value::<FourCC>(RawNode::string("0x10")), Some(FourCC::parse("0x10")));
        assert_eq!(value::<FourCC>(RawNode::number("1234")), Some(FourCC::from_raw_code(1234)));
        assert_eq!(value::<Option<FourCC>>(RawNode::string("1234")), Some(Some(FourCC::parse("1234"))));
        assert_eq!(value::<Option<FourCC>>(RawNode::nil()), Some(None));
        assert_eq!(FourCC::parse("1234").as_bytes(), b"1234");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"a\\\"b\\\\c\""), "a\"b\\c");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\""), "\"");
    }
}
