//! Content classification for entries whose names stay unknown.
//!
//! Magic bytes are checked first, then text heuristics. The result only
//! picks a plausible extension for a placeholder name; it never registers
//! anything with the archive.

pub mod signatures;

use crate::sniff::signatures::{MAGIC_SIGNATURES, TEXT_SIGNATURES, TGA_FOOTER};

/// Formats commonly found inside map archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Mpq,
    Mdx,
    Mdl,
    Blp,
    Dds,
    Tga,
    Png,
    Jpeg,
    Wav,
    Mp3,
    Ogg,
    Flac,
    Zip,
    Environment,
    Doodads,
    Pathing,
    Jass,
    Lua,
    Fdf,
    Wts,
    Slk,
    Txt,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Mpq => "mpq",
            FileFormat::Mdx => "mdx",
            FileFormat::Mdl => "mdl",
            FileFormat::Blp => "blp",
            FileFormat::Dds => "dds",
            FileFormat::Tga => "tga",
            FileFormat::Png => "png",
            FileFormat::Jpeg => "jpg",
            FileFormat::Wav => "wav",
            FileFormat::Mp3 => "mp3",
            FileFormat::Ogg => "ogg",
            FileFormat::Flac => "flac",
            FileFormat::Zip => "zip",
            FileFormat::Environment => "w3e",
            FileFormat::Doodads => "doo",
            FileFormat::Pathing => "wpm",
            FileFormat::Jass => "j",
            FileFormat::Lua => "lua",
            FileFormat::Fdf => "fdf",
            FileFormat::Wts => "wts",
            FileFormat::Slk => "slk",
            FileFormat::Txt => "txt",
        }
    }
}

/// Classifies raw member content
pub trait FormatSniffer: Send + Sync {
    fn sniff(&self, data: &[u8]) -> Option<FileFormat>;
}

/// Magic-byte and text-pattern classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureSniffer;

impl FormatSniffer for SignatureSniffer {
    fn sniff(&self, data: &[u8]) -> Option<FileFormat> {
        sniff(data)
    }
}

/// Classify `data`, or `None` when nothing looks familiar
pub fn sniff(data: &[u8]) -> Option<FileFormat> {
    if data.is_empty() {
        return None;
    }

    for signature in MAGIC_SIGNATURES {
        let end = signature.offset + signature.magic.len();
        if data.len() >= end && &data[signature.offset..end] == signature.magic {
            return Some(signature.format);
        }
    }

    if data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0 {
        return Some(FileFormat::Mp3);
    }

    if data.ends_with(TGA_FOOTER) || looks_like_tga_header(data) {
        return Some(FileFormat::Tga);
    }

    if !is_text(data) {
        return None;
    }

    TEXT_SIGNATURES
        .iter()
        .find(|signature| signature.regex.is_match(data))
        .map(|signature| signature.format)
        .or(Some(FileFormat::Txt))
}

/// Uncompressed/RLE true-color or grayscale header without a color map
fn looks_like_tga_header(data: &[u8]) -> bool {
    if data.len() < 18 {
        return false;
    }
    let color_map_type = data[1];
    let image_type = data[2];
    let bits_per_pixel = data[16];
    let width = u16::from_le_bytes([data[12], data[13]]);
    let height = u16::from_le_bytes([data[14], data[15]]);

    color_map_type == 0
        && matches!(image_type, 2 | 3 | 10 | 11)
        && matches!(bits_per_pixel, 8 | 16 | 24 | 32)
        && width > 0
        && height > 0
        && data.len() >= 18 + data[0] as usize + width as usize * height as usize / 8
}

/// Printable, UTF-8 and not random-looking
fn is_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(64 * 1024)];
    let text = match std::str::from_utf8(sample) {
        Ok(text) => text,
        // a multi-byte sequence cut by the sample window
        Err(err) if err.error_len().is_none() => match std::str::from_utf8(&sample[..err.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    if text.is_empty() {
        return false;
    }

    let printable = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .count();
    let ratio = printable as f32 / text.chars().count() as f32;

    ratio >= 0.95 && shannon_entropy(sample) <= 6.5
}

/// Shannon entropy in bits per byte (0.0 - 8.0)
pub fn shannon_entropy(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    let mut histogram = [0u32; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }

    let total = data.len() as f32;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let probability = count as f32 / total;
            -probability * probability.log2()
        })
        .sum()
}
