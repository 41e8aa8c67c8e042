use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::FileFormat;

/// Leading magic bytes
pub struct MagicSignature {
    pub format: FileFormat,
    pub offset: usize,
    pub magic: &'static [u8],
}

/// Text content pattern
pub struct TextSignature {
    pub format: FileFormat,
    pub regex: Regex,
}

pub const MAGIC_SIGNATURES: &[MagicSignature] = &[
    MagicSignature { format: FileFormat::Mpq, offset: 0, magic: b"MPQ\x1A" },
    MagicSignature { format: FileFormat::Mdx, offset: 0, magic: b"MDLX" },
    MagicSignature { format: FileFormat::Blp, offset: 0, magic: b"BLP1" },
    MagicSignature { format: FileFormat::Blp, offset: 0, magic: b"BLP2" },
    MagicSignature { format: FileFormat::Dds, offset: 0, magic: b"DDS " },
    MagicSignature { format: FileFormat::Png, offset: 0, magic: b"\x89PNG\r\n\x1A\n" },
    MagicSignature { format: FileFormat::Jpeg, offset: 0, magic: b"\xFF\xD8\xFF" },
    MagicSignature { format: FileFormat::Wav, offset: 8, magic: b"WAVE" },
    MagicSignature { format: FileFormat::Mp3, offset: 0, magic: b"ID3" },
    MagicSignature { format: FileFormat::Ogg, offset: 0, magic: b"OggS" },
    MagicSignature { format: FileFormat::Flac, offset: 0, magic: b"fLaC" },
    MagicSignature { format: FileFormat::Zip, offset: 0, magic: b"PK\x03\x04" },
    MagicSignature { format: FileFormat::Environment, offset: 0, magic: b"W3E!" },
    MagicSignature { format: FileFormat::Doodads, offset: 0, magic: b"W3do" },
    MagicSignature { format: FileFormat::Pathing, offset: 0, magic: b"MP3W" },
];

/// Footer written by most TGA encoders
pub const TGA_FOOTER: &[u8] = b"TRUEVISION-XFILE.\0";

lazy_static! {
    /// Checked in order; the first match wins
    pub static ref TEXT_SIGNATURES: Vec<TextSignature> = {
        let patterns = vec![
            (FileFormat::Jass, r"(?m)^\s*(?:constant\s+)?function\s+\w+\s+takes\s"),
            (FileFormat::Lua, r"(?m)^\s*(?:local\s+)?function\s+[\w.:]+\s*\("),
            (FileFormat::Mdl, r#"(?m)^\s*(?:Version\s*\{|Model\s+"[^"]*"\s*\{)"#),
            (FileFormat::Fdf, r#"(?m)^\s*Frame\s+"\w+"\s+"#),
            (FileFormat::Wts, r"(?m)^STRING\s+\d+\s*$"),
            (FileFormat::Slk, r"\AID;P"),
            (FileFormat::Txt, r"(?m)^\[[^\]\r\n]+\]\s*$"),
        ];

        patterns
            .into_iter()
            .filter_map(|(format, pattern)| match Regex::new(pattern) {
                Ok(regex) => Some(TextSignature { format, regex }),
                Err(err) => {
                    log::error!("Invalid text signature for {:?}: {}", format, err);
                    None
                }
            })
            .collect()
    };
}
