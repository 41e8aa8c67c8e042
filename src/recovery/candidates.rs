use std::fs;
use std::path::Path;

use crate::error::Result;

/// Member names every map archive may carry
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "(listfile)",
    "(signature)",
    "(attributes)",
    "war3map.j",
    "war3map.lua",
    "scripts\\war3map.j",
    "scripts\\war3map.lua",
    "Scripts\\common.j",
    "Scripts\\Blizzard.j",
    "Scripts\\common.ai",
    "war3map.w3e",
    "war3map.w3i",
    "war3map.wtg",
    "war3map.wct",
    "war3map.wts",
    "war3map.w3r",
    "war3map.w3c",
    "war3map.w3s",
    "war3map.w3u",
    "war3map.w3t",
    "war3map.w3a",
    "war3map.w3b",
    "war3map.w3d",
    "war3map.w3q",
    "war3map.w3h",
    "war3map.doo",
    "war3mapUnits.doo",
    "war3map.mmp",
    "war3map.shd",
    "war3map.wpm",
    "war3map.imp",
    "war3mapMap.blp",
    "war3mapMap.b00",
    "war3mapMap.tga",
    "war3mapPreview.tga",
    "war3mapPreview.blp",
    "war3mapMisc.txt",
    "war3mapSkin.txt",
    "war3mapExtra.txt",
    "war3mapSkin.w3u",
    "war3mapSkin.w3t",
    "war3mapSkin.w3a",
    "war3mapSkin.w3b",
    "war3mapSkin.w3d",
    "war3mapSkin.w3h",
    "war3mapSkin.w3q",
    "war3campaign.w3u",
    "war3campaign.w3t",
    "war3campaign.w3a",
    "war3campaign.w3b",
    "war3campaign.w3d",
    "war3campaign.w3h",
    "war3campaign.w3q",
    "war3campaign.w3f",
    "war3campaign.imp",
    "war3campaignSkin.txt",
    "war3campaignMisc.txt",
    "conversation.json",
    "UI\\TriggerData.txt",
    "UI\\TriggerStrings.txt",
    "UI\\WorldEditStrings.txt",
    "UI\\MiscData.txt",
    "UI\\SoundInfo\\AmbienceSounds.slk",
    "Units\\UnitData.slk",
    "Units\\UnitBalance.slk",
    "Units\\UnitAbilities.slk",
    "Units\\UnitUI.slk",
    "Units\\UnitWeapons.slk",
    "Units\\ItemData.slk",
    "Units\\AbilityData.slk",
    "Units\\UpgradeData.slk",
    "Units\\DestructableData.slk",
    "Doodads\\Doodads.slk",
    "Splats\\UberSplatData.slk",
    "TerrainArt\\Terrain.slk",
    "TerrainArt\\CliffTypes.slk",
    "TerrainArt\\Water.slk",
    "TerrainArt\\Weather.slk",
    "Units\\CommandFunc.txt",
    "Units\\CommandStrings.txt",
    "Units\\HumanUnitFunc.txt",
    "Units\\HumanUnitStrings.txt",
    "Units\\HumanAbilityFunc.txt",
    "Units\\HumanAbilityStrings.txt",
    "Units\\ItemFunc.txt",
    "Units\\ItemStrings.txt",
    "Units\\MiscGame.txt",
    "Units\\MiscData.txt",
];

/// Extensions tried by the default brute-force generator
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mdx", "mdl", "blp", "tga", "dds", "mp3", "wav", "flac", "txt", "slk", "j", "lua", "fdf", "toc", "ai",
];

/// Directory prefixes tried by the default brute-force generator
pub const DEFAULT_PREFIXES: &[&str] = &[
    "",
    "war3mapImported\\",
    "ReplaceableTextures\\CommandButtons\\",
    "ReplaceableTextures\\CommandButtonsDisabled\\",
    "ReplaceableTextures\\PassiveButtons\\",
    "Textures\\",
    "Sound\\",
    "Sound\\Music\\mp3Music\\",
    "UI\\",
    "UI\\Widgets\\",
    "Units\\",
    "Doodads\\",
    "Abilities\\Spells\\",
];

/// Read candidate names, one per line. Blank lines and lines starting with
/// `;` or `#` are skipped.
pub fn load_listfile<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let data = fs::read(path.as_ref())?;
    let text = String::from_utf8_lossy(&data);

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Bare file stems of `names`, deduplicated case-insensitively
pub fn stems_of<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = ahash::AHashSet::new();
    let mut stems = Vec::new();

    for name in names {
        let file = name.rsplit(|c: char| c == '\\' || c == '/').next().unwrap_or(name);
        let stem = match file.rfind('.') {
            Some(dot) if dot > 0 => &file[..dot],
            _ => file,
        };
        if !stem.is_empty() && seen.insert(stem.to_ascii_uppercase()) {
            stems.push(stem.to_string());
        }
    }

    stems
}

/// Lazily enumerates `prefix + stem + "." + extension` for every combination
#[derive(Debug, Clone, Default)]
pub struct CandidateGenerator {
    pub prefixes: Vec<String>,
    pub stems: Vec<String>,
    pub extensions: Vec<String>,
}

impl CandidateGenerator {
    pub fn new(prefixes: Vec<String>, stems: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            prefixes,
            stems,
            extensions,
        }
    }

    /// Default prefixes and extensions over the given stems
    pub fn with_stems(stems: Vec<String>) -> Self {
        Self::new(
            DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
            stems,
            DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Number of candidates the generator yields
    pub fn len(&self) -> usize {
        self.prefixes.len() * self.stems.len() * self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = String> + '_ {
        self.prefixes.iter().flat_map(move |prefix| {
            self.stems.iter().flat_map(move |stem| {
                self.extensions
                    .iter()
                    .map(move |extension| format!("{prefix}{stem}.{extension}"))
            })
        })
    }
}
