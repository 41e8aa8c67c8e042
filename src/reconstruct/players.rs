use serde::{Deserialize, Serialize};

/// First editor version that lays out 24 player slots
pub const EXTENDED_SLOTS_EDITOR_VERSION: u32 = 6060;

pub const CLASSIC_PLAYER_SLOTS: i32 = 12;
pub const EXTENDED_PLAYER_SLOTS: i32 = 24;

/// Map metadata the reconstruction needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Editor version from the map info file, when known
    pub editor_version: Option<u32>,
}

impl MapInfo {
    pub fn new(editor_version: Option<u32>) -> Self {
        Self { editor_version }
    }

    /// Playable slot count; unknown versions are treated as current
    pub fn player_slots(&self) -> i32 {
        match self.editor_version {
            Some(version) if version < EXTENDED_SLOTS_EDITOR_VERSION => CLASSIC_PLAYER_SLOTS,
            _ => EXTENDED_PLAYER_SLOTS,
        }
    }

    /// Player index behind a neutral-player constant
    pub fn neutral_player(&self, constant: &str) -> Option<i32> {
        let offset = match constant {
            "PLAYER_NEUTRAL_AGGRESSIVE" => 0,
            "bj_PLAYER_NEUTRAL_VICTIM" => 1,
            "bj_PLAYER_NEUTRAL_EXTRA" => 2,
            "PLAYER_NEUTRAL_PASSIVE" => 3,
            _ => return None,
        };
        Some(self.player_slots() + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_convention() {
        assert_eq!(MapInfo::new(None).player_slots(), 24);
        assert_eq!(MapInfo::new(Some(6059)).player_slots(), 12);
        assert_eq!(MapInfo::new(Some(6060)).player_slots(), 24);
    }

    #[test]
    fn test_neutral_constants() {
        let classic = MapInfo::new(Some(6031));
        assert_eq!(classic.neutral_player("PLAYER_NEUTRAL_AGGRESSIVE"), Some(12));
        assert_eq!(classic.neutral_player("bj_PLAYER_NEUTRAL_VICTIM"), Some(13));
        assert_eq!(classic.neutral_player("bj_PLAYER_NEUTRAL_EXTRA"), Some(14));
        assert_eq!(classic.neutral_player("PLAYER_NEUTRAL_PASSIVE"), Some(15));

        let current = MapInfo::default();
        assert_eq!(current.neutral_player("PLAYER_NEUTRAL_AGGRESSIVE"), Some(24));
        assert_eq!(current.neutral_player("PLAYER_NEUTRAL_PASSIVE"), Some(27));
        assert_eq!(current.neutral_player("Player"), None);
    }
}
