//! Editor object records rebuilt from script.
//!
//! Setter-driven fields are `Option`s: `None` means the script never set
//! them, and the serializer falls back to editor defaults.

use serde::Serialize;
use strum::{EnumCount, EnumIter};

use crate::fourcc::FourCC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIter, EnumCount, strum::Display)]
pub enum RecordKind {
    Region,
    Camera,
    Sound,
    Unit,
    Doodad,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Region {
    pub creation_number: u32,
    pub name: String,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
    pub weather_effect: Option<FourCC>,
    /// Variable name of the ambient sound registered over this region
    pub ambient_sound: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Camera {
    pub creation_number: u32,
    pub name: String,
    pub target_x: f32,
    pub target_y: f32,
    pub z_offset: f32,
    pub rotation: f32,
    pub angle_of_attack: f32,
    pub distance: f32,
    pub roll: f32,
    pub field_of_view: f32,
    pub far_z: f32,
    pub near_z: f32,
    pub local_pitch: f32,
    pub local_yaw: f32,
    pub local_roll: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sound {
    pub creation_number: u32,
    pub name: String,
    pub file_path: String,
    pub looping: bool,
    pub is_3d: bool,
    pub stop_when_out_of_range: bool,
    pub fade_in_rate: i32,
    pub fade_out_rate: i32,
    pub eax_setting: String,
    pub label: Option<String>,
    pub duration: Option<i32>,
    pub channel: Option<i32>,
    pub volume: Option<i32>,
    pub pitch: Option<f32>,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub distance_cutoff: Option<f32>,
    pub cone_inside: Option<f32>,
    pub cone_outside: Option<f32>,
    pub cone_outside_volume: Option<i32>,
    pub cone_orientation: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub slot: i32,
    pub item: FourCC,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Unit {
    pub creation_number: u32,
    /// Global the unit was stored in, e.g. `gg_unit_hfoo_0001`
    pub variable: Option<String>,
    pub type_id: FourCC,
    pub skin_id: Option<FourCC>,
    pub owner: i32,
    pub x: f32,
    pub y: f32,
    pub facing: f32,
    pub life: Option<f32>,
    /// Fraction of maximum life, from `SetUnitState(u, UNIT_STATE_LIFE, f * life)`
    pub life_fraction: Option<f32>,
    pub mana: Option<f32>,
    pub resource_amount: Option<i32>,
    pub acquire_range: Option<f32>,
    pub color: Option<i32>,
    pub hero_level: Option<i32>,
    pub hero_strength: Option<i32>,
    pub hero_agility: Option<i32>,
    pub hero_intelligence: Option<i32>,
    pub items: Vec<InventoryItem>,
    pub skills: Vec<FourCC>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Doodad {
    pub creation_number: u32,
    pub variable: Option<String>,
    pub type_id: FourCC,
    pub skin_id: Option<FourCC>,
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub facing: f32,
    pub scale: f32,
    pub variation: i32,
    pub life: Option<f32>,
    pub life_fraction: Option<f32>,
    pub invulnerable: bool,
}

/// One entry of the context's record arena
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectRecord {
    Region(Region),
    Camera(Camera),
    Sound(Sound),
    Unit(Unit),
    Doodad(Doodad),
}

impl ObjectRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ObjectRecord::Region(_) => RecordKind::Region,
            ObjectRecord::Camera(_) => RecordKind::Camera,
            ObjectRecord::Sound(_) => RecordKind::Sound,
            ObjectRecord::Unit(_) => RecordKind::Unit,
            ObjectRecord::Doodad(_) => RecordKind::Doodad,
        }
    }
}

/// Typed access into [`ObjectRecord`]
pub trait Record: Sized {
    const KIND: RecordKind;

    fn wrap(self) -> ObjectRecord;
    fn view(record: &ObjectRecord) -> Option<&Self>;
    fn view_mut(record: &mut ObjectRecord) -> Option<&mut Self>;
    fn set_creation_number(&mut self, number: u32);
}

macro_rules! record {
    ($ty:ident) => {
        impl Record for $ty {
            const KIND: RecordKind = RecordKind::$ty;

            fn wrap(self) -> ObjectRecord {
                ObjectRecord::$ty(self)
            }

            fn view(record: &ObjectRecord) -> Option<&Self> {
                match record {
                    ObjectRecord::$ty(inner) => Some(inner),
                    _ => None,
                }
            }

            fn view_mut(record: &mut ObjectRecord) -> Option<&mut Self> {
                match record {
                    ObjectRecord::$ty(inner) => Some(inner),
                    _ => None,
                }
            }

            fn set_creation_number(&mut self, number: u32) {
                self.creation_number = number;
            }
        }
    };
}

record!(Region);
record!(Camera);
record!(Sound);
record!(Unit);
record!(Doodad);

/// Output of one reconstruction pass, each list in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconstructedObjects {
    pub regions: Vec<Region>,
    pub cameras: Vec<Camera>,
    pub sounds: Vec<Sound>,
    pub units: Vec<Unit>,
    pub doodads: Vec<Doodad>,
}

impl ReconstructedObjects {
    pub fn from_records(records: Vec<ObjectRecord>) -> Self {
        let mut objects = Self::default();
        for record in records {
            match record {
                ObjectRecord::Region(region) => objects.regions.push(region),
                ObjectRecord::Camera(camera) => objects.cameras.push(camera),
                ObjectRecord::Sound(sound) => objects.sounds.push(sound),
                ObjectRecord::Unit(unit) => objects.units.push(unit),
                ObjectRecord::Doodad(doodad) => objects.doodads.push(doodad),
            }
        }
        objects
    }

    pub fn len(&self) -> usize {
        self.regions.len() + self.cameras.len() + self.sounds.len() + self.units.len() + self.doodads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_views() {
        let mut record = Region {
            name: "Spawn".to_string(),
            ..Default::default()
        }
        .wrap();
        assert_eq!(record.kind(), RecordKind::Region);
        assert!(Camera::view(&record).is_none());

        Region::view_mut(&mut record).unwrap().set_creation_number(3);
        assert_eq!(Region::view(&record).map(|region| region.creation_number), Some(3));
    }

    #[test]
    fn test_grouping_keeps_order() {
        let records = vec![
            Unit::default().wrap(),
            Region {
                name: "A".to_string(),
                ..Default::default()
            }
            .wrap(),
            Region {
                name: "B".to_string(),
                ..Default::default()
            }
            .wrap(),
        ];
        let objects = ReconstructedObjects::from_records(records);
        assert_eq!(objects.len(), 3);
        let names: Vec<&str> = objects.regions.iter().map(|region| region.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let json = objects.to_json().unwrap();
        assert!(json.contains("\"regions\""));
    }
}
