//! Rebuilds editor object records from a decompiled map script.
//!
//! [`StatementPatternEngine`] flattens the statements reachable from the
//! map's entry points and offers each one to a list of pattern handlers.
//! Handlers that recognize a constructor or setter call create or update
//! records in a [`ReconstructionContext`].

pub mod context;
pub mod engine;
pub mod handlers;
pub mod players;
pub mod records;

pub use context::ReconstructionContext;
pub use engine::{flatten, PassStats, StatementPatternEngine, ENTRY_POINTS};
pub use handlers::{default_handlers, Handler, HandlerFn};
pub use players::MapInfo;
pub use records::{
    Camera, Doodad, InventoryItem, ObjectRecord, ReconstructedObjects, Record, RecordKind, Region, Sound, Unit,
};
