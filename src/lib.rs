//! Recovery of information stripped from protected game-map archives.
//!
//! Two independent subsystems:
//! - Name recovery: MPQ-style string hashing, a rainbow table of known
//!   names, fuzzy content fingerprints and a cancellable brute-force stage
//!   that propose names for archive members known only by content hash.
//!   Every proposal is re-hashed before the archive accepts it.
//! - Object reconstruction: a typed tree over decompiled map script, a
//!   literal coercion layer and a pattern engine that turns recognized
//!   constructor/setter calls back into region, camera, sound, unit and
//!   doodad records.

pub mod archive;
pub mod cli;
pub mod error;
pub mod fourcc;
pub mod fuzzy;
pub mod hashing;
pub mod reconstruct;
pub mod recovery;
pub mod script;
pub mod sniff;
pub mod types;

// Re-export commonly used types
pub use archive::{Archive, ArchiveEntry, EntryState, MemoryArchive};
pub use error::{RecoveryError, Result};
pub use fourcc::FourCC;
pub use fuzzy::{similarity, FuzzyHash, ReferenceLibrary};
pub use hashing::{content_hash, content_hash_high_low, hash_string, HashPacking, HashType};
pub use reconstruct::{MapInfo, ReconstructedObjects, StatementPatternEngine};
pub use recovery::{BruteForce, RainbowTable, RecoveryEngine, RecoveryReport};
pub use script::{NodeId, NodeKind, ScriptTree};
pub use sniff::{sniff, FileFormat, FormatSniffer, SignatureSniffer};
pub use types::{CancellationFlag, ContentHash, RecoveryConfig, RecoveryProgress, RecoveryStats};
