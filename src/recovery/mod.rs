pub mod candidates;
pub mod engine;
pub mod rainbow;
pub mod report;

pub use candidates::{load_listfile, stems_of, CandidateGenerator};
pub use engine::{BruteForce, BruteForceOutcome, Discovery, Placeholder, RecoveryEngine};
pub use rainbow::RainbowTable;
pub use report::RecoveryReport;
