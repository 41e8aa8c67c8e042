use ahash::{AHashMap, AHashSet};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use crate::archive::Archive;
use crate::error::Result;
use crate::fuzzy::{FuzzyHash, ReferenceLibrary};
use crate::recovery::rainbow::RainbowTable;
use crate::recovery::report::RecoveryReport;
use crate::sniff::{FormatSniffer, SignatureSniffer};
use crate::types::{
    CancellationFlag, ContentHash, DiscoverySource, RecoveryConfig, RecoveryPhase, RecoveryProgress,
    RecoveryStats,
};

/// Extension used when nothing about the content is recognisable
pub const UNKNOWN_EXTENSION: &str = "bin";

/// A verified, registered name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub hash: ContentHash,
    pub name: String,
    pub source: DiscoverySource,
}

/// Synthetic extraction name for an entry that stays unknown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub hash: ContentHash,
    pub name: String,
}

/// Outcome of a brute-force run
#[derive(Debug, Clone, Default)]
pub struct BruteForceOutcome {
    pub tested: u64,
    pub discoveries: Vec<Discovery>,
    pub cancelled: bool,
}

/// Opt-in brute-force stage for [`RecoveryEngine::recover`]
pub struct BruteForce<'a> {
    pub candidates: Box<dyn Iterator<Item = String> + 'a>,
    pub cancel: CancellationFlag,
}

impl<'a> BruteForce<'a> {
    pub fn new<I>(candidates: I, cancel: CancellationFlag) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        Self {
            candidates: Box::new(candidates.into_iter()),
            cancel,
        }
    }
}

/// Proposes names for unknown archive members.
///
/// Every proposal goes through one integrity gate: the candidate is hashed
/// again with the archive's packing and must equal the target hash before
/// the archive is asked to register it. Registration is monotonic.
pub struct RecoveryEngine {
    config: RecoveryConfig,
    table: RainbowTable,
    references: Option<ReferenceLibrary>,
    sniffer: Box<dyn FormatSniffer>,
}

impl RecoveryEngine {
    pub fn new(config: RecoveryConfig, table: RainbowTable) -> Self {
        if config.num_threads > 0 {
            let _ = rayon::ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .build_global();
        }

        Self {
            config,
            table,
            references: None,
            sniffer: Box::new(SignatureSniffer),
        }
    }

    pub fn with_references(mut self, references: ReferenceLibrary) -> Self {
        self.references = Some(references);
        self
    }

    pub fn with_sniffer(mut self, sniffer: Box<dyn FormatSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn table(&self) -> &RainbowTable {
        &self.table
    }

    /// Run every enabled stage and summarise the result
    pub fn recover<A: Archive>(
        &self,
        archive: &mut A,
        brute_force: Option<BruteForce<'_>>,
        progress: Option<&Sender<RecoveryProgress>>,
    ) -> Result<RecoveryReport> {
        let mut stats = RecoveryStats::new();
        stats.total_unknown = archive.unknown_hashes().len();
        info!("Recovering names for {} unknown entries", stats.total_unknown);

        let mut discoveries = self.dictionary_probe(archive, &mut stats, progress);
        let (reference_hits, hints) = self.reference_match(archive, &mut stats, progress)?;
        discoveries.extend(reference_hits);

        if let Some(brute_force) = brute_force {
            let outcome = self.brute_force(archive, brute_force.candidates, &brute_force.cancel, progress);
            stats.candidates_tested = outcome.tested;
            stats.brute_force_hits = outcome.discoveries.len();
            discoveries.extend(outcome.discoveries);
        }

        let placeholders = if self.config.sniff_placeholders {
            self.assign_placeholders(archive, &hints, progress)
        } else {
            Vec::new()
        };
        stats.placeholders = placeholders.len();

        info!(
            "Recovered {} of {} names ({:.1}%), {} placeholders",
            stats.discovered(),
            stats.total_unknown,
            stats.completion_percentage(),
            stats.placeholders
        );

        Ok(RecoveryReport::build(archive, stats, discoveries, placeholders))
    }

    /// Look every unknown hash up in the rainbow table
    pub fn dictionary_probe<A: Archive>(
        &self,
        archive: &mut A,
        stats: &mut RecoveryStats,
        progress: Option<&Sender<RecoveryProgress>>,
    ) -> Vec<Discovery> {
        let unknown = archive.unknown_hashes();
        notify(progress, RecoveryProgress::PhaseStarted(RecoveryPhase::DictionaryProbe, unknown.len()));

        if self.table.packing() != archive.packing() {
            warn!(
                "Rainbow table uses {:?} packing but the archive uses {:?}; expect few hits",
                self.table.packing(),
                archive.packing()
            );
        }

        let mut discoveries = Vec::new();
        for hash in unknown {
            let Some(name) = self.table.lookup(hash) else {
                continue;
            };
            if register(archive, hash, name) {
                discoveries.push(self.discovered(hash, name, DiscoverySource::Dictionary, progress));
            } else {
                stats.rejected_candidates += 1;
            }
        }

        stats.dictionary_hits = discoveries.len();
        discoveries
    }

    /// Match unknown content against the reference library.
    ///
    /// Returns verified discoveries plus, for matches whose name does not
    /// hash to the entry, the reference's extension as a placeholder hint.
    pub fn reference_match<A: Archive>(
        &self,
        archive: &mut A,
        stats: &mut RecoveryStats,
        progress: Option<&Sender<RecoveryProgress>>,
    ) -> Result<(Vec<Discovery>, AHashMap<ContentHash, String>)> {
        let mut discoveries = Vec::new();
        let mut hints = AHashMap::new();

        let Some(library) = self.references.as_ref().filter(|library| !library.is_empty()) else {
            return Ok((discoveries, hints));
        };

        let unknown = archive.unknown_hashes();
        notify(progress, RecoveryProgress::PhaseStarted(RecoveryPhase::ReferenceMatch, unknown.len()));

        let threshold = self.config.similarity_threshold;
        let matches: Vec<(ContentHash, String, f64)> = {
            let contents: Vec<(ContentHash, &[u8])> = unknown
                .iter()
                .filter_map(|&hash| archive.content(hash).map(|data| (hash, data)))
                .collect();

            let scored: Result<Vec<Option<(ContentHash, String, f64)>>> = contents
                .par_iter()
                .map(|&(hash, data)| {
                    let fingerprint = FuzzyHash::compute(data, library.bit_width())?;
                    Ok(library
                        .best_match(&fingerprint, threshold)?
                        .map(|(file, score)| (hash, file.name.clone(), score)))
                })
                .collect();
            scored?.into_iter().flatten().collect()
        };

        for (hash, name, score) in matches {
            debug!("{} resembles reference '{}' ({:.1})", hash, name, score);
            if register(archive, hash, &name) {
                discoveries.push(self.discovered(hash, &name, DiscoverySource::Reference, progress));
            } else if let Some(extension) = extension_of(&name) {
                hints.insert(hash, extension.to_string());
            }
        }

        stats.reference_hits = discoveries.len();
        Ok((discoveries, hints))
    }

    /// Test generated candidates until they run out, nothing is unknown, or
    /// `cancel` is set. Cancellation is polled between batches only and
    /// never undoes earlier registrations.
    pub fn brute_force<A, I>(
        &self,
        archive: &mut A,
        candidates: I,
        cancel: &CancellationFlag,
        progress: Option<&Sender<RecoveryProgress>>,
    ) -> BruteForceOutcome
    where
        A: Archive,
        I: IntoIterator<Item = String>,
    {
        let mut unknown: AHashSet<ContentHash> = archive.unknown_hashes().into_iter().collect();
        notify(progress, RecoveryProgress::PhaseStarted(RecoveryPhase::BruteForce, unknown.len()));

        let packing = archive.packing();
        let batch_size = self.config.batch_size.max(1);
        let mut candidates = candidates.into_iter();
        let mut outcome = BruteForceOutcome::default();

        while !unknown.is_empty() {
            if cancel.is_cancelled() {
                info!("Brute force cancelled after {} candidates", outcome.tested);
                outcome.cancelled = true;
                notify(progress, RecoveryProgress::Cancelled);
                break;
            }

            let batch: Vec<String> = candidates.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            outcome.tested += batch.len() as u64;

            let hits: Vec<(ContentHash, &String)> = batch
                .par_iter()
                .filter_map(|name| {
                    let hash = packing.hash(name);
                    unknown.contains(&hash).then_some((hash, name))
                })
                .collect();

            for (hash, name) in hits {
                // two spellings of one name in the same batch
                if !unknown.contains(&hash) {
                    continue;
                }
                if register(archive, hash, name) {
                    unknown.remove(&hash);
                    outcome
                        .discoveries
                        .push(self.discovered(hash, name, DiscoverySource::BruteForce, progress));
                }
            }

            notify(progress, RecoveryProgress::BatchCompleted(outcome.tested));
        }

        outcome
    }

    /// Name every still-unknown entry after its sniffed format
    pub fn assign_placeholders<A: Archive>(
        &self,
        archive: &A,
        hints: &AHashMap<ContentHash, String>,
        progress: Option<&Sender<RecoveryProgress>>,
    ) -> Vec<Placeholder> {
        let unknown = archive.unknown_hashes();
        notify(progress, RecoveryProgress::PhaseStarted(RecoveryPhase::FormatSniff, unknown.len()));

        unknown
            .into_iter()
            .map(|hash| {
                let sniffed = archive
                    .content(hash)
                    .and_then(|data| self.sniffer.sniff(data))
                    .map(|format| format.extension());
                let extension = sniffed
                    .or_else(|| hints.get(&hash).map(String::as_str))
                    .unwrap_or(UNKNOWN_EXTENSION);

                Placeholder {
                    hash,
                    name: placeholder_name(hash, extension),
                }
            })
            .collect()
    }

    fn discovered(
        &self,
        hash: ContentHash,
        name: &str,
        source: DiscoverySource,
        progress: Option<&Sender<RecoveryProgress>>,
    ) -> Discovery {
        debug!("{} -> '{}' ({:?})", hash, name, source);
        notify(progress, RecoveryProgress::Discovered(hash, name.to_string()));
        Discovery {
            hash,
            name: name.to_string(),
            source,
        }
    }
}

/// The integrity gate: re-hash and compare before registering
fn register<A: Archive>(archive: &mut A, target: ContentHash, name: &str) -> bool {
    let actual = archive.packing().hash(name);
    if actual != target {
        warn!("Rejecting '{}' for {}: it hashes to {}", name, target, actual);
        return false;
    }
    archive.discover_file(name)
}

pub fn placeholder_name(hash: ContentHash, extension: &str) -> String {
    format!("Unknown_{hash}.{extension}")
}

/// Extension of an archive path, ignoring dots in directory names
fn extension_of(name: &str) -> Option<&str> {
    let file = name.rsplit(|c: char| c == '\\' || c == '/').next().unwrap_or(name);
    match file.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < file.len() => Some(&file[dot + 1..]),
        _ => None,
    }
}

fn notify(progress: Option<&Sender<RecoveryProgress>>, event: RecoveryProgress) {
    if let Some(sender) = progress {
        if !sender.is_closed() {
            let _ = sender.try_send(event);
        }
    }
}
