use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;

use map_recovery::cli::{Args, Command, RecoverArgs};
use map_recovery::recovery::{load_listfile, stems_of, CandidateGenerator};
use map_recovery::script::Numeric;
use map_recovery::{
    Archive, BruteForce, CancellationFlag, FourCC, HashPacking, MapInfo, MemoryArchive, RainbowTable,
    RecoveryEngine, RecoveryProgress, ReferenceLibrary, ScriptTree, StatementPatternEngine,
};

/// Bounded so a slow consumer drops updates instead of stalling workers
const PROGRESS_CAPACITY: usize = 1024;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Info+ on stderr; --verbose enables debug; RUST_LOG overrides
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("map_recovery", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = args.validate() {
        bail!("Invalid arguments: {}", e);
    }

    match &args.command {
        Command::Hash { names, packing } => {
            let packing = HashPacking::from(*packing);
            for name in names {
                println!("{}  {}", packing.hash(name), name);
            }
            Ok(())
        }
        Command::Fourcc { codes } => {
            for code in codes {
                let fourcc = match Numeric::parse(code) {
                    Some(Numeric::Integer(value)) => {
                        let value = i32::try_from(value).with_context(|| format!("{} does not fit in 32 bits", code))?;
                        FourCC::from_raw_code(value)
                    }
                    _ => FourCC::parse(code),
                };
                println!(
                    "{}  script={}  object=0x{:08X}",
                    fourcc,
                    fourcc.to_raw_code(),
                    fourcc.to_object_id()
                );
            }
            Ok(())
        }
        Command::Recover(recover) => run_recover(recover),
        Command::Reconstruct {
            script,
            editor_version,
            output,
        } => run_reconstruct(script, *editor_version, output.as_deref()),
    }
}

fn run_recover(args: &RecoverArgs) -> anyhow::Result<()> {
    let packing = HashPacking::from(args.packing);
    let config = args.recovery_config();
    config.validate()?;

    let mut archive = MemoryArchive::from_dump_dir(&args.dump_dir, packing)
        .with_context(|| format!("Failed to load {}", args.dump_dir.display()))?;
    info!("Loaded {} members from {}", archive.len(), args.dump_dir.display());

    let mut names = Vec::new();
    for listfile in &args.listfiles {
        let loaded = load_listfile(listfile).with_context(|| format!("Failed to read {}", listfile.display()))?;
        info!("Read {} candidates from {}", loaded.len(), listfile.display());
        names.extend(loaded);
    }

    let mut table = RainbowTable::with_defaults(packing);
    table.extend(names.iter().cloned());
    info!("Rainbow table holds {} names ({} collisions)", table.len(), table.collisions());

    let mut engine = RecoveryEngine::new(config.clone(), table);
    if let Some(references) = &args.references {
        let library = ReferenceLibrary::from_dir(references, config.fuzzy_bit_width)
            .with_context(|| format!("Failed to index references in {}", references.display()))?;
        info!("Indexed {} reference files", library.len());
        engine = engine.with_references(library);
    }

    let cancel = CancellationFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current batch...");
        handler_flag.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let generator = args.brute_force.then(|| {
        let stems = stems_of(
            names
                .iter()
                .map(String::as_str)
                .chain(engine.table().iter().map(|(_, name)| name)),
        );
        CandidateGenerator::with_stems(stems)
    });
    if let Some(generator) = &generator {
        info!("Brute force will try {} candidates", generator.len());
    }
    let brute_force = generator
        .as_ref()
        .map(|generator| BruteForce::new(generator.iter(), cancel.clone()));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start progress runtime")?;
    let (sender, mut receiver) = mpsc::channel(PROGRESS_CAPACITY);
    let consumer = runtime.spawn(async move {
        while let Some(update) = receiver.recv().await {
            match update {
                RecoveryProgress::PhaseStarted(phase, remaining) => {
                    info!("{:?}: {} entries unknown", phase, remaining)
                }
                RecoveryProgress::Discovered(hash, name) => info!("  {} -> {}", hash, name),
                RecoveryProgress::BatchCompleted(tested) => log::debug!("  {} candidates tested", tested),
                RecoveryProgress::Cancelled => warn!("Brute force cancelled"),
            }
        }
    });

    let report = engine.recover(&mut archive, brute_force, Some(&sender))?;
    drop(sender);
    runtime.block_on(consumer).context("Progress consumer failed")?;

    fs::create_dir_all(&args.output).with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut written = 0usize;
    for (hash, name) in report.extraction_names() {
        let Some(relative) = archive_path(name) else {
            warn!("Skipping unsafe archive path {}", name);
            continue;
        };
        let Some(data) = archive.content(hash) else {
            continue;
        };
        let path = args.output.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }

    let report_path = args.report_path();
    report.write_json(&report_path)?;
    info!("Wrote {} files to {}", written, args.output.display());
    info!("Report saved to {}", report_path.display());
    Ok(())
}

/// Archive path (`\`-separated) as a relative filesystem path; `None` if it
/// would leave the output directory
fn archive_path(name: &str) -> Option<PathBuf> {
    let path: PathBuf = name.split(['\\', '/']).filter(|part| !part.is_empty()).collect();
    let safe = path.components().all(|component| matches!(component, Component::Normal(_)));
    (safe && path.components().next().is_some()).then_some(path)
}

fn run_reconstruct(script: &Path, editor_version: Option<u32>, output: Option<&Path>) -> anyhow::Result<()> {
    let text = fs::read_to_string(script).with_context(|| format!("Failed to read {}", script.display()))?;
    let tree = ScriptTree::from_json(&text).with_context(|| format!("Failed to parse {}", script.display()))?;
    info!("Script tree has {} nodes", tree.len());

    let objects = StatementPatternEngine::new().reconstruct(&tree, MapInfo::new(editor_version));
    let json = objects.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} objects to {}", objects.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
