use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::fuzzy::BIT_WIDTH_RANGE;
use crate::hashing::HashPacking;
use crate::types::RecoveryConfig;

/// Map Recovery - archive name recovery and script object reconstruction
#[derive(Parser, Debug, Clone)]
#[command(name = "map-recovery")]
#[command(version)]
#[command(about = "Recover archive names and editor objects from protected maps", long_about = None)]
pub struct Args {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the content hash of archive paths
    Hash {
        /// Archive paths, e.g. war3map.j
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,

        #[arg(long = "packing", value_enum, default_value_t = Packing::LowHigh)]
        packing: Packing,
    },

    /// Convert four-character codes to and from their integer encodings
    Fourcc {
        /// A code such as hfoo, or a decimal/0x integer
        #[arg(value_name = "CODE", required = true)]
        codes: Vec<String>,
    },

    /// Recover names for extracted members known only by content hash
    Recover(RecoverArgs),

    /// Rebuild editor objects from a parsed map script
    Reconstruct {
        /// Script tree as JSON
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Editor version from the map info file (default: current layout)
        #[arg(long = "editor-version")]
        editor_version: Option<u32>,

        /// Write the objects here instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RecoverArgs {
    /// Directory of members named by their 16-digit content hash
    #[arg(value_name = "DUMP_DIR")]
    pub dump_dir: PathBuf,

    /// Extra candidate names, one per line
    #[arg(short = 'l', long = "listfile")]
    pub listfiles: Vec<PathBuf>,

    /// Directory of known files for content matching
    #[arg(short = 'r', long = "references")]
    pub references: Option<PathBuf>,

    /// Try prefix x stem x extension combinations after the dictionary
    #[arg(long = "brute-force")]
    pub brute_force: bool,

    /// Output directory for renamed members
    #[arg(short = 'o', long = "output", default_value = "recovered")]
    pub output: PathBuf,

    /// JSON report path (default: <output>/recovery_report.json)
    #[arg(long = "report")]
    pub report: Option<PathBuf>,

    #[arg(long = "packing", value_enum, default_value_t = Packing::LowHigh)]
    pub packing: Packing,

    /// Worker threads (0 = auto)
    #[arg(short = 'j', long = "threads", default_value = "0")]
    pub threads: usize,

    /// Brute-force candidates per batch
    #[arg(long = "batch-size", default_value = "65536")]
    pub batch_size: usize,

    /// Fuzzy histogram bit width
    #[arg(long = "bit-width", default_value = "8")]
    pub bit_width: u8,

    /// Minimum reference similarity, 0-100
    #[arg(long = "threshold", default_value = "95.0")]
    pub threshold: f64,

    /// Leave unresolved members out of the output instead of naming them Unknown_*
    #[arg(long = "no-placeholders")]
    pub no_placeholders: bool,
}

/// Command-line spelling of [`HashPacking`]
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    LowHigh,
    HighLow,
}

impl From<Packing> for HashPacking {
    fn from(packing: Packing) -> Self {
        match packing {
            Packing::LowHigh => HashPacking::LowHigh,
            Packing::HighLow => HashPacking::HighLow,
        }
    }
}

impl Args {
    /// Validate the arguments
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Hash { names, .. } => {
                if names.iter().any(|name| name.is_empty()) {
                    return Err("Names cannot be empty".to_string());
                }
            }
            Command::Fourcc { codes } => {
                if codes.iter().any(|code| code.is_empty()) {
                    return Err("Codes cannot be empty".to_string());
                }
            }
            Command::Recover(recover) => recover.validate()?,
            Command::Reconstruct { script, .. } => {
                if script.as_os_str().is_empty() {
                    return Err("Script path cannot be empty".to_string());
                }
            }
        }
        Ok(())
    }
}

impl RecoverArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.dump_dir.as_os_str().is_empty() {
            return Err("Dump directory cannot be empty".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch-size must be greater than 0".to_string());
        }

        if !BIT_WIDTH_RANGE.contains(&self.bit_width) {
            return Err(format!(
                "bit-width ({}) must be within {}-{}",
                self.bit_width,
                BIT_WIDTH_RANGE.start(),
                BIT_WIDTH_RANGE.end()
            ));
        }

        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(format!("threshold ({}) must be within 0-100", self.threshold));
        }

        Ok(())
    }

    pub fn recovery_config(&self) -> RecoveryConfig {
        RecoveryConfig {
            num_threads: self.threads,
            batch_size: self.batch_size,
            fuzzy_bit_width: self.bit_width,
            similarity_threshold: self.threshold,
            sniff_placeholders: !self.no_placeholders,
        }
    }

    /// Report location, defaulting to the output directory
    pub fn report_path(&self) -> PathBuf {
        self.report
            .clone()
            .unwrap_or_else(|| self.output.join("recovery_report.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recover_args() -> RecoverArgs {
        RecoverArgs {
            dump_dir: PathBuf::from("dump"),
            listfiles: Vec::new(),
            references: None,
            brute_force: false,
            output: PathBuf::from("recovered"),
            report: None,
            packing: Packing::LowHigh,
            threads: 0,
            batch_size: 65536,
            bit_width: 8,
            threshold: 95.0,
            no_placeholders: false,
        }
    }

    #[test]
    fn test_args_validation() {
        let args = recover_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.report_path(), PathBuf::from("recovered").join("recovery_report.json"));
        assert!(args.recovery_config().validate().is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        let mut args = recover_args();
        args.bit_width = 17;
        assert!(args.validate().is_err());

        let mut args = recover_args();
        args.threshold = 120.0;
        assert!(args.validate().is_err());

        let mut args = recover_args();
        args.batch_size = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::try_parse_from(["map-recovery", "hash", "war3map.j", "--packing", "high-low"]).unwrap();
        match args.command {
            Command::Hash { names, packing } => {
                assert_eq!(names, vec!["war3map.j"]);
                assert_eq!(HashPacking::from(packing), HashPacking::HighLow);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from(["map-recovery", "-v", "recover", "dump", "--brute-force", "-l", "names.txt"])
            .unwrap();
        assert!(args.verbose);
        assert!(args.validate().is_ok());
        match args.command {
            Command::Recover(recover) => {
                assert!(recover.brute_force);
                assert_eq!(recover.listfiles, vec![PathBuf::from("names.txt")]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
