use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Detects silently corrupted files by checksumming directory trees
#[derive(Parser, Debug)]
#[command(name = "bitrot", version, about, long_about = None)]
pub struct Cli {
    /// Manifest store directory (defaults to ~/.bitrot)
    #[arg(long, global = true, value_name = "DIR", env = "BITROT_STORE")]
    pub store: Option<PathBuf>,

    /// Exclude this name while scanning, in addition to the defaults (repeatable)
    #[arg(long, global = true, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Checksum a directory, store the manifest, and compare to the previous one
    Generate {
        /// Directory to scan
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
    },

    /// Re-checksum a directory and compare against its latest stored manifest
    Validate {
        /// Directory to validate
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
    },

    /// Checksum two directories and verify the second is an intact copy of the first
    Compare {
        /// Directory treated as the baseline
        #[arg(value_name = "OLD")]
        old: PathBuf,

        /// Directory expected to match
        #[arg(value_name = "NEW")]
        new: PathBuf,
    },

    /// Compare the latest stored manifests of two directories
    CompareLatest {
        /// Baseline directory
        #[arg(value_name = "OLD")]
        old: PathBuf,

        /// Directory expected to match
        #[arg(value_name = "NEW")]
        new: PathBuf,
    },

    /// List paths known to the manifest store
    List {},
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
