pub mod detect;
pub mod sources;
pub mod transform;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "decant",
    about = "Validate and normalize bank/supplier CSV exports against mapping configurations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a file against a stored mapping or inline decoder metadata.
    Validate {
        /// Path to the CSV file
        file: PathBuf,
        /// Stored source id to validate against
        #[arg(long, required_unless_present = "metadata", conflicts_with = "metadata")]
        source: Option<String>,
        /// Inline decoder metadata JSON (decode-level checks only)
        #[arg(long)]
        metadata: Option<String>,
        /// Base directory holding config/ and data/
        #[arg(long = "config-dir", default_value = ".")]
        config_dir: PathBuf,
        /// Write the JSON result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Decode and transform a file, writing per-month normalized CSVs.
    Transform {
        /// Path to the CSV file
        file: PathBuf,
        /// Stored source id whose mapping drives the transformation
        #[arg(long)]
        source: String,
        /// Base directory holding config/ and data/
        #[arg(long = "config-dir", default_value = ".")]
        config_dir: PathBuf,
        /// Directory for the per-month output files
        #[arg(long = "out-dir", default_value = "output")]
        out_dir: PathBuf,
    },
    /// Rank stored sources by header similarity to a file.
    Detect {
        /// Path to the CSV file
        file: PathBuf,
        /// Base directory holding config/ and data/
        #[arg(long = "config-dir", default_value = ".")]
        config_dir: PathBuf,
    },
    /// List stored mapping configurations.
    Sources {
        /// Base directory holding config/ and data/
        #[arg(long = "config-dir", default_value = ".")]
        config_dir: PathBuf,
    },
}
