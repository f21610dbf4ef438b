//! Command-line configuration for the `bioimage-formats` binary.
//!
//! Three subcommands share one set of conventions:
//! - Command-line arguments via clap
//! - Environment variables with the `BIF_` prefix
//! - Built-in plugin lists unless a replacement file is given
//!
//! # Environment Variables
//!
//! - `BIF_READERS` - Reader plugin list replacing the built-in one
//! - `BIF_WRITERS` - Writer plugin list replacing the built-in one
//! - `BIF_STRICT_REGISTRY` - Fail on unresolved plugin entries (default: false)
//! - `BIF_NO_FLATTEN` - Keep pyramid levels inside their series (default: false)
//! - `BIF_FILTER_METADATA` - Filter metadata tables (default: false)
//! - `BIF_ORIGINAL_METADATA` - Copy metadata tables into the store (default: false)

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::reader::ReaderOptions;
use crate::registry::Strictness;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Bioimage Formats - read, describe and convert microscopy images.
#[derive(Parser, Debug, Clone)]
#[command(name = "bioimage-formats")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the structure and metadata of an image file.
    Info(InfoConfig),

    /// Convert an image to the format selected by the output suffix.
    Convert(ConvertConfig),

    /// List the registered readers and writers.
    Formats(FormatsConfig),
}

/// Plugin list selection shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryArgs {
    /// Reader plugin list replacing the built-in one.
    #[arg(long, env = "BIF_READERS")]
    pub readers: Option<PathBuf>,

    /// Writer plugin list replacing the built-in one.
    #[arg(long, env = "BIF_WRITERS")]
    pub writers: Option<PathBuf>,

    /// Fail when a plugin list names an unknown plugin.
    ///
    /// Without this flag unknown entries are logged and dropped.
    #[arg(long, default_value_t = false, env = "BIF_STRICT_REGISTRY")]
    pub strict_registry: bool,
}

impl RegistryArgs {
    pub fn strictness(&self) -> Strictness {
        if self.strict_registry {
            Strictness::Strict
        } else {
            Strictness::Lenient
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (flag, path) in [("--readers", &self.readers), ("--writers", &self.writers)] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(format!("{} {} is not a readable file", flag, path.display()));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Info Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Image file to describe.
    pub file: String,

    /// Describe only this series.
    #[arg(long)]
    pub series: Option<usize>,

    /// Keep pyramid levels inside their series instead of one series each.
    #[arg(long, default_value_t = false, env = "BIF_NO_FLATTEN")]
    pub no_flatten: bool,

    /// Print the summary as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Drop complex values and strip markup from metadata tables.
    #[arg(long, default_value_t = false, env = "BIF_FILTER_METADATA")]
    pub filter_metadata: bool,

    /// Copy the metadata tables into the metadata store.
    #[arg(long, default_value_t = false, env = "BIF_ORIGINAL_METADATA")]
    pub original_metadata: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InfoConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.file.trim().is_empty() {
            return Err("An image file is required".to_string());
        }
        self.registry.validate()
    }

    /// Reader options selected by the flags.
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::default()
            .with_flattened_resolutions(!self.no_flatten)
            .with_metadata_filtered(self.filter_metadata)
            .with_original_metadata(self.original_metadata)
    }
}

// =============================================================================
// Convert Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConvertConfig {
    /// Image file to read.
    pub input: String,

    /// File to write; its suffix selects the writer.
    pub output: String,

    /// Replace an existing output file.
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ConvertConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.input.trim().is_empty() || self.output.trim().is_empty() {
            return Err("Both an input and an output file are required".to_string());
        }
        if self.input == self.output {
            return Err("Input and output must be different files".to_string());
        }
        if Path::new(&self.output).extension().is_none() {
            return Err(format!(
                "Output '{}' has no suffix to select a writer",
                self.output
            ));
        }
        if !self.overwrite && Path::new(&self.output).exists() {
            return Err(format!(
                "Output '{}' already exists; pass --overwrite to replace it",
                self.output
            ));
        }
        self.registry.validate()
    }
}

// =============================================================================
// Formats Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct FormatsConfig {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Print the listing as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FormatsConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.registry.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
