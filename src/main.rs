//! Bioimage Formats - describe and convert microscopy images.
//!
//! This binary wires the built-in plugin lists (or replacement files) into
//! the reader and writer facades and runs one subcommand.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bioimage_formats::{
    builtin_reader_catalog, builtin_writer_catalog,
    config::{Cli, Command, ConvertConfig, FormatsConfig, InfoConfig, RegistryArgs},
    convert, default_reader_list, default_writer_list, list_formats, summarize, FormatError,
    ImageReader, ImageWriter, MemoryMetadataStore, PlaneReader, PluginList,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Info(config) => run_info(config).await,
        Command::Convert(config) => run_convert(config).await,
        Command::Formats(config) => run_formats(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "bioimage_formats=debug"
    } else {
        "bioimage_formats=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Plugin Lists
// =============================================================================

async fn load_readers(args: &RegistryArgs) -> Result<ImageReader, FormatError> {
    let list = match &args.readers {
        Some(path) => {
            debug!(path = %path.display(), "Loading reader list");
            PluginList::load(path, &builtin_reader_catalog(), args.strictness()).await?
        }
        None => default_reader_list(args.strictness())?,
    };
    Ok(ImageReader::from_list(&list))
}

async fn load_writers(args: &RegistryArgs) -> Result<ImageWriter, FormatError> {
    let list = match &args.writers {
        Some(path) => {
            debug!(path = %path.display(), "Loading writer list");
            PluginList::load(path, &builtin_writer_catalog(), args.strictness()).await?
        }
        None => default_writer_list(args.strictness())?,
    };
    Ok(ImageWriter::from_list(&list))
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match describe(&config).await {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to describe {}: {}", config.file, e);
            ExitCode::FAILURE
        }
    }
}

async fn describe(config: &InfoConfig) -> Result<String, FormatError> {
    let mut reader = load_readers(&config.registry).await?;
    reader.set_options(config.reader_options())?;
    if config.original_metadata {
        reader.set_metadata_store(Box::new(MemoryMetadataStore::new()))?;
    }

    reader.set_id(&config.file).await?;
    let summary = summarize(&mut reader, config.series).await;
    reader.close(false).await?;
    let summary = summary?;

    if config.json {
        serde_json::to_string_pretty(&summary).map_err(|e| FormatError::Malformed {
            format: "JSON",
            reason: e.to_string(),
        })
    } else {
        Ok(summary.to_string())
    }
}

// =============================================================================
// Convert Command
// =============================================================================

async fn run_convert(config: ConvertConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let facades = async {
        let reader = load_readers(&config.registry).await?;
        let writer = load_writers(&config.registry).await?;
        Ok::<_, FormatError>((reader, writer))
    };
    let (mut reader, mut writer) = match facades.await {
        Ok(facades) => facades,
        Err(e) => {
            error!("Failed to load plugin lists: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match convert(&mut reader, &mut writer, &config.input, &config.output).await {
        Ok(stats) => {
            info!(
                "Wrote {} plane(s) in {} tile(s) to {}",
                stats.planes, stats.tiles, config.output
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Conversion of {} failed: {}", config.input, e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Formats Command
// =============================================================================

async fn run_formats(config: FormatsConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let reader = match load_readers(&config.registry).await {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to load reader list: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let writer = match load_writers(&config.registry).await {
        Ok(writer) => writer,
        Err(e) => {
            error!("Failed to load writer list: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let listing = list_formats(&reader, &writer);
    if config.json {
        match serde_json::to_string_pretty(&listing) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize listing: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", listing);
    }

    ExitCode::SUCCESS
}
