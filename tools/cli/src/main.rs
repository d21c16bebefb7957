//! virgil-native - diagnostics for the Virgil Crypto native loader.
//!
//! Inspects platform resolution, runs the loader, extracts bundled binaries
//! and exercises the stream adapters from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use virgilcrypto_common::{LibraryName, ResourcePath};
use virgilcrypto_loader::{
    extract_to_temp, DirectoryResources, ExtractOptions, HostInfo, LoadOrigin, LoadOutcome,
    LoaderConfig, NativeLoader, OsFamily, ResourceProvider, DEFAULT_COPY_CHUNK_SIZE,
};
use virgilcrypto_stream::{pump, DataSink, DataSource, StreamDataSink, StreamDataSource, DEFAULT_CHUNK_SIZE};

#[derive(Parser)]
#[command(name = "virgil-native")]
#[command(about = "Virgil Crypto native library diagnostics")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how the host platform is classified.
    Platform {
        /// OS name to classify instead of the host's.
        #[arg(long)]
        os_name: Option<String>,

        /// Architecture to use instead of the host's.
        #[arg(long)]
        arch: Option<String>,
    },

    /// Load the native library and report where it came from.
    Load {
        /// JSON loader configuration. Environment variables are used otherwise.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Root of the bundled resource layout.
        #[arg(short, long)]
        resource_dir: Option<PathBuf>,

        /// Logical library name.
        #[arg(short, long)]
        library: Option<String>,
    },

    /// Extract the bundled binary for a platform to a temporary file.
    Extract {
        /// Root of the bundled resource layout.
        #[arg(short, long)]
        resource_dir: PathBuf,

        /// Logical library name.
        #[arg(short, long)]
        library: Option<String>,

        /// OS name to resolve for.
        #[arg(long)]
        os_name: Option<String>,

        /// Architecture to resolve for.
        #[arg(long)]
        arch: Option<String>,

        /// Explicit resource path (e.g. "windows/x86/virgil_crypto_java"),
        /// bypassing platform resolution.
        #[arg(long, conflicts_with_all = ["library", "os_name", "arch"])]
        resource: Option<String>,

        /// Copy buffer size in bytes.
        #[arg(long, default_value_t = DEFAULT_COPY_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Copy a file through the stream adapters.
    Pipe {
        /// Source file.
        #[arg(short, long)]
        input: PathBuf,

        /// Destination file (created or truncated).
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum chunk size in bytes.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Platform { os_name, arch } => cmd_platform(os_name, arch),

        Commands::Load {
            config,
            resource_dir,
            library,
        } => cmd_load(config.as_deref(), resource_dir, library),

        Commands::Extract {
            resource_dir,
            library,
            os_name,
            arch,
            resource,
            chunk_size,
        } => cmd_extract(&resource_dir, library, os_name, arch, resource, chunk_size),

        Commands::Pipe {
            input,
            output,
            chunk_size,
        } => cmd_pipe(&input, &output, chunk_size),
    }
}

fn host_with_overrides(os_name: Option<String>, arch: Option<String>) -> HostInfo {
    let current = HostInfo::current();
    HostInfo::new(
        os_name.as_deref().unwrap_or(current.os_name()),
        arch.as_deref().unwrap_or(current.arch()),
    )
}

fn library_name(library: Option<String>) -> Result<LibraryName> {
    match library {
        Some(name) => LibraryName::new(name).context("Invalid library name"),
        None => Ok(LibraryName::default()),
    }
}

fn cmd_platform(os_name: Option<String>, arch: Option<String>) -> Result<()> {
    let host = host_with_overrides(os_name, arch);
    let family = host.family();

    println!("OS name:       {}", host.os_name());
    println!("Architecture:  {}", host.arch());
    println!("Family:        {}", family);
    println!("Directory:     {:?}", host.resource_directory());
    println!("Resource path: {}", host.resource_path(&LibraryName::default()));
    println!("Temp suffix:   {:?}", family.library_suffix());

    Ok(())
}

fn cmd_load(
    config_path: Option<&Path>,
    resource_dir: Option<PathBuf>,
    library: Option<String>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            LoaderConfig::from_json(&json).context("Invalid loader configuration")?
        }
        None => LoaderConfig::from_env().context("Invalid loader environment")?,
    };
    if resource_dir.is_some() {
        config.resource_dir = resource_dir;
    }
    if library.is_some() {
        config.library_name = library_name(library)?;
    }

    let loader = NativeLoader::new(config);
    info!("Expected resource: {}", loader.resource_path());

    match loader.ensure_loaded() {
        LoadOutcome::Loaded(library) => {
            println!("Loaded:   {}", library.name());
            println!("Location: {}", library.handle().location());
            match library.origin() {
                LoadOrigin::SearchPath => println!("Origin:   library search path"),
                LoadOrigin::Extracted {
                    resource_path,
                    temp_path,
                } => {
                    println!("Origin:   resource {}", resource_path);
                    println!("Temp:     {}", temp_path.display());
                }
            }
            Ok(())
        }
        LoadOutcome::Failed(failure) => {
            if let Some(direct) = failure.direct_error() {
                println!("Search path: {}", direct);
            }
            bail!("{}", failure)
        }
    }
}

fn cmd_extract(
    resource_dir: &Path,
    library: Option<String>,
    os_name: Option<String>,
    arch: Option<String>,
    resource: Option<String>,
    chunk_size: usize,
) -> Result<()> {
    let host = host_with_overrides(os_name, arch);
    let (resource_path, family) = match resource {
        Some(raw) => {
            let path = ResourcePath::parse(&raw).context("Invalid resource path")?;
            let family = path
                .components()
                .first()
                .map(|dir| OsFamily::classify(dir))
                .unwrap_or(OsFamily::Unknown);
            (path, family)
        }
        None => (host.resource_path(&library_name(library)?), host.family()),
    };

    let resources = DirectoryResources::new(resource_dir);
    let stream = resources
        .open(&resource_path)?
        .with_context(|| format!("Resource '{}' not found under {}", resource_path, resource_dir.display()))?;

    let options = ExtractOptions::new(resource_path.file(), family.library_suffix())
        .with_chunk_size(chunk_size);
    let extracted = extract_to_temp(stream, &options).context("Extraction failed")?;
    let len = extracted.len();
    let path = extracted.keep()?;

    info!("Extracted {} ({} bytes)", resource_path, len);
    println!("{}", path.display());

    Ok(())
}

fn cmd_pipe(input: &Path, output: &Path, chunk_size: usize) -> Result<()> {
    let reader =
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let writer =
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;

    let mut source =
        StreamDataSource::with_chunk_size(BufReader::with_capacity(chunk_size, reader), chunk_size)?;
    let mut sink = StreamDataSink::new(writer);

    let total = pump(&mut source, &mut sink)?;
    source.close()?;
    sink.close()?;

    println!("Copied {} bytes", total);
    Ok(())
}
