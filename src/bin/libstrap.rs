//! libstrap CLI - bootstrap third-party libraries from a descriptor file
//!
//! Usage:
//!   libstrap bootstrap <file> [--dest deps] [--library NAME]...   Bootstrap libraries
//!   libstrap list <file>                                          List declared libraries
//!   libstrap snapshots                                            List cached snapshots

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use libstrap::core::output;
use libstrap::descriptor::SourceSpec;
use libstrap::driver::{self, DriveOptions};
use libstrap::helpers::ContentCache;
use libstrap::{
    BootstrapConfig, Bootstrapper, FallbackArtifact, HttpClient, Settings, SystemTools,
    load_descriptors,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "libstrap")]
#[command(about = "Bootstrap third-party source libraries with cache and fallback mirror")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $XDG_CONFIG_HOME/libstrap/libstrap.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cache root for archives, snapshots and locks
    #[arg(long, global = true, env = "LIBSTRAP_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the libraries of a descriptor file
    Bootstrap {
        /// Descriptor file (JSON)
        file: PathBuf,

        /// Destination directory; each library goes to <dest>/<name>
        #[arg(short, long, default_value = "deps")]
        dest: PathBuf,

        /// Root that patch files are resolved against
        #[arg(short, long)]
        postprocessing_dir: Option<PathBuf>,

        /// Write a snapshot archive of each repository checkout
        #[arg(short = 's', long)]
        create_snapshots: bool,

        /// Base URL of the fallback mirror
        #[arg(short, long, env = "LIBSTRAP_FALLBACK_URL")]
        fallback_url: Option<String>,

        /// Only bootstrap these libraries (repeatable)
        #[arg(short, long = "library")]
        libraries: Vec<String>,

        /// Continue after a library fails
        #[arg(short, long)]
        keep_going: bool,

        /// Name the mirror artifact after the source URL when a download fails
        #[arg(long)]
        artifact_from_url: bool,
    },

    /// List the libraries declared in a descriptor file
    List {
        /// Descriptor file (JSON)
        file: PathBuf,
    },

    /// List snapshot archives in the cache
    Snapshots,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        settings.cache_dir = dir;
    }

    match cli.command {
        Commands::Bootstrap {
            file,
            dest,
            postprocessing_dir,
            create_snapshots,
            fallback_url,
            libraries,
            keep_going,
            artifact_from_url,
        } => {
            if let Some(dir) = postprocessing_dir {
                settings.postprocessing_dir = Some(dir);
            }
            if let Some(url) = fallback_url {
                settings.fallback_url = Some(url);
            }
            settings.create_snapshots |= create_snapshots;

            let artifact = if artifact_from_url {
                FallbackArtifact::UrlName
            } else {
                FallbackArtifact::DownloadedName
            };

            bootstrap(&settings, &file, dest, libraries, keep_going, artifact)?;
        }

        Commands::List { file } => {
            list_libraries(&file)?;
        }

        Commands::Snapshots => {
            list_snapshots(&settings)?;
        }
    }

    Ok(())
}

fn tools(settings: &Settings) -> SystemTools {
    let http = HttpClient::new(settings.http_timeout, settings.user_agent.clone());
    SystemTools::new(&settings.cache_dir, http)
}

fn bootstrap(
    settings: &Settings,
    file: &Path,
    dest: PathBuf,
    only: Vec<String>,
    keep_going: bool,
    artifact: FallbackArtifact,
) -> Result<()> {
    let descriptors = load_descriptors(file)
        .with_context(|| format!("Failed to load descriptors from {}", file.display()))?;

    std::fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create destination directory: {}", dest.display()))?;

    let mut config = BootstrapConfig::new()
        .create_snapshots(settings.create_snapshots)
        .fallback_artifact(artifact);
    if let Some(dir) = &settings.postprocessing_dir {
        config = config.postprocessing_dir(dir);
    }
    if let Some(url) = &settings.fallback_url {
        config = config.fallback_url(url);
    }

    let tools = tools(settings);
    let bootstrapper = Bootstrapper::new(config, tools.toolset());
    let options = DriveOptions {
        dest,
        lock_dir: settings.lock_dir(),
        only,
        keep_going,
    };

    let summary = driver::bootstrap_all(&bootstrapper, &descriptors, &options)?;
    driver::print_summary(&summary);

    if !summary.all_succeeded() {
        bail!(
            "{} of {} libraries failed",
            summary.failed.len(),
            summary.failed.len() + summary.succeeded.len() + summary.skipped.len()
        );
    }
    Ok(())
}

fn list_libraries(file: &Path) -> Result<()> {
    let descriptors = load_descriptors(file)
        .with_context(|| format!("Failed to load descriptors from {}", file.display()))?;

    if descriptors.is_empty() {
        output::info("No libraries declared");
        return Ok(());
    }

    for library in &descriptors {
        let (status, invalid) = match library.validate_source() {
            Ok(SourceSpec::Archive(src)) => (format!("archive {}", src.url), false),
            Ok(SourceSpec::Repository(src)) => {
                let pin = src
                    .revision
                    .as_deref()
                    .map(|r| format!(" @{}", r))
                    .or_else(|| src.branch.as_deref().map(|b| format!(" ({})", b)))
                    .unwrap_or_default();
                (format!("{} {}{}", src.kind.tool(), src.url, pin), false)
            }
            Err(e) => (format!("invalid: {}", e), true),
        };
        output::list_item(&library.name, &status, invalid);
    }
    Ok(())
}

fn list_snapshots(settings: &Settings) -> Result<()> {
    let dir = tools(settings).cache.snapshot_dir();
    if !dir.is_dir() {
        output::info(&format!("No snapshots in {}", dir.display()));
        return Ok(());
    }

    let mut names: Vec<String> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();

    if names.is_empty() {
        output::info(&format!("No snapshots in {}", dir.display()));
        return Ok(());
    }

    for name in names {
        let size = std::fs::metadata(dir.join(&name))
            .map(|m| m.len())
            .unwrap_or(0);
        output::list_item(&name, &format!("{} bytes", size), false);
    }
    Ok(())
}
