use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use datacache::error::CacheError;
use datacache::fetcher::DownloadOutcome;
use datacache::installer::Installer;
use datacache::output::{DownloadReport, JsonOutput};
use datacache::store::Store;
use datacache::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "datacache")]
#[command(about = "Fetch remote datasets into a local cache, skipping work already done")]
#[command(version)]
struct Cli {
    /// Base directory for cached datasets.
    #[arg(long, global = true, default_value = "data-cache")]
    cache_dir: String,

    /// Print the result as JSON instead of a summary line.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download a single file (no-op if the destination exists)")]
    Get(GetArgs),
    #[command(about = "Download a zip archive and extract it into the cache")]
    Install(InstallArgs),
    #[command(about = "Download and extract an archive, keeping only matching files")]
    Keep(KeepArgs),
}

#[derive(Args)]
struct GetArgs {
    url: String,
    path: PathBuf,
}

#[derive(Args)]
struct InstallArgs {
    url: String,
    dataset: String,

    #[arg(long)]
    subfolder: Option<String>,

    /// Promote the contents of a sole top-level extracted directory.
    #[arg(long)]
    flatten: bool,
}

#[derive(Args)]
struct KeepArgs {
    url: String,
    dataset: String,

    /// Glob pattern for files to keep; may be given multiple times.
    #[arg(long = "pattern", required = true)]
    patterns: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(cache) = report.downcast_ref::<CacheError>() {
            return ExitCode::from(map_exit_code(cache));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CacheError) -> u8 {
    match error {
        CacheError::Transfer { .. } | CacheError::TransferStatus { .. } => 3,
        CacheError::InvalidPattern(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = Store::new(cli.cache_dir.as_str());
    let installer = Installer::new(store, HttpTransport::new()?);

    match cli.command {
        Commands::Get(args) => {
            let outcome = installer.downloader().download(&args.url, &args.path)?;
            let report = DownloadReport {
                url: args.url,
                path: args.path.display().to_string(),
                action: match outcome {
                    DownloadOutcome::Downloaded => "downloaded".to_string(),
                    DownloadOutcome::Skipped => "skipped".to_string(),
                },
            };
            if cli.json {
                JsonOutput::print_download(&report).map_err(CacheError::from_io)?;
            } else {
                println!("{} {} -> {}", report.action, report.url, report.path);
            }
        }
        Commands::Install(args) => {
            let result = installer.download_and_install(
                &args.url,
                &args.dataset,
                args.subfolder.as_deref(),
                args.flatten,
            )?;
            if cli.json {
                JsonOutput::print_install(&result).map_err(CacheError::from_io)?;
            } else {
                println!("{} {} -> {}", result.action, result.dataset, result.path);
            }
        }
        Commands::Keep(args) => {
            let result = installer.keep_subset(&args.url, &args.patterns, &args.dataset)?;
            if cli.json {
                JsonOutput::print_install(&result).map_err(CacheError::from_io)?;
            } else {
                println!("{} {} -> {}", result.action, result.dataset, result.path);
            }
        }
    }

    Ok(())
}
