//! pkg-fetch CLI - fetch repository artifacts with mirror failover
//!
//! Usage:
//!   pkg-fetch fetch <repo> <url> -o <dest>   Fetch one artifact
//!   pkg-fetch repos                          List configured repositories

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use pkg_fetch::config::{self, Settings};
use pkg_fetch::fetch::{
    self, ArtifactDescriptor, ConsoleEvents, Outcome, TransportSession,
};
use pkg_fetch::output;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pkg-fetch")]
#[command(about = "Fetch package repository artifacts with mirror failover")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extra configuration file, merged last
    #[arg(short, long, global = true, env = "PKG_FETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Raise debug verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    debug: u8,

    /// Total attempts per fetch
    #[arg(long, global = true)]
    retry: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one artifact from a configured repository
    Fetch {
        /// Repository name
        repo: String,

        /// Artifact URL
        url: String,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,

        /// Expected size in bytes, used when the server sends no length
        #[arg(long, default_value_t = 0)]
        size: u64,

        /// Known modification time (seconds since epoch) for a conditional fetch
        #[arg(long)]
        mtime: Option<u64>,
    },

    /// List configured repositories
    Repos,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(retry) = cli.retry {
        settings.fetch.fetch_retry = retry;
    }
    settings.fetch.debug_level = settings.fetch.debug_level.max(cli.debug);

    match cli.command {
        Commands::Fetch {
            repo,
            url,
            output: dest,
            size,
            mtime,
        } => fetch_artifact(&settings, &repo, &url, &dest, size, mtime),
        Commands::Repos => {
            list_repos(&settings);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn fetch_artifact(
    settings: &Settings,
    name: &str,
    url: &str,
    dest: &Path,
    size: u64,
    mtime: Option<u64>,
) -> Result<ExitCode> {
    let runtime = fetch::init_transport_runtime();
    let mut repo = settings.repository(name)?;

    TransportSession::open(&mut repo, &runtime, &settings.resolver)
        .with_context(|| format!("Failed to open repository '{}'", name))?;

    let mut artifact = ArtifactDescriptor::new(url, size);
    if let Some(secs) = mtime {
        artifact.set_mtime_secs(secs);
    }

    output::action(&format!("Fetching {}", url));
    let result = {
        let mut events = ConsoleEvents::new();
        fetch::fetch_to_path(&mut repo, &mut artifact, dest, &settings.fetch, &mut events)
    };

    repo.close();
    fetch::shutdown_transport_runtime(runtime);

    match result {
        Ok(Outcome::Fetched) => {
            output::success(&format!("Fetched {}", dest.display()));
            output::detail(&format!("mtime {}", artifact.mtime_secs()));
            Ok(ExitCode::SUCCESS)
        }
        Ok(Outcome::Unchanged) => {
            output::skip(&format!("{} is up to date", url));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            output::error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn list_repos(settings: &Settings) {
    if settings.repos.is_empty() {
        output::info("No repositories configured");
        return;
    }

    for (name, repo) in &settings.repos {
        println!(
            "  {} {} {}",
            name.bold(),
            repo.url,
            format!("[{}]", repo.mirror_type).dimmed()
        );
        if let Some(hosts) = &repo.srv {
            for host in hosts {
                println!("      {} {}", "-".cyan(), host);
            }
        }
    }
}
