//! srcpool command line tool
//!
//! `check` validates a sources file; `soak` exercises the pool and hot-swap
//! machinery against a simulated backend.

mod check;
mod logging;
mod sim;
mod soak;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use srcpool_core::SourcesFile;

use crate::logging::LoggingConfig;
use crate::soak::SoakOptions;

#[derive(Debug, Parser)]
#[command(name = "srcpool", version, about = "Per-source resource pools with hot-swap")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "SRCPOOL_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a sources file and list its sources
    Check {
        /// Path to the sources TOML file
        file: PathBuf,
    },

    /// Run concurrent checkouts while repeatedly replacing a source
    Soak {
        /// Path to the sources TOML file
        file: PathBuf,

        /// Source to exercise; defaults to the only source in the file
        #[arg(long)]
        source: Option<String>,

        #[arg(long, default_value_t = 4)]
        threads: usize,

        /// Units of work per thread
        #[arg(long, default_value_t = 1000)]
        iterations: usize,

        /// Replace the source every N completed units of work (0 disables)
        #[arg(long, default_value_t = 100)]
        swap_every: usize,

        /// Simulated statement latency in milliseconds
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        /// Drop the simulated session every N statements (0 disables)
        #[arg(long, default_value_t = 0)]
        drop_every: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = LoggingConfig::with_verbosity(cli.verbose).with_json(cli.json_logs);
    if let Err(err) = logging::init(config) {
        eprintln!("failed to initialize logging: {err}");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Check { file } => {
            let sources = load(&file)?;
            if sources.is_empty() {
                println!("{}: no sources defined", file.display());
                return Ok(());
            }
            println!("{}", check::render(&sources));
            println!("{} source(s) OK", sources.sources.len());
        }
        Command::Soak {
            file,
            source,
            threads,
            iterations,
            swap_every,
            latency_ms,
            drop_every,
        } => {
            let sources = load(&file)?;
            let name = match source {
                Some(name) => name,
                None => match sources.sources.keys().collect::<Vec<_>>().as_slice() {
                    [only] => (*only).clone(),
                    _ => bail!("{} defines several sources; pick one with --source", file.display()),
                },
            };
            let Some(config) = sources.get(&name) else {
                bail!("source '{}' not found in {}", name, file.display());
            };
            if threads == 0 {
                bail!("--threads must be at least 1");
            }

            let options = SoakOptions {
                threads,
                iterations,
                swap_every,
                latency: Duration::from_millis(latency_ms),
                drop_every,
            };
            let report = soak::run(&name, config, &options)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn load(file: &Path) -> anyhow::Result<SourcesFile> {
    SourcesFile::load(file).with_context(|| format!("failed to load {}", file.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_soak_args() {
        let cli = Cli::try_parse_from([
            "srcpool", "-v", "soak", "sources.toml", "--source", "db", "--threads", "2",
            "--swap-every", "10",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Soak { source, threads, swap_every, iterations, .. } => {
                assert_eq!(source.as_deref(), Some("db"));
                assert_eq!(threads, 2);
                assert_eq!(swap_every, 10);
                assert_eq!(iterations, 1000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_soak_runs_against_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[sources.db]\nhost = \"sim\"\nmax_connections = 2").expect("write");

        run(Command::Soak {
            file: file.path().to_path_buf(),
            source: None,
            threads: 2,
            iterations: 10,
            swap_every: 5,
            latency_ms: 0,
            drop_every: 0,
        })
        .expect("soak");
    }

    #[test]
    fn test_check_rejects_bad_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[sources.db]\nhost = \"\"").expect("write");

        let err = run(Command::Check { file: file.path().to_path_buf() }).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load"));
    }
}
