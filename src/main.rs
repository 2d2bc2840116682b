// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use flappy::{PackageRecord, ReadOptions, read_package};
use rayon::prelude::*;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flappy")]
#[command(author, version, about = "Package manager for FlucidOS", long_about = None)]
struct Cli {
    /// Append log output to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate package archives and show their metadata
    Inspect {
        /// Paths to package archives (tar, optionally gzip/xz/zstd compressed)
        #[arg(required = true, value_name = "ARCHIVE")]
        archives: Vec<PathBuf>,
        /// Print one JSON object per archive
        #[arg(long)]
        json: bool,
        /// Reject unknown .PKGINFO keys instead of ignoring them
        #[arg(long)]
        strict: bool,
    },
    /// Show Flappy version
    Version,
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

/// Install the process-wide log sink
///
/// With `--log-file`, logs are appended to that file at `info` unless
/// `RUST_LOG` says otherwise. Without it, stderr only carries logs when
/// `RUST_LOG` asks for them, since inspection errors are already reported
/// there.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let default_filter = if log_file.is_some() { "info" } else { "off" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }

    Ok(())
}

/// Machine-readable report for one archive
fn json_report(path: &Path, result: &flappy::Result<PackageRecord>) -> serde_json::Value {
    match result {
        Ok(record) => json!({
            "path": path.display().to_string(),
            "package": record,
        }),
        Err(e) => json!({
            "path": path.display().to_string(),
            "error": {
                "kind": e.kind(),
                "phase": e.phase(),
                "message": e.to_string(),
            },
        }),
    }
}

/// Report on each archive, returning how many failed
fn inspect(archives: &[PathBuf], json: bool, strict: bool) -> Result<usize> {
    let options = if strict {
        ReadOptions::strict()
    } else {
        ReadOptions::default()
    };

    // Each archive gets its own handle and buffers, so they can be read in parallel
    let results: Vec<_> = archives
        .par_iter()
        .map(|path| read_package(path, &options))
        .collect();

    let failures = report(&mut io::stdout().lock(), archives, &results, json)?;
    info!("Inspected {} archive(s), {} failed", archives.len(), failures);
    Ok(failures)
}

/// Write reports in argument order; failures go to stderr in text mode
fn report<W: Write>(
    out: &mut W,
    archives: &[PathBuf],
    results: &[flappy::Result<PackageRecord>],
    json: bool,
) -> Result<usize> {
    let mut failures = 0;
    let mut printed = false;

    for (path, result) in archives.iter().zip(results) {
        if json {
            writeln!(out, "{}", serde_json::to_string(&json_report(path, result))?)?;
        } else {
            match result {
                Ok(record) => {
                    if printed {
                        writeln!(out)?;
                    }
                    if archives.len() > 1 {
                        writeln!(out, "==> {}", path.display())?;
                    }
                    write!(out, "{}", record)?;
                    printed = true;
                }
                Err(e) => eprintln!("error: {}: {}", path.display(), e),
            }
        }

        if result.is_err() {
            failures += 1;
        }
    }

    Ok(failures)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;
    info!("flappy invoked");

    match cli.command {
        Some(Commands::Inspect {
            archives,
            json,
            strict,
        }) => {
            let failures = inspect(&archives, json, strict)?;
            Ok(if failures == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Some(Commands::Version) => {
            println!("Flappy {}\n{}", env!("CARGO_PKG_VERSION"), flappy::TAGLINE);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "flappy", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_inspect_requires_an_archive() {
        assert!(Cli::try_parse_from(["flappy", "inspect"]).is_err());
    }

    #[test]
    fn test_inspect_flags() {
        let cli = Cli::try_parse_from(["flappy", "inspect", "--strict", "--json", "a.pkg.tar.zst", "b.pkg.tar.xz"])
            .unwrap();
        match cli.command {
            Some(Commands::Inspect {
                archives,
                json,
                strict,
            }) => {
                assert_eq!(archives, [PathBuf::from("a.pkg.tar.zst"), PathBuf::from("b.pkg.tar.xz")]);
                assert!(json);
                assert!(strict);
            }
            _ => panic!("expected inspect command"),
        }
    }

    #[test]
    fn test_json_report_for_failure() {
        let result = Err(flappy::Error::MetadataMissing);
        let report = json_report(Path::new("pkg.tar"), &result);
        assert_eq!(report["path"], "pkg.tar");
        assert_eq!(report["error"]["kind"], "metadata-missing");
        assert_eq!(report["error"]["phase"], "archive");
        assert!(report.get("package").is_none());
    }

    #[test]
    fn test_text_report_separates_only_printed_records() {
        let archives = [
            PathBuf::from("broken.pkg.tar"),
            PathBuf::from("a.pkg.tar"),
            PathBuf::from("b.pkg.tar"),
        ];
        let results = vec![
            Err(flappy::Error::MetadataMissing),
            flappy::packages::parse(b"pkgname=a\npkgver=1\narch=any\n"),
            flappy::packages::parse(b"pkgname=b\npkgver=2\narch=any\n"),
        ];

        let mut out = Vec::new();
        let failures = report(&mut out, &archives, &results, false).unwrap();
        assert_eq!(failures, 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("==> a.pkg.tar\n"));
        assert_eq!(text.matches("\n\n==> ").count(), 1);
        assert!(text.contains("\n\n==> b.pkg.tar\n"));
        assert!(!text.contains("broken"));
    }

    #[test]
    fn test_inspect_missing_file_fails() {
        let failures = inspect(&[PathBuf::from("/nonexistent/pkg.tar")], true, false).unwrap();
        assert_eq!(failures, 1);
    }
}
