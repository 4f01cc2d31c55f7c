//! Source line counter
//!
//! Walks a directory tree, maps every file to a language through its
//! extension, counts the lines that are neither blank nor comment-looking,
//! and prints a per-language summary with percentages.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use colored::*;
use terminal_size::{terminal_size, Width};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slocount::{report, scan, Counter, ExclusionSet, ExtensionIndex};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Count lines of code per language",
    long_about = "Recursively counts non-blank, non-comment lines under PATH and reports them per language. Languages are resolved from file extensions using a JSON language dataset.",
    color = clap::ColorChoice::Always
)]
struct Args {
    #[arg(default_value = ".")]
    path: String,

    /// A comma-separated list of folders to ignore
    #[arg(short = 'e', long)]
    excluded_folders: Option<String>,

    /// A comma-separated list of file extensions to ignore
    #[arg(short = 'x', long)]
    excluded_extensions: Option<String>,

    /// Language dataset to use instead of the built-in one
    #[arg(short, long)]
    languages: Option<PathBuf>,

    /// Number of worker threads used for counting
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Also list lines of code per file
    #[arg(long)]
    per_file: bool,

    /// Show only file names in the per-file listing
    #[arg(long, requires = "per_file")]
    short_names: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn safe_rate(value: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= f64::EPSILON {
        0.0
    } else {
        value as f64 / elapsed_secs
    }
}

fn terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

fn load_index(languages: Option<&Path>) -> anyhow::Result<ExtensionIndex> {
    let index = match languages {
        Some(path) => ExtensionIndex::from_path(path),
        None => ExtensionIndex::builtin(),
    }
    .context("Failed to load programming languages")?;
    if index.is_empty() {
        tracing::warn!("Language dataset defines no extensions; files are grouped by extension");
    }
    Ok(index)
}

fn run_cli(args: &Args, out: &mut dyn Write) -> anyhow::Result<()> {
    let index = load_index(args.languages.as_deref())?;

    // A missing root is reported by the scan as a directory warning.
    let path = Path::new(&args.path);
    let root = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let exclusions = ExclusionSet::parse(
        args.excluded_folders.as_deref(),
        args.excluded_extensions.as_deref(),
    );

    let start = Instant::now();
    info!("Reading files...");
    let scanned = scan(&root, &exclusions);
    info!("Found {} files...", scanned.files.len());

    let mut acc = Counter::new(&index)
        .with_jobs(args.jobs)
        .count(&scanned.files);
    for error in scanned.errors {
        acc.record_error(error);
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "Counted {} files in {:.2} seconds ({:.1} files/sec)",
        acc.files().len(),
        elapsed,
        safe_rate(acc.files().len() as u64, elapsed)
    );

    let report = report::format(&acc);
    if args.json {
        let json = serde_json::to_vec_pretty(&report).context("Failed to encode JSON report")?;
        out.write_all(&json)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(
        out,
        "{} {}",
        env!("CARGO_PKG_NAME").bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_yellow()
    )?;
    write!(out, "{}", report.render_summary())?;
    if args.per_file {
        writeln!(out)?;
        write!(
            out,
            "{}",
            report.render_files(&root, args.short_names, terminal_width())
        )?;
    }
    Ok(())
}

fn run_with_args<I, T>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::parse_from(args);
    setup_logging(args.verbose);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_cli(&args, &mut out)
}

fn main() -> anyhow::Result<()> {
    run_with_args(env::args_os())
}

#[cfg(test)]
mod tests {
    use super::*;
    use colored::control;
    use std::fs::File;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("slocount").chain(argv.iter().copied()))
            .expect("arguments should parse")
    }

    fn create_test_file(dir: &Path, name: &str, content: &str) -> io::Result<()> {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        write!(file, "{}", content)?;
        Ok(())
    }

    fn run_to_string(args: &Args) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        run_cli(args, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    #[test]
    fn test_args_defaults() {
        let args = parse(&[]);
        assert_eq!(args.path, ".");
        assert_eq!(args.jobs, 1);
        assert!(args.excluded_folders.is_none());
        assert!(args.excluded_extensions.is_none());
        assert!(!args.per_file && !args.json && !args.verbose);
    }

    #[test]
    fn test_args_accept_short_and_long_flags() {
        let args = parse(&["src", "-e", "bin,obj", "--excluded-extensions", ".cs", "-j", "4"]);
        assert_eq!(args.path, "src");
        assert_eq!(args.excluded_folders.as_deref(), Some("bin,obj"));
        assert_eq!(args.excluded_extensions.as_deref(), Some(".cs"));
        assert_eq!(args.jobs, 4);
    }

    #[test]
    fn test_short_names_requires_per_file() {
        let result = Args::try_parse_from(["slocount", "--short-names"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_safe_rate_handles_zero_elapsed() {
        assert_eq!(safe_rate(10, 0.0), 0.0);
        assert_eq!(safe_rate(10, 2.0), 5.0);
    }

    #[test]
    fn test_run_cli_prints_summary() -> anyhow::Result<()> {
        control::set_override(false);
        let temp_dir = TempDir::new()?;
        create_test_file(temp_dir.path(), "a.py", "x=1\n\n# c\ny=2\n")?;
        create_test_file(temp_dir.path(), "lib/b.rs", "fn b() {}\n// c\n")?;
        create_test_file(temp_dir.path(), "bin/skip.rs", "fn skip() {}\n")?;

        let root = temp_dir.path().to_string_lossy().into_owned();
        let args = parse(&[root.as_str(), "--excluded-folders", "bin", "--per-file"]);
        let output = run_to_string(&args)?;

        assert!(output.contains("Python"), "output: {output}");
        assert!(output.contains("66.67%"), "output: {output}");
        assert!(output.contains("Total lines of code: 3"), "output: {output}");
        assert!(output.contains("Lines of code per file:"), "output: {output}");
        assert!(!output.contains("skip.rs"), "output: {output}");
        Ok(())
    }

    #[test]
    fn test_run_cli_json_output() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        create_test_file(temp_dir.path(), "a.py", "x=1\ny=2\n")?;
        create_test_file(temp_dir.path(), "b.cs", "class B {}\n")?;

        let root = temp_dir.path().to_string_lossy().into_owned();
        let args = parse(&[root.as_str(), "--json", "-x", "cs"]);
        let output = run_to_string(&args)?;
        let json: serde_json::Value = serde_json::from_str(&output)?;
        assert_eq!(json["total"], 2);
        assert_eq!(json["rows"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["rows"][0]["language"], "Python");
        assert_eq!(json["rows"][0]["percentage"], 100.0);
        Ok(())
    }

    #[test]
    fn test_run_cli_missing_path_still_reports() -> anyhow::Result<()> {
        control::set_override(false);
        let temp_dir = TempDir::new()?;
        let missing = temp_dir.path().join("missing");
        let args = parse(&[missing.to_str().expect("utf-8 path")]);
        let output = run_to_string(&args)?;
        assert!(output.contains("Total lines of code: 0"), "output: {output}");
        assert!(output.contains("Warnings: 1"), "output: {output}");
        Ok(())
    }

    #[test]
    fn test_run_cli_bad_dataset_aborts_before_scan() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        create_test_file(temp_dir.path(), "langs.json", "[{\"name\": ")?;
        let dataset = temp_dir.path().join("langs.json");
        let root = temp_dir.path().to_string_lossy().into_owned();
        let args = parse(&[root.as_str(), "--languages", dataset.to_str().unwrap_or_default()]);
        let err = run_to_string(&args).unwrap_err();
        assert!(
            format!("{err:#}").contains("Malformed language dataset"),
            "error: {err:#}"
        );
        Ok(())
    }
}
