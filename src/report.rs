//! Sorted, percentage-annotated summaries of an [`Accumulator`].

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use colored::*;
use serde::Serialize;

use crate::counter::{serialize_path_lossy, Accumulator};

const NO_EXTENSION_LABEL: &str = "(none)";
const MIN_PATH_WIDTH: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageRow {
    pub language: String,
    pub lines: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    #[serde(serialize_with = "serialize_path_lossy")]
    pub path: PathBuf,
    pub language: String,
    pub lines: u64,
}

/// Report rows in display order plus the figures printed beneath them.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub rows: Vec<LanguageRow>,
    pub files: Vec<FileRow>,
    pub total: u64,
    pub warnings: usize,
}

/// Share of `total` in percent, rounded half away from zero to two decimals.
/// Zero when `total` is zero.
pub fn percentage(lines: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (lines as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

/// Builds the report. Both listings are sorted by descending line count;
/// the sort is stable, so ties keep the accumulator's first-seen order.
pub fn format(acc: &Accumulator) -> Report {
    let total = acc.total();
    let mut rows: Vec<LanguageRow> = acc
        .languages()
        .iter()
        .map(|tally| LanguageRow {
            language: tally.language.clone(),
            lines: tally.lines,
            percentage: percentage(tally.lines, total),
        })
        .collect();
    rows.sort_by(|a, b| b.lines.cmp(&a.lines));

    let mut files: Vec<FileRow> = acc
        .files()
        .iter()
        .map(|tally| FileRow {
            path: tally.path.clone(),
            language: tally.language.clone(),
            lines: tally.lines,
        })
        .collect();
    files.sort_by(|a, b| b.lines.cmp(&a.lines));

    Report {
        rows,
        files,
        total,
        warnings: acc.errors().len(),
    }
}

fn display_language(language: &str) -> &str {
    if language.is_empty() {
        NO_EXTENSION_LABEL
    } else {
        language
    }
}

/// Keeps the last characters of `s`, prefixed with "..." when shortened.
fn truncate_start(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else {
        let skip_count = char_count - (max_len.saturating_sub(3));
        let truncated: String = s.chars().skip(skip_count).collect();
        format!("...{}", truncated)
    }
}

fn display_path(path: &Path, root: &Path, short_names: bool) -> String {
    if short_names {
        return path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
    }
    match path.strip_prefix(root) {
        Ok(p) if p.as_os_str().is_empty() => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string()),
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

impl Report {
    /// Language table followed by the total line count.
    pub fn render_summary(&self) -> String {
        let mut output = String::new();
        let lang_width = self
            .rows
            .iter()
            .map(|row| display_language(&row.language).chars().count())
            .chain(std::iter::once("Language".len()))
            .max()
            .unwrap_or(0);
        let lines_width = self
            .rows
            .iter()
            .map(|row| row.lines.to_string().len())
            .chain(std::iter::once("Lines".len()))
            .max()
            .unwrap_or(0);

        let _ = writeln!(output, "{}", "Summary of Languages / File Types:".blue().bold());
        let _ = writeln!(
            output,
            "{:<lw$}  {:>nw$}  {:>10}",
            "Language",
            "Lines",
            "Percentage",
            lw = lang_width,
            nw = lines_width
        );
        let _ = writeln!(output, "{}", "-".repeat(lang_width + lines_width + 14));
        for row in &self.rows {
            let percent = format!("{:>10}", format!("{:.2}%", row.percentage));
            let _ = writeln!(
                output,
                "{:<lw$}  {:>nw$}  {}",
                display_language(&row.language),
                row.lines,
                percent.yellow(),
                lw = lang_width,
                nw = lines_width
            );
        }
        let _ = writeln!(
            output,
            "\nTotal lines of code: {}",
            self.total.to_string().bright_yellow()
        );
        if self.warnings > 0 {
            let _ = writeln!(
                output,
                "{}: {}",
                "Warnings".red().bold(),
                self.warnings.to_string().bright_yellow()
            );
        }
        output
    }

    /// One line per file, `path: N lines, Type: Language`. Paths are shown
    /// relative to `root` (or as bare names) and shortened from the start so
    /// each line fits in `width` columns.
    pub fn render_files(&self, root: &Path, short_names: bool, width: Option<usize>) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{}", "Lines of code per file:".blue().bold());
        for row in &self.files {
            let suffix = format!(
                ": {} lines, Type: {}",
                row.lines,
                display_language(&row.language)
            );
            let mut name = display_path(&row.path, root, short_names);
            if let Some(width) = width {
                let budget = width
                    .saturating_sub(suffix.chars().count())
                    .max(MIN_PATH_WIDTH);
                name = truncate_start(&name, budget);
            }
            let _ = writeln!(output, "{}{}", name, suffix);
        }
        output
    }
}
