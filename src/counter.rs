//! Per-file code line counting and per-language aggregation.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::catalog::ExtensionIndex;
use crate::classifier::is_code_line;
use crate::error::ScanError;
use crate::scanner::{extension_of, should_simulate_failure};

const READ_FAIL_TAG: &str = "__slocount_read_fail__.py";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageTally {
    pub language: String,
    pub lines: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTally {
    #[serde(serialize_with = "serialize_path_lossy")]
    pub path: PathBuf,
    pub language: String,
    pub lines: u64,
}

/// Writes a path as a string, replacing bytes that are not valid UTF-8.
pub(crate) fn serialize_path_lossy<S: Serializer>(
    path: &Path,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Line counts gathered over one counting pass.
///
/// Languages and files keep the order in which they were first seen, so
/// equal counts can later be sorted stably. The language sum, the file sum
/// and `total` always agree.
#[derive(Debug, Default, Serialize)]
pub struct Accumulator {
    languages: Vec<LanguageTally>,
    files: Vec<FileTally>,
    total: u64,
    #[serde(skip)]
    language_slots: HashMap<String, usize>,
    #[serde(skip)]
    file_slots: HashMap<PathBuf, usize>,
    #[serde(skip)]
    errors: Vec<ScanError>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `lines` to both the language and the file entry, creating them
    /// at zero when missing.
    pub fn record(&mut self, path: &Path, language: &str, lines: u64) {
        match self.language_slots.get(language) {
            Some(&slot) => self.languages[slot].lines += lines,
            None => {
                self.language_slots
                    .insert(language.to_string(), self.languages.len());
                self.languages.push(LanguageTally {
                    language: language.to_string(),
                    lines,
                });
            }
        }
        match self.file_slots.get(path) {
            Some(&slot) => self.files[slot].lines += lines,
            None => {
                self.file_slots.insert(path.to_path_buf(), self.files.len());
                self.files.push(FileTally {
                    path: path.to_path_buf(),
                    language: language.to_string(),
                    lines,
                });
            }
        }
        self.total += lines;
    }

    pub fn record_error(&mut self, error: ScanError) {
        self.errors.push(error);
    }

    /// Appends `other` after `self`. Entries already present are summed in
    /// place; new ones keep `other`'s relative order.
    pub fn merge(&mut self, other: Accumulator) {
        for tally in other.files {
            self.record_file_only(tally);
        }
        for tally in other.languages {
            match self.language_slots.get(&tally.language) {
                Some(&slot) => self.languages[slot].lines += tally.lines,
                None => {
                    self.language_slots
                        .insert(tally.language.clone(), self.languages.len());
                    self.languages.push(tally);
                }
            }
        }
        self.total += other.total;
        self.errors.extend(other.errors);
    }

    fn record_file_only(&mut self, tally: FileTally) {
        match self.file_slots.get(&tally.path) {
            Some(&slot) => self.files[slot].lines += tally.lines,
            None => {
                self.file_slots.insert(tally.path.clone(), self.files.len());
                self.files.push(tally);
            }
        }
    }

    pub fn languages(&self) -> &[LanguageTally] {
        &self.languages
    }

    pub fn files(&self) -> &[FileTally] {
        &self.files
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    pub fn lines_for_language(&self, language: &str) -> Option<u64> {
        self.language_slots
            .get(language)
            .map(|&slot| self.languages[slot].lines)
    }

    pub fn lines_for_file(&self, path: &Path) -> Option<u64> {
        self.file_slots.get(path).map(|&slot| self.files[slot].lines)
    }
}

/// Reads a file as lines, replacing invalid UTF-8 with the replacement character.
/// A leading UTF-8 byte-order mark is dropped.
struct LossyLineReader {
    reader: BufReader<Box<dyn Read + Send>>,
    buffer: Vec<u8>,
    at_start: bool,
}

impl LossyLineReader {
    fn new(file: fs::File) -> Self {
        Self::from_reader(Box::new(file))
    }

    fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(8 * 1024),
            at_start: true,
        }
    }

    #[cfg(test)]
    fn with_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::from_reader(Box::new(reader))
    }
}

impl Iterator for LossyLineReader {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                let mut bytes = self.buffer.as_slice();
                if std::mem::take(&mut self.at_start) {
                    bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                }
                let text = String::from_utf8_lossy(bytes);
                let line = text.trim_end_matches(['\n', '\r']).to_string();
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

fn read_file_lines_lossy(file_path: &Path) -> io::Result<LossyLineReader> {
    if should_simulate_failure(file_path, READ_FAIL_TAG) {
        return Err(io::Error::other("simulated file read failure"));
    }
    let file = fs::File::open(file_path)?;
    Ok(LossyLineReader::new(file))
}

fn count_code_lines<I>(lines: I) -> io::Result<u64>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut count = 0;
    for line in lines {
        if is_code_line(&line?) {
            count += 1;
        }
    }
    Ok(count)
}

/// Counts code lines of discovered files against an [`ExtensionIndex`].
pub struct Counter<'a> {
    index: &'a ExtensionIndex,
    jobs: usize,
}

impl<'a> Counter<'a> {
    pub fn new(index: &'a ExtensionIndex) -> Self {
        Counter { index, jobs: 1 }
    }

    /// Worker count for the counting phase; 1 keeps everything on the
    /// calling thread.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn count(&self, files: &[PathBuf]) -> Accumulator {
        if self.jobs > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
                Ok(pool) => return pool.install(|| self.count_parallel(files)),
                Err(err) => warn!("Falling back to a single worker: {}", err),
            }
        }
        let mut acc = Accumulator::new();
        for path in files {
            self.count_into(&mut acc, path);
        }
        acc
    }

    // rayon's reduce joins partial results in input order, so the merged
    // accumulator matches a sequential pass exactly.
    fn count_parallel(&self, files: &[PathBuf]) -> Accumulator {
        files
            .par_iter()
            .fold(Accumulator::new, |mut acc, path| {
                self.count_into(&mut acc, path);
                acc
            })
            .reduce(Accumulator::new, |mut left, right| {
                left.merge(right);
                left
            })
    }

    fn count_into(&self, acc: &mut Accumulator, path: &Path) {
        let key = self.index.language_key(&extension_of(path));
        match read_file_lines_lossy(path).and_then(count_code_lines) {
            Ok(lines) => {
                debug!(file = %path.display(), language = %key, lines, "counted");
                acc.record(path, &key, lines);
            }
            Err(source) => {
                warn!("Error counting lines in {}: {}", path.display(), source);
                acc.record(path, &key, 0);
                acc.record_error(ScanError::FileRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}

/// Sequential count of `files` using `index`.
pub fn count(files: &[PathBuf], index: &ExtensionIndex) -> Accumulator {
    Counter::new(index).count(files)
}
