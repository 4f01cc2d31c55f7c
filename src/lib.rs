//! Source line counting engine.
//!
//! [`scan`] discovers files under a root, [`count`] tallies their code lines
//! per language into an [`Accumulator`], and [`format`] turns the tallies
//! into a sorted [`Report`] with percentages.

pub mod catalog;
pub mod classifier;
pub mod counter;
pub mod error;
pub mod report;
pub mod scanner;

pub use catalog::{ExtensionIndex, LanguageDefinition};
pub use classifier::is_code_line;
pub use counter::{count, Accumulator, Counter, FileTally, LanguageTally};
pub use error::{CatalogError, ScanError};
pub use report::{format, Report};
pub use scanner::{extension_of, scan, ExclusionSet, ScanOutcome};
