//! Extension-to-language lookup built from a language definition dataset.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;

const BUILTIN_LANGUAGES: &str = include_str!("../data/languages.json");

/// One entry of the language dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageDefinition {
    pub name: String,
    /// Linguist category such as `programming`, `markup` or `data`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

/// Read-only map from an extension (leading dot included, case-sensitive) to
/// a language display name.
#[derive(Debug, Clone, Default)]
pub struct ExtensionIndex {
    by_extension: HashMap<String, String>,
}

impl ExtensionIndex {
    /// Index built from the dataset embedded in the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_LANGUAGES)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<LanguageDefinition> =
            serde_json::from_str(json).map_err(|source| CatalogError::Parse { source })?;
        Ok(Self::from_definitions(definitions))
    }

    /// The first definition to claim an extension keeps it.
    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = LanguageDefinition>,
    {
        let mut by_extension = HashMap::new();
        for definition in definitions {
            let Some(extensions) = definition.extensions else {
                continue;
            };
            for extension in extensions {
                by_extension
                    .entry(extension)
                    .or_insert_with(|| definition.name.clone());
            }
        }
        tracing::debug!(extensions = by_extension.len(), "language catalog loaded");
        ExtensionIndex { by_extension }
    }

    pub fn language_for(&self, extension: &str) -> Option<&str> {
        self.by_extension.get(extension).map(String::as_str)
    }

    /// Aggregation key for an extension: the trimmed language name when known,
    /// otherwise the raw extension.
    pub fn language_key(&self, extension: &str) -> String {
        match self.language_for(extension) {
            Some(name) => name.trim().to_string(),
            None => extension.trim().to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    fn definition(name: &str, extensions: Option<&[&str]>) -> LanguageDefinition {
        LanguageDefinition {
            name: name.to_string(),
            kind: None,
            extensions: extensions.map(|exts| exts.iter().map(|e| e.to_string()).collect()),
        }
    }

    #[test]
    fn test_first_definition_wins_for_shared_extension() {
        let index = ExtensionIndex::from_definitions(vec![
            definition("C", Some(&[".c", ".h"])),
            definition("C++", Some(&[".cpp", ".h"])),
        ]);
        assert_eq!(index.language_for(".h"), Some("C"));
        assert_eq!(index.language_for(".cpp"), Some("C++"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_definitions_without_extensions_are_skipped() {
        let index = ExtensionIndex::from_json(
            r#"[
                {"name": "Prose", "type": "prose"},
                {"name": "Empty", "extensions": []},
                {"name": "Nothing", "extensions": null},
                {"name": "Python", "type": "programming", "extensions": [".py", ".pyw"]}
            ]"#,
        )
        .expect("dataset should parse");
        assert_eq!(index.len(), 2);
        assert_eq!(index.language_for(".pyw"), Some("Python"));
    }

    #[test]
    fn test_definition_type_is_parsed() {
        let definitions: Vec<LanguageDefinition> = serde_json::from_str(
            r#"[
                {"name": "Python", "type": "programming", "extensions": [".py"]},
                {"name": "Text Only"}
            ]"#,
        )
        .expect("dataset should parse");
        assert_eq!(definitions[0].kind.as_deref(), Some("programming"));
        assert_eq!(definitions[1].kind, None);
        assert_eq!(definitions[1].extensions, None);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let index = ExtensionIndex::from_definitions(vec![definition("Python", Some(&[".py"]))]);
        assert_eq!(index.language_for(".py"), Some("Python"));
        assert_eq!(index.language_for(".PY"), None);
        assert_eq!(index.language_for("py"), None);
    }

    #[test]
    fn test_language_key_trims_name_and_falls_back_to_extension() {
        let index =
            ExtensionIndex::from_definitions(vec![definition("  Rust ", Some(&[".rs"]))]);
        assert_eq!(index.language_key(".rs"), "Rust");
        assert_eq!(index.language_key(".xyz"), ".xyz");
        assert_eq!(index.language_key(""), "");
    }

    #[test]
    fn test_malformed_dataset_is_a_parse_error() {
        let err = ExtensionIndex::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }), "got {err:?}");
        let err = ExtensionIndex::from_json(r#"{"name": "Rust"}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn test_missing_dataset_is_a_read_error() {
        let temp_dir = tempfile::TempDir::new().expect("temp dir");
        let missing = temp_dir.path().join("languages.json");
        let err = ExtensionIndex::from_path(&missing).unwrap_err();
        match err {
            CatalogError::Read { path, .. } => assert_eq!(path, missing),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_loads_dataset_from_file() -> io::Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"[{{"name": "Go", "extensions": [".go"]}}, {{"name": "Golang", "extensions": [".go"]}}]"#
        )?;
        let index = ExtensionIndex::from_path(file.path()).expect("dataset should load");
        assert_eq!(index.language_for(".go"), Some("Go"));
        Ok(())
    }

    #[test]
    fn test_builtin_dataset_covers_common_languages() {
        let index = ExtensionIndex::builtin().expect("embedded dataset should parse");
        assert!(!index.is_empty());
        assert_eq!(index.language_for(".rs"), Some("Rust"));
        assert_eq!(index.language_for(".py"), Some("Python"));
        assert_eq!(index.language_for(".cs"), Some("C#"));
    }
}
