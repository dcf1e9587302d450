//! Reading desired-state documents from text and from disk.
//!
//! JSON is the native format. YAML files (`.yaml`, `.yml`) are converted to
//! the same JSON tree before validation, so both go through one validator.

use std::path::Path;

use serde_json::Value;

use crate::error::{io_err, ConfigError};
use crate::types::DesiredConfig;
use crate::validation;

/// Source format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick a format from the file extension; anything unknown is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Parse `text` into a JSON tree without validating it.
///
/// A syntax error becomes a single [`ConfigError::Invalid`] violation so that
/// callers report it the same way as structural problems.
pub fn parse_value(text: &str, format: DocumentFormat) -> Result<Value, ConfigError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text)
            .map_err(|e| ConfigError::invalid(format!("Invalid JSON: {e}"))),
        DocumentFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| ConfigError::invalid(format!("Invalid YAML: {e}"))),
    }
}

/// Parse and validate a JSON document.
pub fn parse_str(text: &str) -> Result<DesiredConfig, ConfigError> {
    validation::into_config(parse_value(text, DocumentFormat::Json)?)
}

/// Read, parse and validate the document at `path`.
pub fn load_path(path: &Path) -> Result<DesiredConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    validation::into_config(parse_value(&text, DocumentFormat::from_path(path))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::types::WorkspaceRef;

    #[test]
    fn format_follows_extension() {
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a.YAML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("config")), DocumentFormat::Json);
    }

    #[test]
    fn syntax_error_is_a_single_violation() {
        let err = parse_str("{ not json").unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(err.violations()[0].starts_with("Invalid JSON:"));
    }

    #[test]
    fn yaml_file_loads_like_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workspace.yaml");
        fs::write(
            &path,
            "workspaceName: Support\nactivities:\n  - friendlyName: Offline\n    available: false\n",
        )
        .unwrap();

        let config = load_path(&path).expect("load");
        assert_eq!(config.workspace, WorkspaceRef::Name("Support".into()));
        assert_eq!(config.activities.unwrap()[0].available, Some(false));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let err = load_path(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}
