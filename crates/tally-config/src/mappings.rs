//! Per-project field mapping files.
//!
//! A mapping for project `KEY` lives at `<dir>/KEY_config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use tally_core::mapping::{FieldMapping, FieldMappingRecord};

use crate::config::Result;

/// Path of the mapping file for `project_key` inside `dir`.
pub fn mapping_path(dir: &Path, project_key: &str) -> PathBuf {
    dir.join(format!("{project_key}_config.json"))
}

/// Reads a previously exported mapping. Returns `Ok(None)` when no file exists.
///
/// A file missing an issue kind fails with [`ConfigError::IncompleteMapping`](crate::ConfigError::IncompleteMapping).
pub fn load_mapping(dir: &Path, project_key: &str) -> Result<Option<FieldMapping>> {
    let path = mapping_path(dir, project_key);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    let record: FieldMappingRecord = serde_json::from_str(&text)?;
    Ok(Some(FieldMapping::try_from(record)?))
}

/// Writes `mapping` as pretty JSON, creating `dir` if needed.
pub fn save_mapping(dir: &Path, mapping: &FieldMapping) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = mapping_path(dir, mapping.project_key());
    let mut text = serde_json::to_string_pretty(mapping)?;
    text.push('\n');
    fs::write(&path, text)?;
    Ok(path)
}
