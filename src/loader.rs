//! Loading machine definitions from files.

use crate::config::ConfigError;
use ruleflow_core::{MachineDefinition, StateMachineRegistry};
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Parses one definition file, choosing the format by extension.
pub fn parse_definition_file(path: &Path) -> Result<MachineDefinition, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed: Result<MachineDefinition, String> = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Lists definition files in `dir`, sorted by file name.
fn definition_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if path.is_file() && known {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Registers every definition found in `dir`. Returns the ids loaded.
///
/// A definition without an id is registered under its file stem. When
/// `replace_existing` is set, an id that is already registered is updated
/// in place; otherwise the load stops with `MachineExists`.
pub fn load_directory(
    registry: &StateMachineRegistry,
    dir: &Path,
    replace_existing: bool,
) -> Result<Vec<String>, ConfigError> {
    let mut loaded = Vec::new();

    for path in definition_files(dir)? {
        let mut definition = parse_definition_file(&path)?;
        if definition.id.trim().is_empty() {
            definition.id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
        }
        let id = definition.id.clone();

        let result = if replace_existing && registry.contains(&id) {
            registry.update(&id, &definition)
        } else {
            registry.create(&id, &definition)
        };
        result.map_err(|source| ConfigError::Definition {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Loaded state machine '{}' from {}", id, path.display());
        loaded.push(id);
    }

    Ok(loaded)
}
