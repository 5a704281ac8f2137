pub mod automation;
pub mod catalog;
mod defaults;
mod error;

pub use automation::{merge_with_defaults, AutomationSettings, MergeDecisionMode};
pub use catalog::{Document, DocumentKind, DOCUMENTS};
pub use error::StoreError;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default location of the preference documents inside the workstation container.
pub const DEFAULT_PREFERENCES_DIR: &str = "/workspace/data/preferences";

/// Environment variable overriding [`DEFAULT_PREFERENCES_DIR`].
pub const PREFERENCES_DIR_ENV: &str = "VIBE_PREFERENCES_DIR";

/// Return the preferences directory: `$VIBE_PREFERENCES_DIR` or `/workspace/data/preferences`.
pub fn preferences_dir() -> PathBuf {
    match std::env::var_os(PREFERENCES_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_PREFERENCES_DIR),
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    tmp.write_all(data).map_err(|e| StoreError::io(path, e))?;
    tmp.flush().map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Shallow merge: every top-level key of `parsed` wins over `default`.
/// A non-object document is discarded in favour of the default.
pub fn merge_shallow(default: &Value, parsed: Value) -> Value {
    match (default, parsed) {
        (Value::Object(base), Value::Object(over)) => {
            let mut merged = base.clone();
            merged.extend(over);
            Value::Object(merged)
        }
        (_, Value::Object(over)) => Value::Object(over),
        (default, other) => {
            tracing::warn!(found = %other, "preference document is not a JSON object, using defaults");
            default.clone()
        }
    }
}

/// Key/value store of text and JSON preference documents in one directory.
///
/// Reads are write-through: a missing document is created with its default
/// content before being returned. No locking; last writer wins.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    dir: PathBuf,
}

impl PreferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at [`preferences_dir`].
    pub fn from_env() -> Self {
        Self::new(preferences_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Read a text document, creating it with `default` when absent.
    /// A document that exists but cannot be read yields `default`.
    pub fn read_text(&self, name: &str, default: &str) -> Result<String, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            write_atomic(&path, default.as_bytes())?;
            tracing::debug!(path = %path.display(), "created preference with default content");
            return Ok(default.to_string());
        }
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read preference, using default");
                Ok(default.to_string())
            }
        }
    }

    /// Read a document only if it already exists. Never creates anything.
    pub fn read_existing(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    pub fn write_text(&self, name: &str, content: &str) -> Result<(), StoreError> {
        write_atomic(&self.path_for(name), content.as_bytes())
    }

    /// Read a JSON document as a raw value, shallow-merged over `default`.
    pub fn read_json_value(&self, name: &str, default: &Value) -> Result<Value, StoreError> {
        self.read_json_value_with(name, default, merge_shallow)
    }

    /// Like [`read_json_value`](Self::read_json_value) with a caller-supplied merge.
    ///
    /// Absent document: persisted as pretty JSON of `default`, then returned.
    /// Unparseable document: warning, then `default`.
    pub fn read_json_value_with<F>(
        &self,
        name: &str,
        default: &Value,
        merge: F,
    ) -> Result<Value, StoreError>
    where
        F: FnOnce(&Value, Value) -> Value,
    {
        let path = self.path_for(name);
        if !path.exists() {
            self.write_json(name, default)?;
            tracing::debug!(path = %path.display(), "created JSON preference with defaults");
            return Ok(default.clone());
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read preference, using defaults");
                return Ok(default.clone());
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => Ok(merge(default, parsed)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid JSON in preference, using defaults");
                Ok(default.clone())
            }
        }
    }

    /// Typed JSON read. Fields missing on disk come from `default`; a document
    /// whose merged shape does not fit `T` falls back to `default` entirely.
    pub fn read_json<T>(&self, name: &str, default: &T) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let default_value = serde_json::to_value(default)?;
        let merged = self.read_json_value(name, &default_value)?;
        match serde_json::from_value(merged) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(name, error = %e, "preference has unexpected shape, using defaults");
                Ok(default.clone())
            }
        }
    }

    /// Persist `data` as JSON pretty-printed with 2-space indentation.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(data)?;
        self.write_text(name, &body)
    }

    /// Names of `*.md` / `*.json` documents currently on disk, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".md") || name.ends_with(".json"))
            .collect();
        names.sort();
        Ok(names)
    }
}
