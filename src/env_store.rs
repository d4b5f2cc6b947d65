//! Ordered `KEY=VALUE` env-file store.
//!
//! The env file is shared with the deployment (compose reads it), so rewrites
//! must preserve line order and comments and must never leave a truncated
//! file behind. All writes go through a temp file in the same directory that
//! is persisted over the target.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// File-backed store for the deployment's env file.
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a key. A missing file reads as an empty store, not an error.
    ///
    /// Returns the first matching entry; the value is trimmed of surrounding
    /// whitespace.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        for line in contents.lines() {
            if let Some((name, value)) = parse_entry(line) {
                if name == key {
                    return Ok(Some(value.trim().to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Set a key, replacing the first existing entry in place or appending a
    /// new one at the end. All other lines, including comments and blanks,
    /// pass through untouched.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(key, value)?;

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
        let mut replaced = false;
        for line in lines.iter_mut() {
            if !replaced && parse_entry(line).is_some_and(|(name, _)| name == key) {
                *line = format!("{}={}", key, value);
                replaced = true;
            }
        }
        if !replaced {
            lines.push(format!("{}={}", key, value));
        }

        self.write_atomic(&lines)?;
        debug!(key, replaced, path = %self.path.display(), "env entry written");
        Ok(())
    }

    /// Write every listed key that the file does not already contain. Used to
    /// give a fresh checkout a complete env file before the first launch;
    /// existing values are never overwritten.
    pub fn seed_defaults(&self, defaults: &[(&str, &str)]) -> Result<()> {
        for (key, value) in defaults {
            if self.get(key)?.is_none() {
                self.set(key, value)?;
            }
        }
        Ok(())
    }

    fn write_atomic(&self, lines: &[String]) -> Result<()> {
        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };
        for line in lines {
            writeln!(tmp, "{}", line)?;
        }
        tmp.persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Split an env-file line into `(key, value)` on the first `=`. Comments and
/// lines without `=` yield `None`.
fn parse_entry(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let (name, value) = trimmed.split_once('=')?;
    Some((name.trim(), value))
}

fn validate_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_first || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Validation(format!(
            "Invalid env key '{}': must start with a letter or underscore and contain only letters, digits, and underscores",
            key
        )));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<()> {
    if value.contains('\n') || value.contains('\r') {
        return Err(Error::Validation(format!(
            "Value for '{}' must not contain newlines",
            key
        )));
    }
    Ok(())
}
