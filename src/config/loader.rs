// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{BuildFile, RawBuildFile};
use crate::errors::Result;

/// Load a build file from `path` without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Parse a build file from TOML text without validating it.
pub fn load_from_str(contents: &str) -> Result<RawBuildFile> {
    let raw: RawBuildFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a build file and run the sanity checks of
/// [`validate`](crate::config::validate).
///
/// This is the entry point for the rest of the application; the result is
/// ready for [`apply`](crate::config::apply).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildFile> {
    let raw = load_from_path(&path)?;
    let file = BuildFile::try_from(raw)?;
    Ok(file)
}
