// src/config/validate.rs

use crate::config::model::{BuildFile, DependencyLine, RawBuildFile};
use crate::config::special::SpecialTarget;
use crate::errors::{MakeError, Result};

impl TryFrom<RawBuildFile> for BuildFile {
    type Error = MakeError;

    fn try_from(raw: RawBuildFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_build_file(&raw)?;
        Ok(BuildFile::new_unchecked(raw))
    }
}

/// Check a raw build file without building anything from it.
pub fn validate_build_file(raw: &RawBuildFile) -> Result<()> {
    validate_raw_build_file(raw)
}

fn validate_raw_build_file(raw: &RawBuildFile) -> Result<()> {
    validate_global_config(raw)?;
    validate_suffixes(raw)?;
    for (index, line) in raw.dependency.iter().enumerate() {
        validate_dependency_line(index, line)?;
    }
    if raw.main.iter().any(|m| m.trim().is_empty()) {
        return Err(MakeError::ConfigError(
            "`main` must not contain empty target names".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(raw: &RawBuildFile) -> Result<()> {
    if raw.config.jobs == 0 {
        return Err(MakeError::ConfigError(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    if raw.config.query && raw.config.no_execute {
        return Err(MakeError::ConfigError(
            "[config].query and [config].no_execute are mutually exclusive".to_string(),
        ));
    }
    Ok(())
}

fn validate_suffixes(raw: &RawBuildFile) -> Result<()> {
    let section = &raw.suffixes;
    let named = section
        .list
        .iter()
        .chain(section.null.iter())
        .chain(section.include.iter())
        .chain(section.library.iter())
        .chain(raw.paths.suffix.keys());
    for name in named {
        if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
            return Err(MakeError::ConfigError(format!(
                "invalid suffix name {name:?} in [suffixes]/[paths]"
            )));
        }
    }
    Ok(())
}

fn validate_dependency_line(index: usize, line: &DependencyLine) -> Result<()> {
    let at = |msg: String| MakeError::ConfigError(format!("dependency #{}: {msg}", index + 1));

    if line.targets.is_empty() {
        return Err(at("`targets` must not be empty".to_string()));
    }
    for name in line.targets.iter().chain(line.sources.iter()) {
        if name.trim().is_empty() {
            return Err(at("target and source names must not be empty".to_string()));
        }
    }
    if line.targets.iter().any(|t| t == ".WAIT") {
        return Err(at("`.WAIT` may only appear among sources".to_string()));
    }

    let specials: Vec<SpecialTarget> = line
        .targets
        .iter()
        .filter_map(|t| SpecialTarget::parse(t))
        .collect();
    if specials.is_empty() {
        return Ok(());
    }
    if specials.len() != line.targets.len() || specials.len() > 1 {
        return Err(at(format!(
            "special target must stand alone (got {:?})",
            line.targets
        )));
    }
    if !line.commands.is_empty() && !specials[0].takes_commands() {
        return Err(at(format!("{} does not take commands", line.targets[0])));
    }
    Ok(())
}
