// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MakeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// `:`, `::` and `!` mixed on the same target name.
    #[error("Inconsistent operator for {0}")]
    InconsistentOperator(String),

    #[error("Graph cycles through {0}")]
    GraphCycle(String),

    #[error("don't know how to make {0}")]
    DontKnowHowToMake(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MakeError>;
