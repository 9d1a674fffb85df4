// src/config/mod.rs

//! Build description loading and validation.
//!
//! The TOML build file stands in for a makefile: it declares suffixes,
//! search paths, options and the ordered dependency lines.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a build file from disk.
//! - [`validate`] checks basic sanity before anything is built from it.
//! - [`special`] names the special targets with built-in meaning.
//! - [`apply`] feeds a validated file into a `BuildContext`.

pub mod apply;
pub mod loader;
pub mod model;
pub mod special;
pub mod validate;

pub use apply::{build_context, build_options, populate, resolve_goals};
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    BuildFile, ConfigSection, DependencyLine, PathSection, RawBuildFile, SuffixSection,
};
pub use special::SpecialTarget;
pub use validate::validate_build_file;
