// src/config/special.rs

//! Special targets recognized on dependency lines.

/// A target name with built-in meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialTarget {
    /// `.BEGIN`: run before everything else.
    Begin,
    /// `.END`: run after all goals succeeded.
    End,
    /// `.DEFAULT`: recipe for sources nobody knows how to make.
    Default,
    /// `.MAIN`: the sources become default goals.
    Main,
    /// `.ORDER`: the sources are built left to right.
    Order,
    /// `.SUFFIXES`: add suffixes, or clear them all without sources.
    Suffixes,
    Null,
    Includes,
    Libs,
    /// `.PATH` or `.PATH<suffix>`.
    Path(Option<String>),
    Phony,
    Precious,
    /// `.IGNORE`: attribute for the sources, or `-i` without sources.
    Ignore,
    /// `.SILENT`: attribute for the sources, or `-s` without sources.
    Silent,
    NoPath,
    /// `.NOTPARALLEL`: limit the build to one job.
    NotParallel,
}

impl SpecialTarget {
    pub fn parse(name: &str) -> Option<Self> {
        let special = match name {
            ".BEGIN" => SpecialTarget::Begin,
            ".END" => SpecialTarget::End,
            ".DEFAULT" => SpecialTarget::Default,
            ".MAIN" => SpecialTarget::Main,
            ".ORDER" => SpecialTarget::Order,
            ".SUFFIXES" => SpecialTarget::Suffixes,
            ".NULL" => SpecialTarget::Null,
            ".INCLUDES" => SpecialTarget::Includes,
            ".LIBS" => SpecialTarget::Libs,
            ".PATH" => SpecialTarget::Path(None),
            ".PHONY" => SpecialTarget::Phony,
            ".PRECIOUS" => SpecialTarget::Precious,
            ".IGNORE" => SpecialTarget::Ignore,
            ".SILENT" => SpecialTarget::Silent,
            ".NOPATH" => SpecialTarget::NoPath,
            ".NOTPARALLEL" | ".NO_PARALLEL" => SpecialTarget::NotParallel,
            other => {
                let suffix = other.strip_prefix(".PATH")?;
                if suffix.is_empty() {
                    return None;
                }
                SpecialTarget::Path(Some(suffix.to_string()))
            }
        };
        Some(special)
    }

    /// Whether a recipe may follow this target.
    pub fn takes_commands(&self) -> bool {
        matches!(
            self,
            SpecialTarget::Begin | SpecialTarget::End | SpecialTarget::Default
        )
    }
}
