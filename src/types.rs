// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

/// File modification time, in nanoseconds since the Unix epoch.
///
/// A node that does not exist carries `None` instead of a zero time, so
/// `Option<MTime>` orders "nonexistent" before every real timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MTime(u64);

impl MTime {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn from_system_time(t: SystemTime) -> Self {
        let nanos = t
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self(nanos)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }
}

impl fmt::Display for MTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000_000_000;
        let nanos = self.0 % 1_000_000_000;
        write!(f, "{secs}.{nanos:09}")
    }
}

/// Dependency operator used on a dependency line.
///
/// - `Depends` (`:`): the usual operator; commands may be given once.
/// - `Force` (`!`): the target is always remade.
/// - `DoubleDep` (`::`): every line creates an independent cohort with its
///   own sources and commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DependencyOp {
    #[default]
    Depends,
    Force,
    DoubleDep,
}

impl DependencyOp {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyOp::Depends => ":",
            DependencyOp::Force => "!",
            DependencyOp::DoubleDep => "::",
        }
    }
}

impl FromStr for DependencyOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ":" => Ok(DependencyOp::Depends),
            "!" => Ok(DependencyOp::Force),
            "::" => Ok(DependencyOp::DoubleDep),
            other => Err(format!(
                "invalid dependency operator: {other:?} (expected \":\", \"::\" or \"!\")"
            )),
        }
    }
}

impl TryFrom<String> for DependencyOp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Order in which the unmade children of a deferred node are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildOrder {
    /// Declaration order (left to right on dependency lines).
    #[default]
    Declared,
    /// Shuffled on every scan, to shake out missing dependencies.
    Random,
}

impl FromStr for ChildOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "declared" => Ok(ChildOrder::Declared),
            "random" => Ok(ChildOrder::Random),
            other => Err(format!(
                "invalid child_order: {other} (expected \"declared\" or \"random\")"
            )),
        }
    }
}
