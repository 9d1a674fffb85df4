// src/graph/vars.rs

//! Node-local variables (`.TARGET`, `.IMPSRC`, ...) and their substitution
//! into recipe lines.
//!
//! Only the seven local variables are substituted, in their long (`.TARGET`)
//! and short (`@`) spellings, as `$@`, `${.TARGET}` or `$(@)`. `$$` becomes a
//! literal `$`. Any other reference is left in the line untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

static LOCAL_REF: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([^}]*)\}|\(([^)]*)\)|([@<*>?%!^]))").ok()
});

/// Local variables bound on a node before its recipe runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVars {
    /// `.TARGET` / `@`
    pub target: Option<String>,
    /// `.PREFIX` / `*`
    pub prefix: Option<String>,
    /// `.IMPSRC` / `<`
    pub impsrc: Option<String>,
    /// `.MEMBER` / `%`
    pub member: Option<String>,
    /// `.ARCHIVE` / `!`
    pub archive: Option<String>,
    /// `.ALLSRC` / `>` / `^`
    pub allsrc: Vec<String>,
    /// `.OODATE` / `?`
    pub oodate: Vec<String>,
}

impl LocalVars {
    /// Look up a local variable by its long or short name.
    pub fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "@" | ".TARGET" => self.target.clone(),
            "*" | ".PREFIX" => self.prefix.clone(),
            "<" | ".IMPSRC" => self.impsrc.clone(),
            "%" | ".MEMBER" => self.member.clone(),
            "!" | ".ARCHIVE" => self.archive.clone(),
            ">" | "^" | ".ALLSRC" => Some(self.allsrc.join(" ")),
            "?" | ".OODATE" => Some(self.oodate.join(" ")),
            _ => None,
        }
    }

    /// Substitute local variable references in a recipe line.
    pub fn expand(&self, line: &str) -> String {
        let Some(re) = LOCAL_REF.as_ref() else {
            warn!("local variable pattern failed to compile; leaving line as-is");
            return line.to_string();
        };

        re.replace_all(line, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match self.lookup(name) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
    }
}
