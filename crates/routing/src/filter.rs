//! Meter-name filter
//!
//! Patterns use shell-style globbing: `*` matches any run of characters and
//! `?` matches one. A leading `!` excludes. A filter is either all
//! inclusions or all exclusions; an exclusion-only filter matches everything
//! not excluded. `*` on its own matches everything and cannot be combined
//! with other patterns.

use regex::RegexSet;

use crate::{Result, RoutingError};

#[derive(Debug, Clone)]
enum Mode {
    All,
    Include(RegexSet),
    Exclude(RegexSet),
}

/// Compiled source filter for one pipeline
#[derive(Debug, Clone)]
pub struct MeterFilter {
    mode: Mode,
    patterns: Vec<String>,
}

impl MeterFilter {
    /// Compile a list of patterns
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(RoutingError::EmptyFilter);
        }

        let raw: Vec<&str> = patterns.iter().map(AsRef::as_ref).collect();
        let excluded: Vec<&str> = raw.iter().filter_map(|p| p.strip_prefix('!')).collect();
        let included: Vec<&str> = raw.iter().copied().filter(|p| !p.starts_with('!')).collect();

        if !excluded.is_empty() && !included.is_empty() {
            return Err(RoutingError::invalid_pattern(
                raw.join(", "),
                "cannot mix included and excluded patterns",
            ));
        }
        if included.contains(&"*") && included.len() > 1 {
            return Err(RoutingError::invalid_pattern(
                raw.join(", "),
                "'*' already matches everything",
            ));
        }
        if let Some(p) = raw.iter().find(|p| p.is_empty() || **p == "!") {
            return Err(RoutingError::invalid_pattern(*p, "empty pattern"));
        }

        let mode = if included == ["*"] {
            Mode::All
        } else if excluded.is_empty() {
            Mode::Include(build_set(&included)?)
        } else {
            Mode::Exclude(build_set(&excluded)?)
        };

        Ok(Self {
            mode,
            patterns: raw.into_iter().map(str::to_string).collect(),
        })
    }

    /// Filter that matches every name
    pub fn all() -> Self {
        Self {
            mode: Mode::All,
            patterns: vec!["*".to_string()],
        }
    }

    /// Whether `name` passes the filter
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        match &self.mode {
            Mode::All => true,
            Mode::Include(set) => set.is_match(name),
            Mode::Exclude(set) => !set.is_match(name),
        }
    }

    /// Patterns as configured
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn build_set(globs: &[&str]) -> Result<RegexSet> {
    let regexes: Vec<String> = globs.iter().map(|g| glob_to_regex(g)).collect();
    RegexSet::new(&regexes).map_err(|e| RoutingError::invalid_pattern(globs.join(", "), e.to_string()))
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    for ch in glob.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}
