//! Exclusion rules for deployment
//!
//! A rule is either a literal substring or a regular expression. Literal rules
//! match against the base name and the relative path; pattern rules match the
//! relative path only. Relative paths always use `/` separators.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Exclusion rule as written in the configuration file
///
/// A plain string is a literal, `{ pattern: "..." }` is a regular expression:
///
/// ```yaml
/// exclude_patterns:
///   - node_modules
///   - pattern: '\.bak$'
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Literal(String),
    Pattern { pattern: String },
}

impl RuleSpec {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
        }
    }
}

/// A compiled exclusion rule
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    /// Matches when the text occurs in the base name or the relative path
    Literal(String),
    /// Matches when the regex finds a match in the relative path
    Pattern(Regex),
}

impl ExclusionRule {
    /// Compile a configuration entry into a rule
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        match spec {
            RuleSpec::Literal(text) => {
                if text.is_empty() {
                    bail!("Empty literal exclusion rule would exclude every file");
                }
                Ok(Self::Literal(text.clone()))
            }
            RuleSpec::Pattern { pattern } => {
                let regex = Regex::new(pattern)
                    .with_context(|| format!("Invalid exclusion pattern: {}", pattern))?;
                Ok(Self::Pattern(regex))
            }
        }
    }

    /// Check whether this rule matches a path relative to the local root
    pub fn matches(&self, relative_path: &str) -> bool {
        match self {
            Self::Literal(text) => {
                base_name(relative_path).contains(text.as_str())
                    || relative_path.contains(text.as_str())
            }
            Self::Pattern(regex) => regex.is_match(relative_path),
        }
    }
}

/// Ordered set of exclusion rules
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRules {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        Self { rules }
    }

    /// Compile every configuration entry, failing on the first invalid one
    pub fn compile(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(ExclusionRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Returns true as soon as any rule matches
    pub fn should_exclude(&self, relative_path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(relative_path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Last `/`-separated component of a relative path
fn base_name(relative_path: &str) -> &str {
    relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
}

/// Rules applied when the configuration does not list any
pub fn default_rule_specs() -> Vec<RuleSpec> {
    let literals = [
        // Development files
        ".DS_Store",
        "Thumbs.db",
        ".env",
        ".env.local",
        ".env.example",
        // Version control
        ".git",
        ".gitignore",
        // Documentation
        "README.md",
        "BUILD.md",
        "dev-start.md",
        "setup.md",
        // Node.js
        "node_modules",
        "package.json",
        "package-lock.json",
        // Build scripts
        "scripts",
        "sitesync.yml",
        ".github",
        // IDE files
        ".vscode",
        ".idea",
    ];

    let patterns = [
        r"\.log$",
        // Hidden files at the root
        r"^\..*",
        r".*\.tmp$",
        r".*\.bak$",
    ];

    literals
        .into_iter()
        .map(RuleSpec::literal)
        .chain(patterns.into_iter().map(RuleSpec::pattern))
        .collect()
}
