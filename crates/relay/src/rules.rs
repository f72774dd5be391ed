//! Ordered pattern rules that choose a destination for a message.
//!
//! Rules are evaluated top to bottom against the extracted message text and the
//! first match wins. Author them most-specific-first with a catch-all (`.*`) last;
//! a rule set without a catch-all drops unmatched messages silently.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::error::RelayError;

/// A single compiled routing rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    destination: String,
}

impl Rule {
    pub fn new(
        pattern: &str,
        case_insensitive: bool,
        destination: &str,
    ) -> Result<Self, RelayError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| {
                RelayError::Config(format!("invalid rule pattern '{}': {}", pattern, e))
            })?;
        if destination.trim().is_empty() {
            return Err(RelayError::Config(format!(
                "rule '{}' has an empty destination",
                pattern.as_str()
            )));
        }
        Ok(Self {
            pattern,
            destination: destination.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Symbolic destination reference, resolved to a channel id elsewhere.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// On-disk rule entry.
#[derive(Debug, Deserialize)]
struct RuleEntry {
    pattern: String,
    destination: String,
    #[serde(default)]
    case_insensitive: bool,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleEntry>,
}

/// Immutable, ordered list of routing rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse and compile rules from TOML (`[[rules]]` tables).
    pub fn from_toml_str(source: &str) -> Result<Self, RelayError> {
        let file: RuleFile = toml::from_str(source)
            .map_err(|e| RelayError::Config(format!("rule file parse: {}", e)))?;
        let rules = file
            .rules
            .iter()
            .map(|entry| Rule::new(&entry.pattern, entry.case_insensitive, &entry.destination))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("cannot read rule file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// First rule, in configured order, whose pattern matches `text`.
    pub fn first_match(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.is_match(text))
    }

    /// Distinct destination references, in first-use order.
    pub fn destinations(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !seen.contains(&rule.destination()) {
                seen.push(rule.destination());
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
