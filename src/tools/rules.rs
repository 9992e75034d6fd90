//! Whitelist Rules
//!
//! A [`RuleSet`] maps program names to [`Rule`]s. Each rule optionally carries
//! a list of allowed and a list of denied [`ArgMatcher`]s that are applied to
//! every argument independently.

use regex::{Regex, RegexBuilder};
use std::fmt;

/// Error types for rule construction
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid argument pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unsupported pattern flag '{flag}' in '{pattern}'")]
    UnsupportedFlag { pattern: String, flag: char },

    #[error("Duplicate rule for command '{0}'")]
    DuplicateRule(String),

    #[error("Rule has an empty command name")]
    EmptyProgram,
}

/// A test applied to a single argument token
#[derive(Debug, Clone)]
pub enum ArgMatcher {
    /// Exact string equality
    Literal(String),

    /// Regular expression search (anchor with `^...$` for a full match)
    Pattern {
        regex: Regex,
        /// Flag letters as written, kept for display
        flags: String,
    },
}

impl ArgMatcher {
    /// Create a literal matcher
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Compile a pattern matcher with no flags
    pub fn pattern(pattern: &str) -> Result<Self, RuleError> {
        Self::pattern_with_flags(pattern, "")
    }

    /// Compile a pattern matcher with JavaScript-style flags
    ///
    /// Supported flags: `i` (case-insensitive), `m` (multi-line), `s` (dot
    /// matches newline), `u` (unicode, always on). `g` and `y` have no meaning
    /// for a single-argument test and are accepted and ignored.
    pub fn pattern_with_flags(pattern: &str, flags: &str) -> Result<Self, RuleError> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'u' | 'g' | 'y' => {}
                other => {
                    return Err(RuleError::UnsupportedFlag {
                        pattern: pattern.to_string(),
                        flag: other,
                    })
                }
            }
        }

        builder
            .build()
            .map(|regex| Self::Pattern {
                regex,
                flags: flags.to_string(),
            })
            .map_err(|source| RuleError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Parse the textual matcher notation used in configuration files
    ///
    /// `/body/flags` becomes a pattern when every character after the last
    /// slash is a known flag letter; anything else is a literal. This keeps
    /// paths such as `/usr/bin` literal while `/^v\d+$/` and `/^src\//i`
    /// become patterns.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        match split_pattern_notation(text) {
            Some((body, flags)) => Self::pattern_with_flags(body, flags),
            None => Ok(Self::literal(text)),
        }
    }

    /// Check whether this matcher accepts `arg`
    pub fn matches(&self, arg: &str) -> bool {
        match self {
            Self::Literal(value) => value == arg,
            Self::Pattern { regex, .. } => regex.is_match(arg),
        }
    }
}

/// Renders the config notation: patterns as `/body/flags`, literals bare,
/// and literals that would read back as a pattern in double quotes
impl fmt::Display for ArgMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) if split_pattern_notation(value).is_some() => {
                write!(f, "{:?}", value)
            }
            Self::Literal(value) => write!(f, "{}", value),
            Self::Pattern { regex, flags } => write!(f, "/{}/{}", regex.as_str(), flags),
        }
    }
}

const PATTERN_FLAGS: &[char] = &['i', 'm', 's', 'u', 'g', 'y'];

fn split_pattern_notation(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);

    if body.is_empty() || !flags.chars().all(|c| PATTERN_FLAGS.contains(&c)) {
        return None;
    }

    Some((body, flags))
}

/// Per-program whitelist record
#[derive(Debug, Clone)]
pub struct Rule {
    program: String,
    allowed: Option<Vec<ArgMatcher>>,
    denied: Option<Vec<ArgMatcher>>,
}

impl Rule {
    /// Allow `program` with any arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            allowed: None,
            denied: None,
        }
    }

    /// Restrict arguments to those matching one of `matchers`
    pub fn allow(mut self, matchers: Vec<ArgMatcher>) -> Self {
        self.allowed = Some(matchers);
        self
    }

    /// Reject any argument matching one of `matchers`
    pub fn deny(mut self, matchers: Vec<ArgMatcher>) -> Self {
        self.denied = Some(matchers);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn allowed(&self) -> Option<&[ArgMatcher]> {
        self.allowed.as_deref()
    }

    pub fn denied(&self) -> Option<&[ArgMatcher]> {
        self.denied.as_deref()
    }

    /// Whether the rule places no constraint on arguments
    pub fn is_program_only(&self) -> bool {
        self.allowed.is_none() && self.denied.is_none()
    }

    /// Whether any denied matcher accepts `arg`
    pub fn denies(&self, arg: &str) -> bool {
        self.denied
            .as_ref()
            .is_some_and(|matchers| matchers.iter().any(|m| m.matches(arg)))
    }

    /// Whether `arg` passes the allow list (always true without one)
    pub fn allows(&self, arg: &str) -> bool {
        self.allowed
            .as_ref()
            .map_or(true, |matchers| matchers.iter().any(|m| m.matches(arg)))
    }
}

/// Ordered, immutable collection of rules with one rule per program
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, rejecting empty and duplicate program names
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.program.is_empty() {
                return Err(RuleError::EmptyProgram);
            }
            if rules[..i].iter().any(|r| r.program == rule.program) {
                return Err(RuleError::DuplicateRule(rule.program.clone()));
            }
        }

        Ok(Self { rules })
    }

    /// Look up the rule for `program` by exact name
    pub fn get(&self, program: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.program == program)
    }

    /// Check if a program is whitelisted
    pub fn is_allowed(&self, program: &str) -> bool {
        self.get(program).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
