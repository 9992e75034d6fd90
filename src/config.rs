// Configuration File Support
//
// This module provides configuration file parsing for execguard.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from XDG config directory: ~/.config/execguard/config.toml

use crate::tools::{
    default_rule_set, ArgMatcher, ExecutionTimeout, ExecutorConfig, Rule, RuleSet,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Subprocess execution limits
    pub execution: ExecutionConfig,

    /// Whitelist rules; the built-in defaults apply when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleConfig>>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock limit per command in seconds
    pub timeout_secs: u64,

    /// Maximum bytes kept per output stream
    pub max_output_bytes: usize,

    /// Time between SIGTERM and SIGKILL on timeout, in milliseconds
    pub kill_grace_ms: u64,

    /// Working directory for commands (default: current directory)
    pub working_dir: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_output_bytes: 1024 * 1024,
            kill_grace_ms: 2000,
            working_dir: None,
        }
    }
}

impl ExecutionConfig {
    /// Build the executor configuration
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout: ExecutionTimeout::from_secs(self.timeout_secs)
                .with_kill_grace(Duration::from_millis(self.kill_grace_ms)),
            max_output_size: self.max_output_bytes,
            working_dir: self.working_dir.as_ref().map(PathBuf::from),
        }
    }
}

/// One whitelist rule as written in the config file
///
/// ```toml
/// [[rules]]
/// program = "npm"
/// allowed = ["install", "/^[\\w@/.-]+$/"]
/// denied = ["publish", { pattern = "^--registry" }]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfig {
    /// Program name, matched exactly
    pub program: String,

    /// Allowed argument matchers (any argument when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<MatcherConfig>>,

    /// Denied argument matchers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied: Option<Vec<MatcherConfig>>,
}

/// A matcher entry: a string in `literal` or `/pattern/flags` notation, or an
/// explicit table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MatcherConfig {
    Text(String),
    Literal {
        literal: String,
    },
    Pattern {
        pattern: String,
        #[serde(default)]
        flags: String,
    },
}

impl MatcherConfig {
    fn compile(&self) -> Result<ArgMatcher> {
        let matcher = match self {
            Self::Text(text) => ArgMatcher::parse(text)?,
            Self::Literal { literal } => ArgMatcher::literal(literal.as_str()),
            Self::Pattern { pattern, flags } => ArgMatcher::pattern_with_flags(pattern, flags)?,
        };
        Ok(matcher)
    }
}

impl RuleConfig {
    fn compile(&self) -> Result<Rule> {
        let compile_all = |matchers: &[MatcherConfig]| -> Result<Vec<ArgMatcher>> {
            matchers.iter().map(MatcherConfig::compile).collect()
        };

        let mut rule = Rule::new(self.program.as_str());
        if let Some(ref allowed) = self.allowed {
            rule = rule.allow(compile_all(allowed)?);
        }
        if let Some(ref denied) = self.denied {
            rule = rule.deny(compile_all(denied)?);
        }
        Ok(rule)
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or is
    /// invalid. If the config file does not exist, returns default
    /// configuration with environment overrides applied.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            let config = Self::default().apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file from {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file from {:?}", path))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse, apply environment overrides, and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/execguard/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "execguard", "execguard") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback if XDG dirs cannot be determined
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config").join("execguard").join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - EXECGUARD_LOG_LEVEL
    /// - EXECGUARD_LOG_FORMAT
    /// - EXECGUARD_TIMEOUT_SECS
    /// - EXECGUARD_MAX_OUTPUT_BYTES
    /// - EXECGUARD_KILL_GRACE_MS
    /// - EXECGUARD_WORKING_DIR
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("EXECGUARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("EXECGUARD_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(secs) = std::env::var("EXECGUARD_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                if secs > 0 {
                    self.execution.timeout_secs = secs;
                }
            }
        }
        if let Ok(bytes) = std::env::var("EXECGUARD_MAX_OUTPUT_BYTES") {
            if let Ok(bytes) = bytes.parse::<usize>() {
                if bytes > 0 {
                    self.execution.max_output_bytes = bytes;
                }
            }
        }
        if let Ok(grace) = std::env::var("EXECGUARD_KILL_GRACE_MS") {
            if let Ok(grace) = grace.parse::<u64>() {
                self.execution.kill_grace_ms = grace;
            }
        }
        if let Ok(dir) = std::env::var("EXECGUARD_WORKING_DIR") {
            self.execution.working_dir = Some(dir);
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, including rules that
    /// fail to compile.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.execution.timeout_secs == 0 {
            anyhow::bail!("Execution timeout must be > 0 seconds");
        }
        if self.execution.max_output_bytes == 0 {
            anyhow::bail!("Maximum output size must be > 0 bytes");
        }

        self.rule_set()?;
        Ok(())
    }

    /// Build the effective rule set
    ///
    /// Returns the built-in defaults when the config has no `rules`.
    pub fn rule_set(&self) -> Result<RuleSet> {
        let Some(ref rules) = self.rules else {
            return Ok(default_rule_set().clone());
        };

        let compiled = rules
            .iter()
            .map(|rule| {
                rule.compile()
                    .with_context(|| format!("Invalid rule for command '{}'", rule.program))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RuleSet::new(compiled)?)
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging.level.to_lowercase().parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}
