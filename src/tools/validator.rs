//! Command Validation Module
//!
//! This module decides whether a tokenized command may run. It uses a
//! whitelist approach: a program must have a rule, and every argument must
//! survive that rule's deny list and then its allow list.

use super::defaults::default_rule_set;
use super::rules::RuleSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error types for command validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Command not whitelisted: '{program}'")]
    CommandNotWhitelisted { program: String },

    #[error("Argument explicitly denied: '{argument}' for command '{program}'")]
    ArgumentDenied { argument: String, program: String },

    #[error("Argument not allowed: '{argument}' for command '{program}'")]
    ArgumentNotAllowed { argument: String, program: String },
}

impl ValidationError {
    /// The offending argument, if the rejection was argument-level
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::CommandNotWhitelisted { .. } => None,
            Self::ArgumentDenied { argument, .. } | Self::ArgumentNotAllowed { argument, .. } => {
                Some(argument)
            }
        }
    }
}

/// Safe command wrapper that has been validated
///
/// Only [`CommandValidator::validate`] can create one, so holding a
/// `SafeCommand` means the exact `(command, args)` pair was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeCommand {
    command: String,
    args: Vec<String>,
}

impl SafeCommand {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the command and args as a tuple for subprocess execution
    pub fn as_tuple(&self) -> (&str, &[String]) {
        (&self.command, &self.args)
    }
}

/// Command validator that enforces a [`RuleSet`]
///
/// # Security Principles
///
/// 1. **Whitelist Only**: programs without a rule are rejected
/// 2. **Deny Overrides Allow**: a denied argument is rejected even if allowed
/// 3. **Per-Argument Checks**: every argument is checked on its own
#[derive(Debug, Clone)]
pub struct CommandValidator {
    rules: Arc<RuleSet>,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl CommandValidator {
    /// Create a validator over the compiled-in default rules
    pub fn with_default_rules() -> Self {
        Self::new(default_rule_set().clone())
    }

    /// Create a validator over a custom rule set
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Validate a command and its arguments
    ///
    /// # Example
    ///
    /// ```
    /// use execguard::tools::{ArgMatcher, CommandValidator, Rule, RuleSet};
    ///
    /// let rules = RuleSet::new(vec![
    ///     Rule::new("npm").allow(vec![ArgMatcher::literal("install")]),
    /// ]).unwrap();
    /// let validator = CommandValidator::new(rules);
    ///
    /// assert!(validator.validate("npm", &["install"]).is_ok());
    /// assert!(validator.validate("npm", &["publish"]).is_err());
    /// ```
    pub fn validate<S: AsRef<str>>(
        &self,
        command: &str,
        args: &[S],
    ) -> Result<SafeCommand, ValidationError> {
        let rule = self.rules.get(command).ok_or_else(|| {
            warn!("Rejected command not in whitelist: {}", command);
            ValidationError::CommandNotWhitelisted {
                program: command.to_string(),
            }
        })?;

        if !rule.is_program_only() {
            for arg in args.iter().map(AsRef::as_ref) {
                if rule.denies(arg) {
                    warn!("Rejected denied argument {:?} for {}", arg, command);
                    return Err(ValidationError::ArgumentDenied {
                        argument: arg.to_string(),
                        program: command.to_string(),
                    });
                }

                if !rule.allows(arg) {
                    warn!("Rejected argument {:?} not allowed for {}", arg, command);
                    return Err(ValidationError::ArgumentNotAllowed {
                        argument: arg.to_string(),
                        program: command.to_string(),
                    });
                }
            }
        }

        debug!("Command validated: {} ({} args)", command, args.len());
        Ok(SafeCommand {
            command: command.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        })
    }

    /// Get the rule set this validator enforces
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Check if a command is in the whitelist
    pub fn is_allowed(&self, command: &str) -> bool {
        self.rules.is_allowed(command)
    }
}
