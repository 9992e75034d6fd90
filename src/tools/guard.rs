//! Command Guard
//!
//! The full pipeline: tokenize a command line, validate the resulting argv
//! against the whitelist, and only then hand it to the executor.

use super::executor::{CommandOutput, ExecutionError, ExecutorConfig, ToolExecutor};
use super::rules::RuleSet;
use super::tokenizer::{tokenize, TokenizeError};
use super::validator::{CommandValidator, SafeCommand, ValidationError};
use tracing::debug;

/// Any failure of the guarded pipeline
///
/// Every variant renders a single message naming the cause; callers that
/// need more can match on the variant.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] TokenizeError),

    #[error("Empty command")]
    EmptyCommand,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Tokenizer, validator and executor wired together
#[derive(Debug, Clone, Default)]
pub struct CommandGuard {
    validator: CommandValidator,
    executor: ToolExecutor,
}

impl CommandGuard {
    /// Create a guard with the default rules and executor configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a guard from a rule set and executor configuration
    pub fn with_rules(rules: RuleSet, config: ExecutorConfig) -> Self {
        Self {
            validator: CommandValidator::new(rules),
            executor: ToolExecutor::with_config(config),
        }
    }

    /// Tokenize and validate without executing
    pub fn check(&self, command_line: &str) -> Result<SafeCommand, GuardError> {
        let tokens = tokenize(command_line)?;
        debug!("Tokens: {:?}", tokens);

        let (program, args) = tokens.split_first().ok_or(GuardError::EmptyCommand)?;
        Ok(self.validator.validate(program, args)?)
    }

    /// Tokenize, validate and execute a command line
    ///
    /// # Example
    ///
    /// ```no_run
    /// use execguard::tools::CommandGuard;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let guard = CommandGuard::new();
    ///     let output = guard.run("git status --short").await?;
    ///     println!("{}", output.stdout);
    ///     Ok(())
    /// }
    /// ```
    pub async fn run(&self, command_line: &str) -> Result<CommandOutput, GuardError> {
        let command = self.check(command_line)?;
        Ok(self.executor.execute(&command).await?)
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::rules::{ArgMatcher, Rule};
    use std::time::Duration;

    fn npm_guard() -> CommandGuard {
        let rules = RuleSet::new(vec![Rule::new("npm").allow(vec![
            ArgMatcher::literal("install"),
            ArgMatcher::pattern(r"^[\w@/.-]+$").unwrap(),
        ])])
        .unwrap();
        CommandGuard::with_rules(rules, ExecutorConfig::default())
    }

    #[test]
    fn test_check_accepts_valid_line() {
        let command = npm_guard().check("npm install my-package").unwrap();
        assert_eq!(command.command(), "npm");
        assert_eq!(command.args(), &["install", "my-package"]);
    }

    #[test]
    fn test_check_rejects_pipe() {
        let err = npm_guard().check("npm install | bash").unwrap_err();
        match err {
            GuardError::Validation(ValidationError::ArgumentNotAllowed { argument, program }) => {
                assert_eq!(argument, "|");
                assert_eq!(program, "npm");
            }
            other => panic!("expected ArgumentNotAllowed, got {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_unknown_program() {
        let err = npm_guard().check("rm -rf /").unwrap_err();
        assert!(matches!(
            err,
            GuardError::Validation(ValidationError::CommandNotWhitelisted { .. })
        ));
    }

    #[test]
    fn test_check_unclosed_quote() {
        let err = npm_guard().check(r#"npm install "left-pad"#).unwrap_err();
        assert!(matches!(err, GuardError::Syntax(TokenizeError::UnclosedQuote('"'))));
        assert_eq!(err.to_string(), "Syntax error: Unclosed quote \"");
    }

    #[test]
    fn test_check_empty_line() {
        assert!(matches!(npm_guard().check(""), Err(GuardError::EmptyCommand)));
        assert!(matches!(npm_guard().check("  \t "), Err(GuardError::EmptyCommand)));
    }

    #[test]
    fn test_quoted_program_name_is_unquoted() {
        let rules = RuleSet::new(vec![Rule::new("echo")]).unwrap();
        let guard = CommandGuard::with_rules(rules, ExecutorConfig::default());

        assert_eq!(guard.check(r#""echo" hi"#).unwrap().command(), "echo");
    }

    #[test]
    fn test_validation_messages_pass_through() {
        let err = npm_guard().check("npm ;").unwrap_err();
        assert_eq!(err.to_string(), "Argument not allowed: ';' for command 'npm'");
    }

    #[tokio::test]
    async fn test_run_executes_accepted_command() {
        let rules = RuleSet::new(vec![Rule::new("echo")]).unwrap();
        let guard = CommandGuard::with_rules(rules, ExecutorConfig::default());

        let output = guard.run("echo 'hello world'").await.unwrap();
        assert_eq!(output.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn test_run_rejected_command_never_spawns() {
        let rules = RuleSet::new(vec![Rule::new("echo")]).unwrap();
        let guard = CommandGuard::with_rules(rules, ExecutorConfig::default());

        let err = guard.run("touch /tmp/should-not-exist").await.unwrap_err();
        assert!(matches!(err, GuardError::Validation(_)));
    }

    #[tokio::test]
    async fn test_run_surfaces_timeout() {
        let rules = RuleSet::new(vec![Rule::new("sleep")]).unwrap();
        let guard = CommandGuard::with_rules(
            rules,
            ExecutorConfig::with_timeout(Duration::from_millis(200)),
        );

        let err = guard.run("sleep 5").await.unwrap_err();
        assert!(matches!(err, GuardError::Execution(ExecutionError::Timeout { .. })));
    }
}
