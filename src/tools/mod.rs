//! Guarded Command Execution
//!
//! This module turns an untrusted command line into a subprocess, but only if
//! the program and every argument are whitelisted. No shell is ever involved.
//!
//! # Security Features
//!
//! - **Shell-free Tokenizing**: quotes and escapes are interpreted here, so
//!   `|`, `;`, `$(...)` reach the validator as plain arguments
//! - **Command Whitelisting**: only programs with a rule may run
//! - **Argument Rules**: literal and pattern matchers, deny overrides allow
//! - **List Invocation**: commands are executed as argument vectors
//! - **Timeout Enforcement**: SIGTERM, then SIGKILL after a grace period
//! - **Bounded Output**: each stream is capped and marked when truncated
//!
//! # Architecture
//!
//! The module is organized into:
//! - `tokenizer.rs`: command line to argv
//! - `rules.rs` / `defaults.rs`: matchers, rules, and the built-in whitelist
//! - `validator.rs`: command validation against a rule set
//! - `executor.rs` / `capture.rs`: subprocess execution and output capture
//! - `timeout.rs`: timeout policy and termination
//! - `guard.rs`: the full pipeline
//!
//! # Example
//!
//! ```no_run
//! use execguard::tools::{CommandGuard, GuardError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = CommandGuard::new();
//!
//!     match guard.run("ls -la").await {
//!         Ok(output) => println!("{}", output.stdout),
//!         Err(GuardError::Validation(e)) => eprintln!("rejected: {}", e),
//!         Err(e) => eprintln!("failed: {}", e),
//!     }
//! }
//! ```

mod capture;
mod defaults;
mod executor;
mod guard;
mod rules;
mod timeout;
mod tokenizer;
mod validator;

#[cfg(test)]
mod proptests;

pub use capture::{CappedBuffer, CapturedStream, TRUNCATION_MARKER};
pub use defaults::default_rule_set;
pub use executor::{
    CommandOutput, ExecutionError, ExecutorConfig, ToolExecutor, DEFAULT_TIMEOUT_SECS,
    MAX_OUTPUT_SIZE,
};
pub use guard::{CommandGuard, GuardError};
pub use rules::{ArgMatcher, Rule, RuleError, RuleSet};
pub use timeout::ExecutionTimeout;
pub use tokenizer::{tokenize, TokenizeError};
pub use validator::{CommandValidator, SafeCommand, ValidationError};
