//! ExecGuard Library
//!
//! Whitelisted command execution for agents: tokenize a command line without
//! a shell, authorize the program and each argument against a rule set, and
//! run it under a timeout with bounded output.

pub mod config;
pub mod tools;
