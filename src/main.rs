// ExecGuard - Main Entry Point
//
// CLI over the guarded execution pipeline:
// - run: tokenize, validate, execute
// - check: tokenize and validate only
// - tokenize: show how a command line splits
// - rules: list the effective whitelist

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use execguard::config::Config;
use execguard::tools::{
    tokenize, ArgMatcher, CommandGuard, ExecutionError, ExecutionTimeout, GuardError, Rule,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// ExecGuard: whitelisted command execution without a shell
#[derive(Parser, Debug)]
#[command(name = "execguard")]
#[command(author = "ExecGuard Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Run whitelisted commands without a shell", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: ~/.config/execguard/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate and execute a command line
    Run {
        /// The command line, e.g. "git status --short"
        command_line: String,

        /// Timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Per-stream output cap in bytes (overrides config)
        #[arg(long)]
        max_output: Option<usize>,
    },
    /// Validate a command line without executing it
    Check {
        /// The command line to validate
        command_line: String,
    },
    /// Show how a command line is split into arguments
    Tokenize {
        /// The command line to tokenize
        command_line: String,
    },
    /// List the effective whitelist rules
    Rules,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path)?
        }
        None => Config::load()?,
    };

    init_tracing(&config, args.verbose)?;
    debug!("Using configuration: {:?}", config.execution);

    match args.command {
        Commands::Run {
            command_line,
            timeout,
            max_output,
        } => run_command(&config, &command_line, timeout, max_output, args.json).await,
        Commands::Check { command_line } => check_command(&config, &command_line, args.json),
        Commands::Tokenize { command_line } => tokenize_command(&command_line, args.json),
        Commands::Rules => list_rules(&config, args.json),
    }
}

/// Initialize tracing on stderr so stdout only carries command output
fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { config.log_level()? };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}

fn build_guard(
    config: &Config,
    timeout: Option<u64>,
    max_output: Option<usize>,
) -> Result<CommandGuard> {
    let rules = config.rule_set().context("Failed to build whitelist rules")?;

    let mut executor_config = config.execution.executor_config();
    if let Some(secs) = timeout {
        if secs == 0 {
            anyhow::bail!("--timeout must be > 0");
        }
        let kill_grace = executor_config.timeout.kill_grace();
        executor_config.timeout =
            ExecutionTimeout::new(Duration::from_secs(secs)).with_kill_grace(kill_grace);
    }
    if let Some(bytes) = max_output {
        if bytes == 0 {
            anyhow::bail!("--max-output must be > 0");
        }
        executor_config.max_output_size = bytes;
    }

    Ok(CommandGuard::with_rules(rules, executor_config))
}

/// Exit code for a failed pipeline: the child's code, or 1
fn failure_exit_code(err: &GuardError) -> ExitCode {
    match err {
        GuardError::Execution(ExecutionError::NonZeroExit { code, .. })
            if (1..=255).contains(code) =>
        {
            ExitCode::from(*code as u8)
        }
        _ => ExitCode::FAILURE,
    }
}

async fn run_command(
    config: &Config,
    command_line: &str,
    timeout: Option<u64>,
    max_output: Option<usize>,
    as_json: bool,
) -> Result<ExitCode> {
    let guard = build_guard(config, timeout, max_output)?;

    match guard.run(command_line).await {
        Ok(output) => {
            info!("{}", output.summary());
            if as_json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", output.stdout);
                eprint!("{}", output.stderr);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if as_json {
                let mut report = json!({ "error": err.to_string() });
                if let GuardError::Execution(ExecutionError::NonZeroExit {
                    code,
                    stdout,
                    stderr,
                    ..
                }) = &err
                {
                    report["exit_code"] = json!(code);
                    report["stdout"] = json!(stdout);
                    report["stderr"] = json!(stderr);
                }
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprintln!("Error: {}", err);
            }
            Ok(failure_exit_code(&err))
        }
    }
}

fn check_command(config: &Config, command_line: &str, as_json: bool) -> Result<ExitCode> {
    let guard = build_guard(config, None, None)?;

    match guard.check(command_line) {
        Ok(command) => {
            if as_json {
                let report = json!({
                    "allowed": true,
                    "command": command.command(),
                    "args": command.args(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("allowed: {} {:?}", command.command(), command.args());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if as_json {
                let report = json!({ "allowed": false, "error": err.to_string() });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("denied: {}", err);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn tokenize_command(command_line: &str, as_json: bool) -> Result<ExitCode> {
    let tokens = tokenize(command_line)?;

    if as_json {
        println!("{}", serde_json::to_string(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn describe_matchers(rule: &Rule) -> (Option<Vec<String>>, Option<Vec<String>>) {
    let render = |matchers: &[ArgMatcher]| {
        matchers.iter().map(ToString::to_string).collect::<Vec<_>>()
    };
    (rule.allowed().map(render), rule.denied().map(render))
}

fn list_rules(config: &Config, as_json: bool) -> Result<ExitCode> {
    let rules = config.rule_set()?;

    if as_json {
        let listing: Vec<_> = rules
            .iter()
            .map(|rule| {
                let (allowed, denied) = describe_matchers(rule);
                json!({ "program": rule.program(), "allowed": allowed, "denied": denied })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(ExitCode::SUCCESS);
    }

    for rule in rules.iter() {
        let (allowed, denied) = describe_matchers(rule);
        if rule.is_program_only() {
            println!("{} (any arguments)", rule.program());
            continue;
        }
        println!("{}", rule.program());
        if let Some(allowed) = allowed {
            println!("  allowed: {}", allowed.join(" "));
        }
        if let Some(denied) = denied {
            println!("  denied:  {}", denied.join(" "));
        }
    }
    Ok(ExitCode::SUCCESS)
}
