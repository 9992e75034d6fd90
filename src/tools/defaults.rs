//! Default Whitelist
//!
//! The rule set used when no configuration supplies one: common read-only
//! utilities, build tools, and version control, with arguments restricted
//! where a program can be turned into a general-purpose executor.

use super::rules::{ArgMatcher, Rule, RuleSet};
use std::sync::LazyLock;

/// Plain words, flags, paths and package specs; no shell metacharacters
const SAFE_WORD: &str = r"^[\w@/.,:=+~^-]+$";

/// npm package names and specs, e.g. `@scope/pkg@1.2.3`
const PACKAGE_SPEC: &str = r"^[\w@/.^~-]+$";

/// Free text (commit messages, search terms) without shell metacharacters
const SAFE_TEXT: &str = r"^[^;&|`$<>\\]*$";

static DEFAULT_RULES: LazyLock<RuleSet> = LazyLock::new(build_default_rules);

/// Get the compiled-in default rule set
pub fn default_rule_set() -> &'static RuleSet {
    &DEFAULT_RULES
}

fn literals(values: &[&str]) -> Vec<ArgMatcher> {
    values.iter().map(|v| ArgMatcher::literal(*v)).collect()
}

fn pattern(pattern: &str) -> ArgMatcher {
    ArgMatcher::pattern(pattern).expect("invalid built-in argument pattern")
}

fn build_default_rules() -> RuleSet {
    let mut rules: Vec<Rule> = [
        // Read-only file and text utilities
        "ls", "cat", "head", "tail", "wc", "pwd", "echo", "grep", "diff", "tree", "file",
        "stat", "du", "df", "which", "whoami", "date", "uname", "sort", "uniq",
    ]
    .into_iter()
    .map(Rule::new)
    .collect();

    rules.push(Rule::new("find").deny(literals(&[
        "-exec", "-execdir", "-ok", "-okdir", "-delete", "-fprint", "-fprint0", "-fprintf",
        "-fls",
    ])));

    rules.push(
        Rule::new("git")
            .allow({
                let mut allowed = literals(&[
                    "status", "log", "diff", "show", "branch", "tag", "add", "commit", "checkout",
                    "switch", "restore", "fetch", "pull", "push", "merge", "stash", "remote",
                    "rev-parse", "blame", "describe", "ls-files", "init",
                ]);
                allowed.push(pattern(SAFE_TEXT));
                allowed
            })
            .deny({
                let mut denied = literals(&[
                    "-c", "-C", "--exec", "--exec-path", "--upload-pack", "--receive-pack",
                    "--config-env", "filter-branch", "config",
                ]);
                denied.push(pattern(r"^--(upload-pack|receive-pack|exec|exec-path|config-env)="));
                denied
            }),
    );

    rules.push(
        Rule::new("npm")
            .allow({
                let mut allowed = literals(&[
                    "install", "ci", "test", "run", "list", "ls", "outdated", "audit", "view",
                    "--version", "-v", "--save-dev", "-D",
                ]);
                allowed.push(pattern(PACKAGE_SPEC));
                allowed
            })
            .deny(literals(&[
                "publish", "unpublish", "exec", "x", "login", "logout", "adduser", "token",
                "owner", "access", "--unsafe-perm",
            ])),
    );

    rules.push(
        Rule::new("cargo")
            .allow({
                let mut allowed = literals(&[
                    "build", "check", "test", "fmt", "clippy", "doc", "tree", "metadata",
                    "--release", "--workspace", "--all-targets", "--all-features", "--version",
                ]);
                allowed.push(pattern(SAFE_WORD));
                allowed
            })
            .deny({
                let mut denied =
                    literals(&["install", "publish", "login", "owner", "yank", "--config"]);
                denied.push(pattern(r"^--config="));
                denied
            }),
    );

    for program in ["node", "python", "python3", "rustc", "go", "java"] {
        rules.push(Rule::new(program).allow(literals(&["--version", "-V", "version"])));
    }

    RuleSet::new(rules).expect("built-in rule set has duplicate commands")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_set_builds() {
        let rules = default_rule_set();
        assert!(!rules.is_empty());
        assert!(rules.is_allowed("ls"));
        assert!(rules.is_allowed("git"));
        assert!(rules.is_allowed("npm"));
        assert!(rules.is_allowed("cargo"));
    }

    #[test]
    fn test_shells_are_not_whitelisted() {
        let rules = default_rule_set();
        for shell in ["sh", "bash", "zsh", "fish", "env", "xargs", "sudo", "rm", "curl"] {
            assert!(!rules.is_allowed(shell), "{} must not be whitelisted", shell);
        }
    }

    #[test]
    fn test_read_only_utilities_are_program_only() {
        let rules = default_rule_set();
        assert!(rules.get("cat").unwrap().is_program_only());
        assert!(rules.get("grep").unwrap().is_program_only());
    }

    #[test]
    fn test_find_denies_exec() {
        let find = default_rule_set().get("find").unwrap();
        assert!(find.denies("-exec"));
        assert!(find.denies("-delete"));
        assert!(!find.denies("-name"));
    }

    #[test]
    fn test_git_rules() {
        let git = default_rule_set().get("git").unwrap();
        assert!(git.allows("status"));
        assert!(git.allows("fix the parser"));
        assert!(!git.allows("a; rm -rf /"));
        assert!(git.denies("-c"));
        assert!(git.denies("--upload-pack=evil"));
        assert!(git.denies("--exec-path"));
        assert!(git.denies("--exec-path=/tmp/evil"));
    }

    #[test]
    fn test_npm_rules() {
        let npm = default_rule_set().get("npm").unwrap();
        assert!(npm.allows("install"));
        assert!(npm.allows("@scope/pkg@1.2.3"));
        assert!(!npm.allows("|"));
        assert!(npm.denies("publish"));
    }

    #[test]
    fn test_version_only_interpreters() {
        let node = default_rule_set().get("node").unwrap();
        assert!(node.allows("--version"));
        assert!(!node.allows("-e"));
        assert!(!node.allows("script.js"));
    }

    #[test]
    fn test_default_rule_set_is_shared() {
        assert!(std::ptr::eq(default_rule_set(), default_rule_set()));
    }
}
