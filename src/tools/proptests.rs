//! Property-Based Tests for the Command Pipeline
//!
//! # Properties
//!
//! - **Tokenizer**: unquoted words split on whitespace exactly like
//!   `split_whitespace`; quoting any word keeps it as one token; tokens never
//!   come back empty
//! - **Validator**: validation is deterministic, and a denied argument is
//!   rejected no matter where it appears or what the allow list says
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib tools::proptests
//! ```

use proptest::prelude::*;

use crate::tools::rules::{ArgMatcher, Rule, RuleSet};
use crate::tools::tokenizer::tokenize;
use crate::tools::validator::{CommandValidator, ValidationError};

// Helper: words with no quotes, backslashes or whitespace
fn arb_plain_word() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./@:=+,|;&$()<>*?-]{1,12}"
}

// Helper: text safe to wrap in double quotes
fn arb_quotable_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 '\t|;&$-]{1,20}"
}

proptest! {
    #[test]
    fn prop_plain_words_split_like_whitespace(
        words in prop::collection::vec(arb_plain_word(), 0..8),
        sep in "[ \t\n\r]{1,3}"
    ) {
        let line = words.join(&sep);
        let tokens = tokenize(&line).unwrap();
        let expected: Vec<String> = line.split_whitespace().map(String::from).collect();
        prop_assert_eq!(tokens, expected);
    }

    #[test]
    fn prop_double_quoted_text_is_one_token(text in arb_quotable_text()) {
        let line = format!("echo \"{}\"", text);
        let tokens = tokenize(&line).unwrap();
        prop_assert_eq!(tokens, vec!["echo".to_string(), text]);
    }

    #[test]
    fn prop_tokens_are_never_empty(line in ".{0,40}") {
        if let Ok(tokens) = tokenize(&line) {
            prop_assert!(tokens.iter().all(|t| !t.is_empty()));
        }
    }

    #[test]
    fn prop_validation_is_deterministic(
        args in prop::collection::vec("[a-z|;-]{0,8}", 0..6)
    ) {
        let rules = RuleSet::new(vec![Rule::new("npm")
            .allow(vec![ArgMatcher::pattern(r"^[\w@/.-]+$").unwrap()])
            .deny(vec![ArgMatcher::literal("publish")])])
        .unwrap();
        let validator = CommandValidator::new(rules);

        prop_assert_eq!(validator.validate("npm", &args), validator.validate("npm", &args));
    }

    #[test]
    fn prop_deny_wins_at_any_position(
        before in prop::collection::vec("[a-z]{1,8}", 0..4),
        after in prop::collection::vec("[a-z]{1,8}", 0..4)
    ) {
        let rules = RuleSet::new(vec![Rule::new("npm")
            .allow(vec![ArgMatcher::pattern("^[a-z]+$").unwrap()])
            .deny(vec![ArgMatcher::literal("publish")])])
        .unwrap();
        let validator = CommandValidator::new(rules);

        let mut args = before.clone();
        args.push("publish".to_string());
        args.extend(after);

        let is_denied = matches!(
            validator.validate("npm", &args),
            Err(ValidationError::ArgumentDenied { .. })
        );
        prop_assert!(is_denied);
    }
}
