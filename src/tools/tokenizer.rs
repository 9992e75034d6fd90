//! Command Line Tokenizer
//!
//! Splits a raw command line into argument words the way a POSIX shell would,
//! without ever invoking one. Only quoting and backslash escaping are
//! interpreted; every other shell construct (`|`, `;`, `$(...)`, globs,
//! redirections) is passed through as plain text and ends up as an ordinary
//! argument for the validator to judge.

/// Error types for tokenization
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("Unclosed quote {0}")]
    UnclosedQuote(char),
}

/// Whitespace that separates tokens outside of quotes
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Tokenize a command line into words
///
/// Rules, applied in a single left-to-right scan:
///
/// - A backslash escapes the next character, inside or outside quotes.
/// - `'` and `"` open a quote; the same character closes it. Closing a quote
///   does not end the token, so `a"b"c` yields `abc`.
/// - Unquoted whitespace ends the current token. Empty tokens are never emitted.
/// - A dangling backslash at the end of input is ignored.
///
/// # Example
///
/// ```
/// use execguard::tools::tokenize;
///
/// let tokens = tokenize(r#"git commit -m "fix bug""#).unwrap();
/// assert_eq!(tokens, vec!["git", "commit", "-m", "fix bug"]);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut active_quote: Option<char> = None;
    let mut escape_pending = false;

    for c in input.chars() {
        if escape_pending {
            current.push(c);
            escape_pending = false;
            continue;
        }

        if c == '\\' {
            escape_pending = true;
            continue;
        }

        match active_quote {
            Some(quote) if c == quote => active_quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => active_quote = Some(c),
            None if is_separator(c) => flush(&mut current, &mut tokens),
            None => current.push(c),
        }
    }

    if let Some(quote) = active_quote {
        return Err(TokenizeError::UnclosedQuote(quote));
    }

    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_command() {
        assert_eq!(tokenize("ls -la").unwrap(), vec!["ls", "-la"]);
    }

    #[test]
    fn test_double_quoted_argument() {
        assert_eq!(
            tokenize(r#"git commit -m "fix bug""#).unwrap(),
            vec!["git", "commit", "-m", "fix bug"]
        );
    }

    #[test]
    fn test_single_quoted_argument() {
        assert_eq!(
            tokenize("echo 'hello world'").unwrap(),
            vec!["echo", "hello world"]
        );
    }

    #[test]
    fn test_adjacent_quote_concatenation() {
        assert_eq!(tokenize(r#"a"b"c"#).unwrap(), vec!["abc"]);
        assert_eq!(tokenize(r#"--name='my app'"#).unwrap(), vec!["--name=my app"]);
    }

    #[test]
    fn test_unclosed_double_quote() {
        let result = tokenize(r#"echo "hello"#);
        assert_eq!(result, Err(TokenizeError::UnclosedQuote('"')));
        assert_eq!(result.unwrap_err().to_string(), "Unclosed quote \"");
    }

    #[test]
    fn test_unclosed_single_quote() {
        assert_eq!(
            tokenize("echo 'oops"),
            Err(TokenizeError::UnclosedQuote('\''))
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t\r\n ").unwrap().is_empty());
    }

    #[test]
    fn test_collapses_repeated_whitespace() {
        assert_eq!(
            tokenize("  ls\t\t-l \n  /tmp  ").unwrap(),
            vec!["ls", "-l", "/tmp"]
        );
    }

    #[test]
    fn test_backslash_escapes_whitespace() {
        assert_eq!(
            tokenize(r"cat my\ file.txt").unwrap(),
            vec!["cat", "my file.txt"]
        );
    }

    #[test]
    fn test_backslash_escapes_quotes() {
        assert_eq!(tokenize(r#"echo \"hi\""#).unwrap(), vec!["echo", "\"hi\""]);
        assert_eq!(tokenize(r"echo it\'s").unwrap(), vec!["echo", "it's"]);
    }

    #[test]
    fn test_backslash_is_global_inside_quotes() {
        // Escapes apply inside single quotes too, unlike a real shell.
        assert_eq!(tokenize(r"echo 'a\'b'").unwrap(), vec!["echo", "a'b"]);
        assert_eq!(tokenize(r#"echo "a\"b""#).unwrap(), vec!["echo", "a\"b"]);
        assert_eq!(tokenize(r#"echo "a\\b""#).unwrap(), vec!["echo", r"a\b"]);
    }

    #[test]
    fn test_dangling_backslash_is_ignored() {
        assert_eq!(tokenize(r"ls -la\").unwrap(), vec!["ls", "-la"]);
        assert!(tokenize(r"\").unwrap().is_empty());
    }

    #[test]
    fn test_other_quote_kind_is_literal() {
        assert_eq!(
            tokenize(r#"echo "it's fine""#).unwrap(),
            vec!["echo", "it's fine"]
        );
        assert_eq!(
            tokenize(r#"echo 'say "hi"'"#).unwrap(),
            vec!["echo", r#"say "hi""#]
        );
    }

    #[test]
    fn test_empty_quotes_produce_no_token() {
        assert_eq!(tokenize(r#"echo "" ''"#).unwrap(), vec!["echo"]);
    }

    #[test]
    fn test_shell_metacharacters_are_plain_tokens() {
        assert_eq!(
            tokenize("npm install | bash").unwrap(),
            vec!["npm", "install", "|", "bash"]
        );
        assert_eq!(
            tokenize("ls; rm -rf / && echo $(whoami)").unwrap(),
            vec!["ls;", "rm", "-rf", "/", "&&", "echo", "$(whoami)"]
        );
    }

    #[test]
    fn test_quoted_whitespace_is_preserved() {
        assert_eq!(
            tokenize("grep 'a\tb\nc' file").unwrap(),
            vec!["grep", "a\tb\nc", "file"]
        );
    }

    #[test]
    fn test_unicode_tokens() {
        assert_eq!(
            tokenize("echo héllo 'wörld ✓'").unwrap(),
            vec!["echo", "héllo", "wörld ✓"]
        );
    }
}
