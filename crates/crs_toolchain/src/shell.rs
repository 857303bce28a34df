//! Shell-style argument splitting.
//!
//! This intentionally diverges from the original implementation's
//! quote-handling, which treats backslash-escapes inconsistently between
//! single and double quotes in a way that does not match POSIX `sh`. Here a
//! single escaping rule applies uniformly, quoted or not: a backslash
//! consumes the next character literally, except a backslash immediately
//! followed by a newline, which is a line continuation and contributes
//! nothing to the token.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Splits `s` into argv-style tokens. Unquoted whitespace (space, tab,
/// newline, carriage return, form feed) separates tokens; `'` and `"` start
/// a quoted run in which whitespace is literal.
pub fn split_shell_string(s: &str) -> Vec<String> {
    let mut quote = Quote::None;
    let mut escaped = false;
    let mut tokens = Vec::new();
    let mut current: Option<String> = None;

    for c in s.chars() {
        if escaped {
            escaped = false;
            if c != '\n' {
                current.get_or_insert_with(String::new).push(c);
            }
            continue;
        }
        match quote {
            Quote::None => match c {
                '\\' => escaped = true,
                '\'' => {
                    quote = Quote::Single;
                    current.get_or_insert_with(String::new);
                }
                '"' => {
                    quote = Quote::Double;
                    current.get_or_insert_with(String::new);
                }
                ' ' | '\t' | '\n' | '\r' | '\x0c' => {
                    if let Some(tok) = current.take() {
                        tokens.push(tok);
                    }
                }
                c => current.get_or_insert_with(String::new).push(c),
            },
            Quote::Single => {
                if c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.get_or_insert_with(String::new).push(c);
                }
            }
            Quote::Double => {
                if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    quote = Quote::None;
                } else {
                    current.get_or_insert_with(String::new).push(c);
                }
            }
        }
    }

    if let Some(tok) = current {
        tokens.push(tok);
    }
    tokens
}
