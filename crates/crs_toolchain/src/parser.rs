use std::collections::BTreeMap;

use crate::error::ToolchainError;

/// Parses a toolchain file's `Key: value` lines into an ordered map,
/// rejecting duplicate keys. Blank lines and lines starting with `#` are
/// ignored. This is a deliberately small hand-written parser; the grammar
/// is one line per key, not nested enough to warrant a parser-combinator
/// crate.
pub fn parse_kv_lines(text: &str) -> Result<BTreeMap<String, String>, ToolchainError> {
    let mut out = BTreeMap::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(ToolchainError::MalformedLine {
                line: idx + 1,
                text: raw_line.to_string(),
            });
        };
        let key = key.trim().to_string();
        let value = value.trim().to_string();
        if out.insert(key.clone(), value).is_some() {
            return Err(ToolchainError::DuplicateKey(key));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_key_value_lines() {
        let map = parse_kv_lines("Foo: bar\nBaz: qux quux\n").unwrap();
        assert_eq!(map.get("Foo").map(String::as_str), Some("bar"));
        assert_eq!(map.get("Baz").map(String::as_str), Some("qux quux"));
    }

    #[test]
    fn ignores_blank_lines_and_comments() {
        let map = parse_kv_lines("# a comment\n\nFoo: bar\n").unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse_kv_lines("Foo: a\nFoo: b\n").unwrap_err();
        assert!(matches!(err, ToolchainError::DuplicateKey(k) if k == "Foo"));
    }

    #[test]
    fn rejects_lines_without_a_colon() {
        let err = parse_kv_lines("not-a-kv-line\n").unwrap_err();
        assert!(matches!(err, ToolchainError::MalformedLine { line: 1, .. }));
    }
}
