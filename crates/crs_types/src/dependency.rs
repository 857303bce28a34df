use semver::Version;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::MetaError;
use crate::name::Name;
use crate::version_range::{expand_range, PartialVersion, RangeOp, VersionRangeSet};

/// A `using` clause's tokens rarely exceed a handful of library names, so
/// this stays on the stack for the common case, the same small-list idiom
/// `rattler_conda_types`'s match-spec bracket parser uses.
type Tokens<'a> = SmallVec<[&'a str; 8]>;

/// Which libraries of a dependency a consumer links against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsesSelector {
    /// Use every library the dependency exports.
    ImplicitAll,
    /// Use exactly these libraries, in the given order.
    ExplicitList(Vec<Name>),
}

/// A single version-constrained, library-selecting dependency on a named
/// package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: Name,
    pub range: VersionRangeSet,
    pub uses: UsesSelector,
}

/// Splits `s` into whitespace-separated tokens, with a bare `,` always its
/// own token (so `"a, b"` tokenizes as `["a", ",", "b"]`), matching the
/// shorthand grammar's `using a, b` clause.
fn tokenize_using_clause(s: &str) -> Tokens<'_> {
    let mut tokens = Tokens::new();
    let mut rest = s;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(stripped) = rest.strip_prefix(',') {
            tokens.push(&rest[..1]);
            rest = stripped;
            continue;
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = &rest[end..];
    }
    tokens
}

impl Dependency {
    /// Parses `<name><op><version>[ using <lib>[, <lib>]*]`.
    pub fn parse_shorthand(s: &str) -> Result<Self, MetaError> {
        let first_token_end = s.find(char::is_whitespace).unwrap_or(s.len());
        let (head, tail) = s.split_at(first_token_end);

        let sep_pos = head
            .find(|c| RangeOp::from_char(c).is_some())
            .ok_or_else(|| MetaError::InvalidDepShorthand {
                input: s.to_string(),
                reason: "expected one of '=@^~+' after the package name".to_string(),
            })?;

        let name = Name::parse(&head[..sep_pos])?;
        let op = RangeOp::from_char(head[sep_pos..].chars().next().unwrap()).unwrap();
        let version_str = &head[sep_pos + 1..];
        if version_str.is_empty() {
            return Err(MetaError::InvalidDepShorthand {
                input: s.to_string(),
                reason: "missing version after operator".to_string(),
            });
        }
        let pv = PartialVersion::parse(version_str)?;
        let range = expand_range(op, &pv);

        let tokens = tokenize_using_clause(tail);
        let uses = Self::parse_using_clause(s, &tokens)?;

        Ok(Self { name, range, uses })
    }

    fn parse_using_clause(original: &str, tokens: &[&str]) -> Result<UsesSelector, MetaError> {
        if tokens.is_empty() {
            return Ok(UsesSelector::ImplicitAll);
        }
        if tokens[0] != "using" {
            return Err(MetaError::InvalidDepShorthand {
                input: original.to_string(),
                reason: format!("expected 'using' following the version, got '{}'", tokens[0]),
            });
        }

        let mut libs = Vec::new();
        let mut rest = &tokens[1..];
        loop {
            let Some((&lib_tok, after)) = rest.split_first() else {
                return Err(MetaError::InvalidDepShorthand {
                    input: original.to_string(),
                    reason: "expected a library name after 'using' or ','".to_string(),
                });
            };
            if lib_tok == "," {
                return Err(MetaError::InvalidDepShorthand {
                    input: original.to_string(),
                    reason: "unexpected extra comma in dependency specifier".to_string(),
                });
            }
            libs.push(Name::parse(lib_tok).map_err(|_| MetaError::InvalidDepShorthand {
                input: original.to_string(),
                reason: "trailing comma or empty library name in 'using' clause".to_string(),
            })?);
            rest = after;
            match rest.split_first() {
                Some((&",", after_comma)) => rest = after_comma,
                _ => break,
            }
        }
        if !rest.is_empty() {
            return Err(MetaError::InvalidDepShorthand {
                input: original.to_string(),
                reason: format!("unexpected trailing content: '{}'", rest.join(" ")),
            });
        }
        Ok(UsesSelector::ExplicitList(libs))
    }

    /// Renders this dependency back to shorthand form, for ranges that have
    /// a canonical single-operator shape. `@` is never produced (it always
    /// normalizes to `^`), matching the round-trip invariant "modulo
    /// `@`/`^` normalization and whitespace".
    pub fn format_shorthand(&self) -> String {
        let mut out = format!("{}{}", self.name, render_range(&self.range));
        if let UsesSelector::ExplicitList(libs) = &self.uses {
            out.push_str(" using ");
            let names: Vec<&str> = libs.iter().map(Name::as_str).collect();
            out.push_str(&names.join(", "));
        }
        out
    }
}

/// Recognizes the canonical shapes produced by [`expand_range`] and renders
/// the operator that would reproduce them; anything non-canonical (e.g. the
/// result of a union/intersection) falls back to an explicit bracket form.
fn render_range(range: &VersionRangeSet) -> String {
    let Some(iv) = range.as_single_interval() else {
        return format!("{range:?}");
    };
    let low = &iv.low;
    match &iv.high {
        None => format!("+{low}"),
        Some(high) => {
            if is_patch_bump(low, high) {
                format!("={low}")
            } else if is_caret_bump(low, high) {
                format!("^{low}")
            } else if is_minor_bump(low, high) {
                format!("~{low}")
            } else {
                format!("[{low},{high})")
            }
        }
    }
}

fn is_patch_bump(low: &Version, high: &Version) -> bool {
    high.major == low.major && high.minor == low.minor && high.patch == low.patch + 1
}

fn is_minor_bump(low: &Version, high: &Version) -> bool {
    high.major == low.major && high.minor == low.minor + 1 && high.patch == 0
}

fn is_caret_bump(low: &Version, high: &Version) -> bool {
    if low.major > 0 {
        high.major == low.major + 1 && high.minor == 0 && high.patch == 0
    } else if low.minor > 0 {
        high.major == 0 && high.minor == low.minor + 1 && high.patch == 0
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn caret_shorthand() {
        let d = Dependency::parse_shorthand("foo^1.2.3").unwrap();
        assert_eq!(d.name.as_str(), "foo");
        let iv = d.range.as_single_interval().unwrap();
        assert_eq!(iv.low, v("1.2.3"));
        assert_eq!(iv.high, Some(v("2.0.0")));
        assert_eq!(d.uses, UsesSelector::ImplicitAll);
    }

    #[test]
    fn at_normalizes_to_caret() {
        let d1 = Dependency::parse_shorthand("foo@1.2.3").unwrap();
        let d2 = Dependency::parse_shorthand("foo^1.2.3").unwrap();
        assert_eq!(d1.range, d2.range);
    }

    #[test]
    fn eq_shorthand_is_patch_singleton() {
        let d = Dependency::parse_shorthand("foo=1.2.3").unwrap();
        let iv = d.range.as_single_interval().unwrap();
        assert_eq!(iv.low, v("1.2.3"));
        assert_eq!(iv.high, Some(v("1.2.4")));
    }

    #[test]
    fn explicit_uses_list() {
        let d = Dependency::parse_shorthand("foo^1 using a, b").unwrap();
        assert_eq!(
            d.uses,
            UsesSelector::ExplicitList(vec![Name::parse("a").unwrap(), Name::parse("b").unwrap()])
        );
    }

    #[test]
    fn missing_operator_is_an_error() {
        assert!(Dependency::parse_shorthand("foo").is_err());
    }

    #[test]
    fn trailing_comma_is_an_error() {
        assert!(Dependency::parse_shorthand("foo^1 using a,").is_err());
    }

    #[test]
    fn round_trips_modulo_at_caret_normalization() {
        let d = Dependency::parse_shorthand("foo@1.2.3").unwrap();
        similar_asserts::assert_eq!(d.format_shorthand(), "foo^1.2.3");

        let d = Dependency::parse_shorthand("foo=1.2.3").unwrap();
        similar_asserts::assert_eq!(d.format_shorthand(), "foo=1.2.3");

        let d = Dependency::parse_shorthand("foo^1 using a, b").unwrap();
        similar_asserts::assert_eq!(d.format_shorthand(), "foo^1.0.0 using a, b");
    }

    #[test]
    fn format_shorthand_is_stable_under_a_second_parse_round_trip() {
        let original = "foo^1.2.3 using a, b";
        let once = Dependency::parse_shorthand(original).unwrap().format_shorthand();
        let twice = Dependency::parse_shorthand(&once).unwrap().format_shorthand();
        similar_asserts::assert_eq!(once, twice);
    }
}
