//! Component F — the URL matcher / precedence engine.
//!
//! Grounded on `examples/original_source/matcher_test.go`'s `Matcher`:
//! a separator-delimited token sequence that matches a URL path and carries
//! a specificity ordering used to pick the single best match among several
//! that match the same input.

use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(String),
    Wildcard,
    AnyWildcard,
}

/// Rank used only for ordering, never for matching: `Literal < Wildcard <
/// AnyWildcard`.
fn token_rank(t: &Token) -> u8 {
    match t {
        Token::Literal(_) => 0,
        Token::Wildcard => 1,
        Token::AnyWildcard => 2,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matcher {
    pub leading_separator: bool,
    pub separator: char,
    pub tokens: Vec<Token>,
}

impl Matcher {
    pub fn new(leading_separator: bool, tokens: Vec<Token>) -> Self {
        Self { leading_separator, separator: '/', tokens }
    }

    /// Builds a matcher from a `PathPatternStr`-shaped string: fixed
    /// segments become `Literal` (already expected upper-cased by the
    /// caller), `{}` becomes `Wildcard`, `{*}` becomes `AnyWildcard`.
    pub fn from_pattern_key(pattern_key: &str) -> Self {
        let leading = pattern_key.starts_with('/');
        let tokens = pattern_key
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|seg| match seg {
                "{}" => Token::Wildcard,
                "{*}" => Token::AnyWildcard,
                fixed => Token::Literal(fixed.to_owned()),
            })
            .collect();
        Self::new(leading, tokens)
    }

    /// Builds a matcher from a `ResourceType` key (e.g. `/FOOS/*`), used for
    /// the wildcard resource-type probe: `*` is a single-segment `Wildcard`
    /// rather than a literal asterisk.
    pub fn from_resource_type_key(rt_key: &str) -> Self {
        let leading = rt_key.starts_with('/');
        let tokens = rt_key
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|seg| if seg == "*" { Token::Wildcard } else { Token::Literal(seg.to_owned()) })
            .collect();
        Self::new(leading, tokens)
    }

    fn input_segments<'a>(&self, input: &'a str) -> Vec<&'a str> {
        let body = if self.leading_separator { input.strip_prefix(self.separator).unwrap_or(input) } else { input };
        if body.is_empty() {
            vec![""]
        } else {
            body.split(self.separator).collect()
        }
    }

    /// True if `input` matches this matcher's token sequence.
    pub fn is_match(&self, input: &str) -> bool {
        if self.tokens.is_empty() {
            let body = if self.leading_separator { input.strip_prefix(self.separator).unwrap_or(input) } else { input };
            return body.is_empty();
        }
        let segments = self.input_segments(input);
        match_from(&self.tokens, &segments)
    }
}

fn match_from(tokens: &[Token], segments: &[&str]) -> bool {
    match tokens.split_first() {
        None => segments.is_empty(),
        Some((Token::Literal(v), rest)) => match segments.split_first() {
            Some((seg, seg_rest)) if seg.eq_ignore_ascii_case(v) => match_from(rest, seg_rest),
            _ => false,
        },
        Some((Token::Wildcard, rest)) => match segments.split_first() {
            Some((_, seg_rest)) => match_from(rest, seg_rest),
            None => false,
        },
        Some((Token::AnyWildcard, rest)) => {
            // Greedy: try consuming the most segments first, backtrack down to zero.
            for take in (0..=segments.len()).rev() {
                if match_from(rest, &segments[take..]) {
                    return true;
                }
            }
            false
        }
    }
}

/// "a is more specific than b": more tokens wins; for equal lengths, compare
/// token-kind then (for two literals) case-insensitive lexicographic order,
/// left to right.
pub fn specificity_cmp(a: &Matcher, b: &Matcher) -> Ordering {
    match b.tokens.len().cmp(&a.tokens.len()) {
        Ordering::Equal => {}
        other => return other,
    }
    for (ta, tb) in a.tokens.iter().zip(b.tokens.iter()) {
        match token_rank(ta).cmp(&token_rank(tb)) {
            Ordering::Equal => {
                if let (Token::Literal(va), Token::Literal(vb)) = (ta, tb) {
                    match va.to_ascii_lowercase().cmp(&vb.to_ascii_lowercase()) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
            }
            other => return other,
        }
    }
    Ordering::Equal
}

/// Sorts `matchers` (paired with an arbitrary payload) from most to least
/// specific, stable on ties.
pub fn sort_by_specificity<T>(matchers: &mut [(Matcher, T)]) {
    matchers.sort_by(|(a, _), (b, _)| specificity_cmp(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: &str) -> Token {
        Token::Literal(v.to_owned())
    }

    #[test]
    fn literal_matching_string() {
        let m = Matcher::new(true, vec![lit("foo")]);
        assert!(m.is_match("/foo"));
    }

    #[test]
    fn literal_matching_empty_value() {
        let m = Matcher::new(true, vec![lit("")]);
        assert!(m.is_match("/"));
    }

    #[test]
    fn literal_no_prefix_separator() {
        let m = Matcher::new(false, vec![lit("foo")]);
        assert!(m.is_match("foo"));
    }

    #[test]
    fn literal_non_matching_string() {
        let m = Matcher::new(true, vec![lit("foo")]);
        assert!(!m.is_match("/bar"));
    }

    #[test]
    fn wildcard_at_end() {
        let m = Matcher::new(true, vec![lit("foo"), Token::Wildcard]);
        assert!(m.is_match("/foo/bar"));
    }

    #[test]
    fn wildcard_in_the_middle() {
        let m = Matcher::new(true, vec![lit("foo"), Token::Wildcard, lit("baz")]);
        assert!(m.is_match("/foo/bar/baz"));
        assert!(!m.is_match("/foo/a/b/baz"));
    }

    #[test]
    fn any_wildcard_in_the_middle() {
        let m = Matcher::new(true, vec![lit("foo"), Token::AnyWildcard, lit("baz")]);
        assert!(m.is_match("/foo/a/b/baz"));
        assert!(m.is_match("/foo/baz"));
    }

    #[test]
    fn equal_matchers_are_neither_less() {
        let a = Matcher::new(true, vec![lit("foo")]);
        let b = Matcher::new(true, vec![lit("foo")]);
        assert_eq!(specificity_cmp(&a, &b), Ordering::Equal);
    }

    #[test]
    fn shorter_literal_value_is_more_specific() {
        let a = Matcher::new(true, vec![lit("foo")]);
        let b = Matcher::new(true, vec![lit("xfoo")]);
        assert_eq!(specificity_cmp(&a, &b), Ordering::Less);
    }

    #[test]
    fn more_tokens_is_more_specific_than_fewer() {
        let a = Matcher::new(true, vec![lit("xfoo")]);
        let b = Matcher::new(true, vec![lit("foo"), Token::Wildcard]);
        assert_eq!(specificity_cmp(&a, &b), Ordering::Greater);
    }

    #[test]
    fn literal_beats_wildcard_at_same_position() {
        let a = Matcher::new(true, vec![lit("foo"), lit("bar")]);
        let b = Matcher::new(true, vec![lit("foo"), Token::Wildcard]);
        assert_eq!(specificity_cmp(&a, &b), Ordering::Less);
    }

    #[test]
    fn wildcard_beats_any_wildcard_at_same_position() {
        let a = Matcher::new(true, vec![lit("foo"), Token::Wildcard]);
        let b = Matcher::new(true, vec![lit("foo"), Token::AnyWildcard]);
        assert_eq!(specificity_cmp(&a, &b), Ordering::Less);
    }

    #[test]
    fn from_pattern_key_classifies_tokens() {
        let m = Matcher::from_pattern_key("/PROVIDERS/MICROSOFT.DUMMY/FOOS/{}");
        assert_eq!(
            m.tokens,
            vec![lit("PROVIDERS"), lit("MICROSOFT.DUMMY"), lit("FOOS"), Token::Wildcard]
        );
        assert!(m.leading_separator);
    }
}
