//! Document path expressions used as matching rule keys.
//!
//! A path looks like `$.items[*].id` or `$['odd key'][0]`. When a rule is
//! looked up for a concrete location in a document, every rule whose path is
//! a prefix of that location applies, and the one with the highest weight
//! wins. Exact tokens weigh more than wildcards, so `$.items[0]` beats
//! `$.items[*]`, which beats `$.items`.

use pact_common::PactError;
use std::fmt;

/// A single token of a document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// `$`
    Root,
    /// `.name` or `['name']`
    Field(String),
    /// `[3]`
    Index(usize),
    /// `.*` or `['*']`
    Star,
    /// `[*]`
    StarIndex,
}

/// A parsed document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    tokens: Vec<PathToken>,
}

impl DocPath {
    /// The root path `$`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            tokens: vec![PathToken::Root],
        }
    }

    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the expression is malformed.
    pub fn parse(expr: &str) -> Result<Self, PactError> {
        let chars: Vec<char> = expr.trim().chars().collect();
        let invalid = |reason: &str| PactError::invalid_input(format!("Invalid path '{expr}': {reason}"));

        if chars.first() != Some(&'$') {
            return Err(invalid("must start with '$'"));
        }

        let mut tokens = vec![PathToken::Root];
        let mut i = 1;
        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    let name: String = chars[start..i].iter().collect();
                    match name.as_str() {
                        "" => return Err(invalid("empty field name")),
                        "*" => tokens.push(PathToken::Star),
                        _ => tokens.push(PathToken::Field(name)),
                    }
                }
                '[' => {
                    i += 1;
                    if i < chars.len() && (chars[i] == '\'' || chars[i] == '"') {
                        let quote = chars[i];
                        i += 1;
                        let start = i;
                        while i < chars.len() && chars[i] != quote {
                            i += 1;
                        }
                        if i >= chars.len() {
                            return Err(invalid("unterminated quoted field"));
                        }
                        let name: String = chars[start..i].iter().collect();
                        i += 1;
                        if chars.get(i) != Some(&']') {
                            return Err(invalid("expected ']'"));
                        }
                        i += 1;
                        if name == "*" {
                            tokens.push(PathToken::Star);
                        } else {
                            tokens.push(PathToken::Field(name));
                        }
                    } else {
                        let start = i;
                        while i < chars.len() && chars[i] != ']' {
                            i += 1;
                        }
                        if i >= chars.len() {
                            return Err(invalid("expected ']'"));
                        }
                        let inner: String = chars[start..i].iter().collect();
                        i += 1;
                        if inner == "*" {
                            tokens.push(PathToken::StarIndex);
                        } else {
                            let index = inner
                                .trim()
                                .parse::<usize>()
                                .map_err(|_| invalid("index must be a number or '*'"))?;
                            tokens.push(PathToken::Index(index));
                        }
                    }
                }
                other => return Err(invalid(&format!("unexpected character '{other}'"))),
            }
        }

        Ok(Self { tokens })
    }

    /// Tokens of the path.
    #[must_use]
    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    /// Number of tokens, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True only for a path with no tokens, which `parse` never produces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True when the path is `$`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tokens == [PathToken::Root]
    }

    /// Append a field.
    #[must_use]
    pub fn join(&self, field: impl Into<String>) -> Self {
        let field = field.into();
        let mut tokens = self.tokens.clone();
        if field == "*" {
            tokens.push(PathToken::Star);
        } else {
            tokens.push(PathToken::Field(field));
        }
        Self { tokens }
    }

    /// Append an array index.
    #[must_use]
    pub fn join_index(&self, index: usize) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(PathToken::Index(index));
        Self { tokens }
    }

    /// Append `[*]`.
    #[must_use]
    pub fn join_star_index(&self) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(PathToken::StarIndex);
        Self { tokens }
    }

    /// Weight of this (rule) path against a concrete location.
    ///
    /// Returns 0 when the path does not apply. A path applies when each of
    /// its tokens matches the corresponding location segment; it may be
    /// shorter than the location, in which case it cascades to children.
    #[must_use]
    pub fn weight_for(&self, location: &[String]) -> usize {
        if self.tokens.len() > location.len() {
            return 0;
        }
        let mut weight = 1usize;
        for (token, segment) in self.tokens.iter().zip(location) {
            let w = match token {
                PathToken::Root if segment == "$" => 2,
                PathToken::Field(name) if name == segment => 2,
                PathToken::Index(index) if segment.parse::<usize>().ok() == Some(*index) => 2,
                PathToken::Star => 1,
                PathToken::StarIndex if segment.parse::<usize>().is_ok() => 1,
                _ => return 0,
            };
            weight = weight.saturating_mul(w);
        }
        weight
    }

    /// True when the path applies to exactly this location (same length).
    #[must_use]
    pub fn matches_exactly(&self, location: &[String]) -> bool {
        self.tokens.len() == location.len() && self.weight_for(location) > 0
    }
}

impl Default for DocPath {
    fn default() -> Self {
        Self::root()
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ':' || c == '@')
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                PathToken::Root => write!(f, "$")?,
                PathToken::Field(name) if is_plain_identifier(name) => write!(f, ".{name}")?,
                PathToken::Field(name) => write!(f, "['{name}']")?,
                PathToken::Index(index) => write!(f, "[{index}]")?,
                PathToken::Star => write!(f, ".*")?,
                PathToken::StarIndex => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

/// Build a concrete location from segments, used by the matching engine.
#[must_use]
pub fn location(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = DocPath::parse("$.items[*].id").unwrap();
        assert_eq!(
            path.tokens(),
            &[
                PathToken::Root,
                PathToken::Field("items".to_string()),
                PathToken::StarIndex,
                PathToken::Field("id".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "$.items[*].id");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let path = DocPath::parse("$['odd key'][2].*").unwrap();
        assert_eq!(
            path.tokens(),
            &[
                PathToken::Root,
                PathToken::Field("odd key".to_string()),
                PathToken::Index(2),
                PathToken::Star,
            ]
        );
        assert_eq!(path.to_string(), "$['odd key'][2].*");
    }

    #[test]
    fn test_parse_errors() {
        assert!(DocPath::parse("items").is_err());
        assert!(DocPath::parse("$.").is_err());
        assert!(DocPath::parse("$[abc]").is_err());
        assert!(DocPath::parse("$['open").is_err());
    }

    #[test]
    fn test_weights_prefer_specific_paths() {
        let loc = location(&["$", "items", "0", "id"]);
        let exact = DocPath::parse("$.items[0].id").unwrap();
        let wildcard = DocPath::parse("$.items[*].id").unwrap();
        let parent = DocPath::parse("$.items").unwrap();
        let other = DocPath::parse("$.users").unwrap();

        assert!(exact.weight_for(&loc) > wildcard.weight_for(&loc));
        assert!(wildcard.weight_for(&loc) > 0);
        assert!(parent.weight_for(&loc) > 0);
        assert_eq!(other.weight_for(&loc), 0);
        assert!(exact.matches_exactly(&loc));
        assert!(!parent.matches_exactly(&loc));
    }

    #[test]
    fn test_longer_rule_path_does_not_apply() {
        let loc = location(&["$", "items"]);
        let child = DocPath::parse("$.items[*]").unwrap();
        assert_eq!(child.weight_for(&loc), 0);
    }

    #[test]
    fn test_join() {
        let path = DocPath::root().join("a").join_star_index().join("b c").join_index(1);
        assert_eq!(path.to_string(), "$.a[*]['b c'][1]");
        assert_eq!(DocPath::parse(&path.to_string()).unwrap(), path);
    }
}
