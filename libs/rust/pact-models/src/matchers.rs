//! Matcher model.
//!
//! Matchers describe acceptable variation in a value. They serialise to the
//! legacy `json_class` form (what `generate` returns) and to the integration
//! JSON form understood by the consumer DSL (`pact:matcher:type`). Both forms
//! nest: the contents of a matcher may itself contain generated matchers.

use pact_common::{PactError, PactResult};
use regex::Regex;
use serde_json::{Map, Value, json};

const SOMETHING_LIKE: &str = "Pact::SomethingLike";
const ARRAY_LIKE: &str = "Pact::ArrayLike";
const TERM: &str = "Pact::Term";

/// Match by type: the actual value must have the same shape as `contents`.
#[derive(Debug, Clone, PartialEq)]
pub struct Like {
    contents: Value,
}

impl Like {
    /// Create a type matcher around an example value.
    #[must_use]
    pub fn new(contents: impl Into<Value>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    /// Example value.
    #[must_use]
    pub const fn contents(&self) -> &Value {
        &self.contents
    }

    /// Legacy `json_class` form.
    #[must_use]
    pub fn generate(&self) -> Value {
        json!({ "json_class": SOMETHING_LIKE, "contents": self.contents })
    }

    /// Integration JSON form.
    #[must_use]
    pub fn to_integration_json(&self) -> Value {
        json!({
            "pact:matcher:type": "type",
            "value": to_integration_json(&self.contents),
        })
    }
}

/// Largest minimum an array matcher accepts. Reified examples hold `min`
/// copies of their element.
pub const MAX_EACH_LIKE_MIN: usize = 1000;

/// Match an array whose elements all look like `contents`.
#[derive(Debug, Clone, PartialEq)]
pub struct EachLike {
    contents: Value,
    min: usize,
}

impl EachLike {
    /// Array matcher requiring at least one element.
    #[must_use]
    pub fn new(contents: impl Into<Value>) -> Self {
        Self {
            contents: contents.into(),
            min: 1,
        }
    }

    /// Array matcher with an explicit minimum length.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when `min` is zero or above
    /// [`MAX_EACH_LIKE_MIN`].
    pub fn with_minimum(contents: impl Into<Value>, min: usize) -> PactResult<Self> {
        if min < 1 {
            return Err(PactError::invalid_input("EachLike minimum must be at least 1"));
        }
        if min > MAX_EACH_LIKE_MIN {
            return Err(PactError::invalid_input(format!(
                "EachLike minimum {min} exceeds the limit of {MAX_EACH_LIKE_MIN}"
            )));
        }
        Ok(Self {
            contents: contents.into(),
            min,
        })
    }

    /// Example element.
    #[must_use]
    pub const fn contents(&self) -> &Value {
        &self.contents
    }

    /// Minimum number of elements.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Legacy `json_class` form.
    #[must_use]
    pub fn generate(&self) -> Value {
        json!({ "json_class": ARRAY_LIKE, "contents": self.contents, "min": self.min })
    }

    /// Integration JSON form.
    #[must_use]
    pub fn to_integration_json(&self) -> Value {
        let element = to_integration_json(&self.contents);
        json!({
            "pact:matcher:type": "type",
            "min": self.min,
            "value": vec![element; self.min],
        })
    }
}

/// Match a string against a regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    regex: String,
    generate: String,
}

impl Term {
    /// Create a regex matcher with an example value.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the regex does not compile or
    /// the example does not match it.
    pub fn new(regex: impl Into<String>, generate: impl Into<String>) -> PactResult<Self> {
        let regex = regex.into();
        let generate = generate.into();
        if !matches_regex(&regex, &generate)? {
            return Err(PactError::invalid_input(format!(
                "Example '{generate}' does not match regex '{regex}'"
            )));
        }
        Ok(Self { regex, generate })
    }

    /// The regular expression.
    #[must_use]
    pub fn regex(&self) -> &str {
        &self.regex
    }

    /// The example value.
    #[must_use]
    pub fn example(&self) -> &str {
        &self.generate
    }

    /// Legacy `json_class` form.
    #[must_use]
    pub fn generate(&self) -> Value {
        json!({
            "json_class": TERM,
            "data": {
                "generate": self.generate,
                "matcher": { "json_class": "Regexp", "o": 0, "s": self.regex },
            },
        })
    }

    /// Integration JSON form.
    #[must_use]
    pub fn to_integration_json(&self) -> Value {
        json!({
            "pact:matcher:type": "regex",
            "regex": self.regex,
            "value": self.generate,
        })
    }
}

/// Any of the matchers.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Type matcher
    Like(Like),
    /// Array matcher
    EachLike(EachLike),
    /// Regex matcher
    Term(Term),
}

impl Matcher {
    /// Legacy `json_class` form.
    #[must_use]
    pub fn generate(&self) -> Value {
        match self {
            Self::Like(m) => m.generate(),
            Self::EachLike(m) => m.generate(),
            Self::Term(m) => m.generate(),
        }
    }

    /// Integration JSON form.
    #[must_use]
    pub fn to_integration_json(&self) -> Value {
        match self {
            Self::Like(m) => m.to_integration_json(),
            Self::EachLike(m) => m.to_integration_json(),
            Self::Term(m) => m.to_integration_json(),
        }
    }

    /// Parse the legacy `json_class` form.
    ///
    /// Returns `Ok(None)` when the value is not a matcher at all.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the value claims to be a
    /// matcher but is malformed.
    pub fn from_generated(value: &Value) -> PactResult<Option<Self>> {
        let Some(obj) = value.as_object() else {
            return Ok(None);
        };
        let Some(class) = obj.get("json_class").and_then(Value::as_str) else {
            return Ok(None);
        };
        let contents = || obj.get("contents").cloned().unwrap_or(Value::Null);

        let matcher = match class {
            SOMETHING_LIKE => Self::Like(Like::new(contents())),
            ARRAY_LIKE => {
                let min = match obj.get("min") {
                    None => 1,
                    Some(v) => v
                        .as_u64()
                        .and_then(|m| usize::try_from(m).ok())
                        .ok_or_else(|| PactError::invalid_input(format!("Invalid ArrayLike minimum: {v}")))?,
                };
                Self::EachLike(EachLike::with_minimum(contents(), min)?)
            }
            TERM => {
                let data = obj.get("data");
                let generate = data
                    .and_then(|d| d.get("generate"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| PactError::invalid_input("Term is missing data.generate"))?;
                let regex = data
                    .and_then(|d| d.get("matcher"))
                    .and_then(|m| m.get("s"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| PactError::invalid_input("Term is missing data.matcher.s"))?;
                Self::Term(Term::new(regex, generate)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(matcher))
    }
}

impl From<Like> for Value {
    fn from(matcher: Like) -> Self {
        matcher.generate()
    }
}

impl From<EachLike> for Value {
    fn from(matcher: EachLike) -> Self {
        matcher.generate()
    }
}

impl From<Term> for Value {
    fn from(matcher: Term) -> Self {
        matcher.generate()
    }
}

impl From<Matcher> for Value {
    fn from(matcher: Matcher) -> Self {
        matcher.generate()
    }
}

/// Predefined matchers for common formats.
pub struct Format;

impl Format {
    /// Integer identifier, matched by type.
    #[must_use]
    pub fn identifier() -> Matcher {
        Matcher::Like(Like::new(1))
    }

    /// Any integer, matched by type.
    #[must_use]
    pub fn integer() -> Matcher {
        Matcher::Like(Like::new(1))
    }

    /// Any decimal number, matched by type.
    #[must_use]
    pub fn decimal() -> Matcher {
        Matcher::Like(Like::new(1.0))
    }

    /// Dotted IPv4 address.
    #[must_use]
    pub fn ip_address() -> Matcher {
        Self::term(
            r"^(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}$",
            "127.0.0.1",
        )
    }

    /// IPv6 address.
    #[must_use]
    pub fn ipv6_address() -> Matcher {
        Self::term(
            r"^(([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}|([0-9a-fA-F]{1,4}:){1,7}:|:((:[0-9a-fA-F]{1,4}){1,7}|:)|([0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4})$",
            "::1",
        )
    }

    /// Hexadecimal digits.
    #[must_use]
    pub fn hexadecimal() -> Matcher {
        Self::term(r"^[0-9a-fA-F]+$", "3F")
    }

    /// Lower-case hyphenated UUID.
    #[must_use]
    pub fn uuid() -> Matcher {
        Self::term(
            r"^[0-9a-f]{8}(-[0-9a-f]{4}){3}-[0-9a-f]{12}$",
            "fc763eba-0905-41c5-a27f-3934ab26786c",
        )
    }

    /// ISO 8601 timestamp with optional fraction and offset.
    #[must_use]
    pub fn timestamp() -> Matcher {
        Self::term(
            r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$",
            "2000-02-01T00:00:00",
        )
    }

    /// ISO 8601 date.
    #[must_use]
    pub fn date() -> Matcher {
        Self::term(r"^\d{4}-\d{2}-\d{2}$", "2000-02-01")
    }

    /// Time of day.
    #[must_use]
    pub fn time() -> Matcher {
        Self::term(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$", "22:44:30")
    }

    fn term(regex: &str, example: &str) -> Matcher {
        Matcher::Term(Term {
            regex: regex.to_string(),
            generate: example.to_string(),
        })
    }
}

/// True when `value` matches `pattern` in full.
///
/// # Errors
///
/// Returns `PactError::InvalidInput` when the pattern does not compile.
pub fn matches_regex(pattern: &str, value: &str) -> PactResult<bool> {
    let anchored = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| PactError::invalid_input(format!("Invalid regex '{pattern}': {e}")))?;
    Ok(anchored.is_match(value))
}

/// Validate a template that may contain generated matchers and return it in
/// canonical form.
///
/// # Errors
///
/// Returns `PactError::InvalidInput` for malformed matchers anywhere in the
/// template.
pub fn from_term(value: &Value) -> PactResult<Value> {
    if let Some(matcher) = Matcher::from_generated(value)? {
        return Ok(match matcher {
            Matcher::Like(m) => Like::new(from_term(m.contents())?).generate(),
            Matcher::EachLike(m) => EachLike::with_minimum(from_term(m.contents())?, m.min())?.generate(),
            Matcher::Term(m) => m.generate(),
        });
    }
    match value {
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| Ok((k.clone(), from_term(v)?)))
            .collect::<PactResult<Map<_, _>>>()
            .map(Value::Object),
        Value::Array(items) => items
            .iter()
            .map(from_term)
            .collect::<PactResult<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Replace every matcher in a template by its example value.
///
/// Array matchers expand to `min` copies of their reified contents. Values
/// that are not valid matchers are reified as plain data.
#[must_use]
pub fn get_generated_values(value: &Value) -> Value {
    match Matcher::from_generated(value) {
        Ok(Some(Matcher::Like(m))) => get_generated_values(m.contents()),
        Ok(Some(Matcher::EachLike(m))) => {
            let element = get_generated_values(m.contents());
            Value::Array(vec![element; m.min()])
        }
        Ok(Some(Matcher::Term(m))) => Value::String(m.generate),
        _ => match value {
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), get_generated_values(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(get_generated_values).collect()),
            other => other.clone(),
        },
    }
}

/// Convert every generated matcher in a template to integration JSON.
#[must_use]
pub fn to_integration_json(value: &Value) -> Value {
    match Matcher::from_generated(value) {
        Ok(Some(matcher)) => matcher.to_integration_json(),
        _ => match value {
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), to_integration_json(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(to_integration_json).collect()),
            other => other.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_like_generates_array_like() {
        assert_eq!(
            EachLike::new(1).generate(),
            json!({"json_class": "Pact::ArrayLike", "contents": 1, "min": 1})
        );
    }

    #[test]
    fn test_each_like_rejects_zero_minimum() {
        assert!(EachLike::with_minimum(1, 0).is_err());
        assert_eq!(EachLike::with_minimum("a", 3).unwrap().min(), 3);
    }

    #[test]
    fn test_each_like_rejects_huge_minimum() {
        assert!(EachLike::with_minimum(json!({"a": 1}), MAX_EACH_LIKE_MIN).is_ok());
        assert!(EachLike::with_minimum(json!({"a": 1}), MAX_EACH_LIKE_MIN + 1).is_err());
        assert!(EachLike::with_minimum(json!({"a": 1}), usize::MAX / 8).is_err());

        let huge = json!({"json_class": "Pact::ArrayLike", "contents": {"a": 1}, "min": u64::MAX / 8});
        assert!(Matcher::from_generated(&huge).is_err());
        assert!(from_term(&huge).is_err());
        assert_eq!(get_generated_values(&huge), huge);
    }

    #[test]
    fn test_like_generates_something_like() {
        assert_eq!(
            Like::new(json!({"id": 1})).generate(),
            json!({"json_class": "Pact::SomethingLike", "contents": {"id": 1}})
        );
    }

    #[test]
    fn test_term_generates_regexp() {
        let term = Term::new(r"\d+", "123").unwrap();
        assert_eq!(
            term.generate(),
            json!({
                "json_class": "Pact::Term",
                "data": {
                    "generate": "123",
                    "matcher": {"json_class": "Regexp", "o": 0, "s": "\\d+"}
                }
            })
        );
    }

    #[test]
    fn test_term_validation() {
        assert!(Term::new("[a-z", "a").is_err());
        assert!(Term::new(r"\d+", "abc").is_err());
        assert!(Term::new(r"\d+", "12a").is_err());
    }

    #[test]
    fn test_nested_matchers_reify() {
        let template = json!({
            "users": EachLike::with_minimum(json!({
                "id": Value::from(Like::new(7)),
                "role": Value::from(Term::new("admin|user", "user").unwrap()),
            }), 2).unwrap().generate(),
            "total": 2,
        });

        assert_eq!(
            get_generated_values(&template),
            json!({
                "users": [{"id": 7, "role": "user"}, {"id": 7, "role": "user"}],
                "total": 2,
            })
        );
    }

    #[test]
    fn test_from_term_validates_nested_terms() {
        let good = json!({"a": [Value::from(Like::new("x"))]});
        assert_eq!(from_term(&good).unwrap(), good);

        let bad = json!({
            "a": {
                "json_class": "Pact::Term",
                "data": {"generate": "abc", "matcher": {"json_class": "Regexp", "o": 0, "s": "\\d+"}}
            }
        });
        assert!(from_term(&bad).is_err());

        let zero = json!({"json_class": "Pact::ArrayLike", "contents": 1, "min": 0});
        assert!(from_term(&zero).is_err());
    }

    #[test]
    fn test_integration_json() {
        let value = to_integration_json(&EachLike::with_minimum(Like::new(1), 2).unwrap().generate());
        assert_eq!(
            value,
            json!({
                "pact:matcher:type": "type",
                "min": 2,
                "value": [
                    {"pact:matcher:type": "type", "value": 1},
                    {"pact:matcher:type": "type", "value": 1}
                ]
            })
        );
    }

    #[test]
    fn test_format_examples_match_their_regexes() {
        for matcher in [
            Format::ip_address(),
            Format::ipv6_address(),
            Format::hexadecimal(),
            Format::uuid(),
            Format::timestamp(),
            Format::date(),
            Format::time(),
        ] {
            let Matcher::Term(term) = matcher else {
                panic!("expected a term");
            };
            assert!(
                matches_regex(term.regex(), term.example()).unwrap(),
                "{} should match {}",
                term.example(),
                term.regex()
            );
        }
        assert_eq!(Format::decimal().generate()["contents"], json!(1.0));
    }

    #[test]
    fn test_matches_regex_is_anchored() {
        assert!(matches_regex("[a-z]+", "abc").unwrap());
        assert!(!matches_regex("[a-z]+", "abc1").unwrap());
        assert!(matches_regex("a|b", "b").unwrap());
        assert!(matches_regex("[", "x").is_err());
    }
}
