//! Matching rules attached to interactions.
//!
//! Rules are grouped by category (body, header, query, ...). Within a
//! category each rule list is keyed by a path expression for bodies and by
//! the header or parameter name for headers and queries.

use crate::path::DocPath;
use crate::specification::PactSpecification;
use pact_common::{PactError, PactResult};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// A single matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchingRule {
    /// Values must be equal
    Equality,
    /// String form must match the regex
    Regex(String),
    /// Values must have the same JSON type
    Type,
    /// Same type, arrays with at least this many elements
    MinType(usize),
    /// Same type, arrays with at most this many elements
    MaxType(usize),
    /// Same type, arrays with a length in the range
    MinMaxType(usize, usize),
    /// String form must contain the value
    Include(String),
    /// Must be an integer
    Integer,
    /// Must be a number with a fractional part
    Decimal,
    /// Must be a number
    Number,
    /// Must be a boolean
    Boolean,
    /// Must be null
    Null,
    /// Must be a date in the given format
    Date(String),
    /// Must be a time in the given format
    Time(String),
    /// Must be a timestamp in the given format
    Timestamp(String),
    /// Body must have this content type
    ContentType(String),
    /// Map keys are ignored, values compared against the expected ones
    Values,
    /// Must be a semantic version
    Semver,
}

/// Default formats for date and time rules, in the pattern syntax pact files use.
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";
/// Default time format.
pub const DEFAULT_TIME_FORMAT: &str = "HH:mm:ss";
/// Default timestamp format.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ss";

impl MatchingRule {
    /// Name used in the `match` attribute.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Equality => "equality",
            Self::Regex(_) => "regex",
            Self::Type | Self::MinType(_) | Self::MaxType(_) | Self::MinMaxType(..) => "type",
            Self::Include(_) => "include",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::ContentType(_) => "contentType",
            Self::Values => "values",
            Self::Semver => "semver",
        }
    }

    /// True for the rules that compare by JSON type and cascade into children.
    #[must_use]
    pub const fn is_type_matcher(&self) -> bool {
        matches!(
            self,
            Self::Type | Self::MinType(_) | Self::MaxType(_) | Self::MinMaxType(..)
        )
    }

    /// True when the rule constrains array length.
    #[must_use]
    pub const fn is_length_matcher(&self) -> bool {
        matches!(self, Self::MinType(_) | Self::MaxType(_) | Self::MinMaxType(..))
    }

    /// Serialise to the V3/V4 rule form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Regex(regex) => json!({ "match": "regex", "regex": regex }),
            Self::MinType(min) => json!({ "match": "type", "min": min }),
            Self::MaxType(max) => json!({ "match": "type", "max": max }),
            Self::MinMaxType(min, max) => json!({ "match": "type", "min": min, "max": max }),
            Self::Include(value) => json!({ "match": "include", "value": value }),
            Self::Date(format) => json!({ "match": "date", "format": format }),
            Self::Time(format) => json!({ "match": "time", "format": format }),
            Self::Timestamp(format) => json!({ "match": "timestamp", "format": format }),
            Self::ContentType(value) => json!({ "match": "contentType", "value": value }),
            other => json!({ "match": other.name() }),
        }
    }

    /// Serialise to the V2 rule form, which only knows regex and type rules.
    #[must_use]
    pub fn to_v2_json(&self) -> Value {
        match self {
            Self::Regex(regex) => json!({ "match": "regex", "regex": regex }),
            Self::MinType(min) => json!({ "match": "type", "min": min }),
            Self::MaxType(max) => json!({ "match": "type", "max": max }),
            Self::MinMaxType(min, max) => json!({ "match": "type", "min": min, "max": max }),
            _ => json!({ "match": "type" }),
        }
    }

    /// Parse a rule from a pact file.
    ///
    /// Handles both the explicit `match` form and the implicit V2 form where
    /// only `regex` or `min`/`max` is present.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for unknown or incomplete rules.
    pub fn from_json(value: &Value) -> PactResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| PactError::invalid_input(format!("Matching rule must be an object: {value}")))?;

        match obj.get("match").and_then(Value::as_str) {
            Some(name) => Self::from_parts(name, obj),
            None if obj.contains_key("regex") => Self::from_parts("regex", obj),
            None if obj.contains_key("min") || obj.contains_key("max") => Self::from_parts("type", obj),
            None => Err(PactError::invalid_input(format!("Matching rule has no type: {value}"))),
        }
    }

    /// Parse a rule from an integration JSON object (`pact:matcher:type`).
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for unknown matcher types.
    pub fn from_integration_json(obj: &Map<String, Value>) -> PactResult<Self> {
        let name = obj
            .get("pact:matcher:type")
            .and_then(Value::as_str)
            .ok_or_else(|| PactError::invalid_input("Missing pact:matcher:type"))?;
        Self::from_parts(name, obj)
    }

    fn from_parts(name: &str, obj: &Map<String, Value>) -> PactResult<Self> {
        let string_attr = |key: &str| obj.get(key).and_then(Value::as_str).map(ToString::to_string);
        let size_attr = |key: &str| {
            obj.get(key)
                .and_then(Value::as_u64)
                .and_then(|v| usize::try_from(v).ok())
        };

        let rule = match name {
            "equality" => Self::Equality,
            "regex" => Self::Regex(
                string_attr("regex")
                    .ok_or_else(|| PactError::invalid_input("Regex matcher requires a 'regex' attribute"))?,
            ),
            "type" | "min" | "max" | "min-type" | "max-type" => match (size_attr("min"), size_attr("max")) {
                (Some(min), Some(max)) => Self::MinMaxType(min, max),
                (Some(min), None) => Self::MinType(min),
                (None, Some(max)) => Self::MaxType(max),
                (None, None) => Self::Type,
            },
            "include" => Self::Include(match obj.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => return Err(PactError::invalid_input("Include matcher requires a 'value' attribute")),
            }),
            "integer" => Self::Integer,
            "decimal" => Self::Decimal,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            "date" => Self::Date(string_attr("format").unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string())),
            "time" => Self::Time(string_attr("format").unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string())),
            "timestamp" | "datetime" => Self::Timestamp(
                string_attr("format").unwrap_or_else(|| DEFAULT_TIMESTAMP_FORMAT.to_string()),
            ),
            "contentType" | "content-type" => Self::ContentType(
                string_attr("value")
                    .ok_or_else(|| PactError::invalid_input("Content type matcher requires a 'value' attribute"))?,
            ),
            "values" => Self::Values,
            "semver" => Self::Semver,
            other => return Err(PactError::invalid_input(format!("Unknown matcher type '{other}'"))),
        };
        Ok(rule)
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// How multiple rules on one path combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RuleLogic {
    /// All rules must match
    #[default]
    And,
    /// Any rule may match
    Or,
}

impl RuleLogic {
    const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// The rules attached to one path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleList {
    /// Rules in declaration order
    pub rules: Vec<MatchingRule>,
    /// How the rules combine
    pub logic: RuleLogic,
}

impl RuleList {
    /// A list containing one rule.
    #[must_use]
    pub fn new(rule: MatchingRule) -> Self {
        Self {
            rules: vec![rule],
            logic: RuleLogic::And,
        }
    }

    /// True when there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True when any rule compares by type.
    #[must_use]
    pub fn has_type_matcher(&self) -> bool {
        self.rules.iter().any(MatchingRule::is_type_matcher)
    }

    fn add(&mut self, rule: MatchingRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "combine": self.logic.as_str(),
            "matchers": self.rules.iter().map(MatchingRule::to_json).collect::<Vec<_>>(),
        })
    }

    fn from_json(value: &Value) -> PactResult<Self> {
        match value {
            Value::Object(obj) if obj.contains_key("matchers") => {
                let logic = match obj.get("combine").and_then(Value::as_str) {
                    Some("OR") => RuleLogic::Or,
                    _ => RuleLogic::And,
                };
                let rules = obj
                    .get("matchers")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(MatchingRule::from_json).collect::<PactResult<Vec<_>>>())
                    .transpose()?
                    .unwrap_or_default();
                Ok(Self { rules, logic })
            }
            other => Ok(Self::new(MatchingRule::from_json(other)?)),
        }
    }
}

/// Rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// Request method
    Method,
    /// Request path
    Path,
    /// Headers, keyed by header name
    Header,
    /// Query parameters, keyed by parameter name
    Query,
    /// Bodies and message contents, keyed by path expression
    Body,
    /// Response status
    Status,
    /// Message metadata, keyed by metadata name
    Metadata,
    /// Whole-content rules
    Content,
}

impl Category {
    /// Name used in pact files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Path => "path",
            Self::Header => "header",
            Self::Query => "query",
            Self::Body => "body",
            Self::Status => "status",
            Self::Metadata => "metadata",
            Self::Content => "content",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "method" => Some(Self::Method),
            "path" => Some(Self::Path),
            "header" | "headers" => Some(Self::Header),
            "query" => Some(Self::Query),
            "body" => Some(Self::Body),
            "status" => Some(Self::Status),
            "metadata" => Some(Self::Metadata),
            "content" => Some(Self::Content),
            _ => None,
        }
    }

    /// Categories whose rules apply to the whole value rather than a key.
    const fn is_keyless(self) -> bool {
        matches!(self, Self::Method | Self::Path | Self::Status)
    }
}

/// Key used for keyless categories and for the body root.
pub const ROOT_KEY: &str = "$";

/// Rules for one category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingRuleCategory {
    /// Rule lists keyed by path expression or name
    pub rules: BTreeMap<String, RuleList>,
}

impl MatchingRuleCategory {
    /// True when the category has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.values().all(RuleList::is_empty)
    }

    /// Add a rule under a key.
    pub fn add_rule(&mut self, key: impl Into<String>, rule: MatchingRule) {
        self.rules.entry(key.into()).or_default().add(rule);
    }

    /// Replace the rule list under a key.
    pub fn set_rules(&mut self, key: impl Into<String>, rules: RuleList) {
        self.rules.insert(key.into(), rules);
    }

    /// Remove the rules under a key.
    pub fn remove(&mut self, key: &str) {
        self.rules.remove(key);
    }

    /// Rules registered under a name, ignoring ASCII case (headers).
    #[must_use]
    pub fn for_name_ignore_case(&self, name: &str) -> Option<&RuleList> {
        self.rules
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, rules)| rules)
    }

    /// Rules registered under a name.
    #[must_use]
    pub fn for_name(&self, name: &str) -> Option<&RuleList> {
        self.rules.get(name)
    }

    /// Select the most specific rule list that applies to a body location.
    ///
    /// Ancestor paths cascade to the location. Among applicable paths the
    /// highest weight wins, ties going to the longer path.
    #[must_use]
    pub fn select_best(&self, location: &[String]) -> Option<&RuleList> {
        self.rules
            .iter()
            .filter_map(|(key, rules)| {
                let path = DocPath::parse(key).ok()?;
                let weight = path.weight_for(location);
                (weight > 0 && !rules.is_empty()).then_some((weight, path.len(), rules))
            })
            .max_by_key(|(weight, len, _)| (*weight, *len))
            .map(|(_, _, rules)| rules)
    }

    /// Rule list defined exactly at a location, without cascading.
    #[must_use]
    pub fn exact(&self, location: &[String]) -> Option<&RuleList> {
        self.rules.iter().find_map(|(key, rules)| {
            DocPath::parse(key)
                .ok()
                .filter(|path| path.matches_exactly(location))
                .map(|_| rules)
        })
    }
}

/// All matching rules of an interaction part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingRules {
    /// Categories with their rules
    pub categories: BTreeMap<Category, MatchingRuleCategory>,
}

impl MatchingRules {
    /// True when no category holds a rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(MatchingRuleCategory::is_empty)
    }

    /// Rules of a category, if any.
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&MatchingRuleCategory> {
        self.categories.get(&category).filter(|c| !c.is_empty())
    }

    /// Mutable access to a category, creating it when missing.
    pub fn category_mut(&mut self, category: Category) -> &mut MatchingRuleCategory {
        self.categories.entry(category).or_default()
    }

    /// Add a rule.
    pub fn add_rule(&mut self, category: Category, key: impl Into<String>, rule: MatchingRule) {
        self.category_mut(category).add_rule(key, rule);
    }

    /// Serialise in the layout of the given specification version.
    ///
    /// V2 uses flat keys such as `$.body.name` and `$.headers.Accept`; V3 and
    /// later nest rule lists under their category. Earlier versions carry no
    /// rules at all.
    #[must_use]
    pub fn to_json(&self, spec: PactSpecification) -> Option<Value> {
        if self.is_empty() || !spec.supports_matching_rules() {
            return None;
        }

        let mut out = Map::new();
        if spec == PactSpecification::V2 {
            for (category, rules) in &self.categories {
                for (key, list) in &rules.rules {
                    let Some(rule) = list.rules.first() else {
                        continue;
                    };
                    let flat_key = match category {
                        Category::Body | Category::Content => format!("$.body{}", &key[1.min(key.len())..]),
                        Category::Header => format!("$.headers.{key}"),
                        Category::Query => format!("$.query.{key}"),
                        Category::Path => "$.path".to_string(),
                        Category::Method => "$.method".to_string(),
                        Category::Status => "$.status".to_string(),
                        Category::Metadata => format!("$.metadata.{key}"),
                    };
                    out.insert(flat_key, rule.to_v2_json());
                }
            }
        } else {
            for (category, rules) in &self.categories {
                if rules.is_empty() {
                    continue;
                }
                let value = if category.is_keyless() {
                    rules
                        .rules
                        .values()
                        .next()
                        .map_or(Value::Null, RuleList::to_json)
                } else {
                    Value::Object(
                        rules
                            .rules
                            .iter()
                            .filter(|(_, list)| !list.is_empty())
                            .map(|(key, list)| (key.clone(), list.to_json()))
                            .collect(),
                    )
                };
                out.insert(category.as_str().to_string(), value);
            }
        }
        Some(Value::Object(out))
    }

    /// Parse rules from a pact file, detecting the V2 flat layout.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for malformed rules.
    pub fn from_json(value: &Value) -> PactResult<Self> {
        let Some(obj) = value.as_object() else {
            return Ok(Self::default());
        };

        let mut rules = Self::default();
        for (key, entry) in obj {
            if key.starts_with('$') {
                Self::add_v2_rule(&mut rules, key, entry)?;
                continue;
            }
            let Some(category) = Category::parse(key) else {
                tracing::warn!(category = %key, "Ignoring unknown matching rule category");
                continue;
            };
            let target = rules.category_mut(category);
            if category.is_keyless() || entry.get("matchers").is_some() {
                target.set_rules(ROOT_KEY, RuleList::from_json(entry)?);
            } else if let Some(entries) = entry.as_object() {
                for (name, list) in entries {
                    target.set_rules(name.clone(), RuleList::from_json(list)?);
                }
            }
        }
        Ok(rules)
    }

    fn add_v2_rule(rules: &mut Self, key: &str, entry: &Value) -> PactResult<()> {
        let rule = MatchingRule::from_json(entry)?;
        if let Some(rest) = key.strip_prefix("$.body") {
            rules.add_rule(Category::Body, format!("${rest}"), rule);
        } else if let Some(name) = key.strip_prefix("$.headers.") {
            rules.add_rule(Category::Header, name, rule);
        } else if let Some(name) = key.strip_prefix("$.query.") {
            rules.add_rule(Category::Query, name, rule);
        } else if key == "$.path" {
            rules.add_rule(Category::Path, ROOT_KEY, rule);
        } else {
            tracing::warn!(key, "Ignoring V2 matching rule with unknown location");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::location;

    #[test]
    fn test_rule_json_round_trip_examples() {
        let rule = MatchingRule::from_json(&json!({"match": "type", "min": 2})).unwrap();
        assert_eq!(rule, MatchingRule::MinType(2));

        let rule = MatchingRule::from_json(&json!({"regex": "\\d+"})).unwrap();
        assert_eq!(rule, MatchingRule::Regex("\\d+".to_string()));

        let rule = MatchingRule::from_json(&json!({"min": 1, "max": 3})).unwrap();
        assert_eq!(rule, MatchingRule::MinMaxType(1, 3));

        let rule = MatchingRule::from_json(&json!({"match": "datetime"})).unwrap();
        assert_eq!(rule, MatchingRule::Timestamp(DEFAULT_TIMESTAMP_FORMAT.to_string()));
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        assert!(MatchingRule::from_json(&json!({"match": "eachKeyLike"})).is_err());
        assert!(MatchingRule::from_json(&json!({"match": "regex"})).is_err());
        assert!(MatchingRule::from_json(&json!("type")).is_err());
    }

    #[test]
    fn test_v3_serialisation() {
        let mut rules = MatchingRules::default();
        rules.add_rule(Category::Body, "$.id", MatchingRule::Integer);
        rules.add_rule(Category::Header, "X-Version", MatchingRule::Regex("\\d+".to_string()));
        rules.add_rule(Category::Path, ROOT_KEY, MatchingRule::Regex("/users/\\d+".to_string()));

        let value = rules.to_json(PactSpecification::V3).unwrap();
        assert_eq!(
            value["body"]["$.id"],
            json!({"combine": "AND", "matchers": [{"match": "integer"}]})
        );
        assert_eq!(value["header"]["X-Version"]["matchers"][0]["regex"], json!("\\d+"));
        assert_eq!(value["path"]["matchers"][0]["match"], json!("regex"));

        let parsed = MatchingRules::from_json(&value).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_v2_serialisation() {
        let mut rules = MatchingRules::default();
        rules.add_rule(Category::Body, "$.items", MatchingRule::MinType(1));
        rules.add_rule(Category::Header, "Accept", MatchingRule::Regex("json".to_string()));

        let value = rules.to_json(PactSpecification::V2).unwrap();
        assert_eq!(value["$.body.items"], json!({"match": "type", "min": 1}));
        assert_eq!(value["$.headers.Accept"], json!({"match": "regex", "regex": "json"}));

        let parsed = MatchingRules::from_json(&value).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_no_rules_before_v2() {
        let mut rules = MatchingRules::default();
        rules.add_rule(Category::Body, "$", MatchingRule::Type);
        assert!(rules.to_json(PactSpecification::V1_1).is_none());
        assert!(MatchingRules::default().to_json(PactSpecification::V4).is_none());
    }

    #[test]
    fn test_select_best_prefers_specific_rules() {
        let mut category = MatchingRuleCategory::default();
        category.add_rule("$.items", MatchingRule::MinType(1));
        category.add_rule("$.items[*].id", MatchingRule::Integer);

        let element = location(&["$", "items", "0"]);
        assert_eq!(
            category.select_best(&element).unwrap().rules,
            vec![MatchingRule::MinType(1)]
        );

        let id = location(&["$", "items", "0", "id"]);
        assert_eq!(
            category.select_best(&id).unwrap().rules,
            vec![MatchingRule::Integer]
        );

        assert!(category.select_best(&location(&["$", "other"])).is_none());
        assert!(category.exact(&element).is_none());
    }

    #[test]
    fn test_duplicate_rules_are_collapsed() {
        let mut category = MatchingRuleCategory::default();
        category.add_rule("$", MatchingRule::Type);
        category.add_rule("$", MatchingRule::Type);
        assert_eq!(category.rules["$"].rules.len(), 1);
    }
}
