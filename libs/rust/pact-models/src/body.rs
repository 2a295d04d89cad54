//! Interaction bodies and content types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

/// A body that may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OptionalBody {
    /// No body was specified
    #[default]
    Missing,
    /// The body is explicitly empty
    Empty,
    /// The body is the JSON literal `null`
    Null,
    /// Body bytes with an optional content type
    Present(Vec<u8>, Option<String>),
}

impl OptionalBody {
    /// A JSON body.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::Present(value.to_string().into_bytes(), Some("application/json".to_string()))
    }

    /// A text body with an optional content type.
    #[must_use]
    pub fn text(text: impl Into<String>, content_type: Option<&str>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::Empty;
        }
        Self::Present(text.into_bytes(), content_type.map(ToString::to_string))
    }

    /// True when a body is present (including empty and null).
    #[must_use]
    pub const fn is_specified(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    /// True when the body has content.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(..))
    }

    /// Body bytes; empty when missing.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Present(bytes, _) => bytes,
            Self::Null => b"null",
            _ => &[],
        }
    }

    /// Body as a string, replacing invalid UTF-8.
    #[must_use]
    pub fn as_str_lossy(&self) -> String {
        String::from_utf8_lossy(self.bytes()).into_owned()
    }

    /// Declared content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Present(_, content_type) => content_type.as_deref(),
            _ => None,
        }
    }

    /// Replace the content type.
    #[must_use]
    pub fn with_content_type(self, content_type: Option<String>) -> Self {
        match self {
            Self::Present(bytes, _) => Self::Present(bytes, content_type),
            other => other,
        }
    }

    /// Parse the body as JSON.
    #[must_use]
    pub fn as_json(&self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Present(bytes, _) => serde_json::from_slice(bytes).ok(),
            _ => None,
        }
    }

    /// Content type to use: the declared one, else the header value, else a
    /// guess from the bytes.
    #[must_use]
    pub fn effective_content_type(&self, header: Option<&str>) -> Option<ContentType> {
        self.content_type()
            .or(header)
            .map(ContentType::parse)
            .or_else(|| match self {
                Self::Present(bytes, _) => Some(ContentType::detect(bytes)),
                Self::Null => Some(ContentType::parse("application/json")),
                _ => None,
            })
    }

    /// Serialise for a pact file.
    ///
    /// JSON bodies are embedded as JSON, text as a string and anything else
    /// as base64. With `v4` the body is wrapped in the V4 body object.
    #[must_use]
    pub fn to_json(&self, content_type: Option<&ContentType>, v4: bool) -> Option<Value> {
        let content = match self {
            Self::Missing => return None,
            Self::Empty => (Value::String(String::new()), false),
            Self::Null => (Value::Null, false),
            Self::Present(bytes, _) => match content_type {
                Some(ct) if ct.is_json() => match serde_json::from_slice::<Value>(bytes) {
                    Ok(value) => (value, false),
                    Err(_) => (Value::String(String::from_utf8_lossy(bytes).into_owned()), false),
                },
                Some(ct) if ct.is_binary() => (Value::String(BASE64.encode(bytes)), true),
                _ => match std::str::from_utf8(bytes) {
                    Ok(text) => (Value::String(text.to_string()), false),
                    Err(_) => (Value::String(BASE64.encode(bytes)), true),
                },
            },
        };

        let (value, encoded) = content;
        if !v4 {
            return Some(value);
        }
        let mut body = json!({ "content": value });
        if let Some(ct) = content_type {
            body["contentType"] = Value::String(ct.to_string());
        }
        body["encoded"] = if encoded {
            Value::String("base64".to_string())
        } else {
            Value::Bool(false)
        };
        Some(body)
    }

    /// Read a body from a pact file.
    ///
    /// With `v4` the value is the V4 body object, otherwise the bare value of
    /// earlier versions, where binary content types carry base64 text. `header` is the `Content-Type` header of the
    /// enclosing part.
    #[must_use]
    pub fn from_json(value: Option<&Value>, header: Option<&str>, v4: bool) -> Self {
        let Some(value) = value else {
            return Self::Missing;
        };

        if let Some(obj) = value.as_object().filter(|_| v4) {
            let content_type = obj
                .get("contentType")
                .and_then(Value::as_str)
                .or(header)
                .map(ToString::to_string);
            let encoded = match obj.get("encoded") {
                Some(Value::String(enc)) => enc.eq_ignore_ascii_case("base64"),
                Some(Value::Bool(b)) => *b,
                _ => false,
            };
            return match obj.get("content") {
                Some(Value::String(s)) if encoded => match BASE64.decode(s) {
                    Ok(bytes) => Self::Present(bytes, content_type),
                    Err(_) => Self::Present(s.clone().into_bytes(), content_type),
                },
                Some(Value::String(s)) if !is_json_type(content_type.as_deref()) => {
                    Self::text(s.clone(), content_type.as_deref())
                }
                Some(Value::Null) => Self::Null,
                Some(other) => Self::Present(
                    other.to_string().into_bytes(),
                    content_type.or_else(|| Some("application/json".to_string())),
                ),
                None => Self::Missing,
            };
        }

        match value {
            Value::Null => Self::Null,
            Value::String(s) if !s.is_empty() && is_binary_type(header) => match BASE64.decode(s) {
                Ok(bytes) => Self::Present(bytes, header.map(ToString::to_string)),
                Err(_) => Self::text(s.clone(), header),
            },
            Value::String(s) if !is_json_type(header) => Self::text(s.clone(), header),
            other => Self::Present(
                other.to_string().into_bytes(),
                Some(header.unwrap_or("application/json").to_string()),
            ),
        }
    }
}

fn is_json_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ContentType::parse(ct).is_json())
}

fn is_binary_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ContentType::parse(ct).is_binary())
}

/// A parsed media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type, such as `application`
    pub main_type: String,
    /// Sub type, such as `json` or `vnd.api+json`
    pub sub_type: String,
    /// Parameters such as `charset`, with lower-case names
    pub params: Vec<(String, String)>,
}

impl ContentType {
    /// Parse a media type. Malformed input parses as `text/plain`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let (main_type, sub_type) = essence.split_once('/').map_or_else(
            || ("text".to_string(), "plain".to_string()),
            |(m, s)| (m.to_string(), s.to_string()),
        );
        let params = parts
            .filter_map(|p| {
                let (k, v) = p.split_once('=')?;
                Some((k.trim().to_ascii_lowercase(), v.trim().trim_matches('"').to_string()))
            })
            .collect();
        Self {
            main_type,
            sub_type,
            params,
        }
    }

    /// Guess a content type from body bytes.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Self {
        if serde_json::from_slice::<Value>(bytes).is_ok_and(|v| v.is_object() || v.is_array()) {
            Self::parse("application/json")
        } else if std::str::from_utf8(bytes).is_ok() {
            Self::parse("text/plain")
        } else {
            Self::parse("application/octet-stream")
        }
    }

    /// `main/sub` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// JSON, including `+json` suffixes.
    #[must_use]
    pub fn is_json(&self) -> bool {
        (self.main_type == "application" || self.main_type == "text")
            && (self.sub_type == "json" || self.sub_type.ends_with("+json"))
    }

    /// Textual content.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
            || self.is_json()
            || matches!(
                self.sub_type.as_str(),
                "xml" | "x-www-form-urlencoded" | "javascript" | "yaml"
            )
            || self.sub_type.ends_with("+xml")
    }

    /// Binary content (anything that is not textual).
    #[must_use]
    pub fn is_binary(&self) -> bool {
        !self.is_text() && self.main_type != "multipart"
    }

    /// Parameter value by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (k, v) in &self.params {
            write!(f, ";{k}={v}")?;
        }
        Ok(())
    }
}
