//! In-place edits of a single interaction.
//!
//! The DSL builders and the FFI both describe interactions through these
//! functions, so a pact built either way carries the same examples and
//! matching rules.

use pact_common::{PactError, PactResult};
use pact_models::http::{find_header, set_header};
use pact_models::integration_json::{process_json, process_multi_value, process_scalar};
use pact_models::matchingrules::ROOT_KEY;
use pact_models::provider_states::merge_state;
use pact_models::{
    Category, ContentType, DocPath, Headers, Interaction, InteractionPart, MatchingRule, MatchingRules,
    MessageContents, OptionalBody,
};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

const MULTIPART_CONTENT_TYPE: &str = r"multipart/form-data;(\s*charset=[^;]*;)?\s*boundary=.*";

/// Add a provider state.
pub fn given(interaction: &mut Interaction, state: &str) {
    merge_state(interaction.provider_states_mut(), state, Map::new());
}

/// Add a provider state with one parameter. Values that parse as JSON are
/// stored as JSON, anything else as a string.
pub fn given_with_param(interaction: &mut Interaction, state: &str, name: &str, value: &str) {
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    let mut params = Map::new();
    params.insert(name.to_string(), value);
    merge_state(interaction.provider_states_mut(), state, params);
}

/// Add a provider state with parameters given as a JSON object. Input that is
/// not a JSON object is stored under `value`.
pub fn given_with_params(interaction: &mut Interaction, state: &str, params: &str) {
    let params = match serde_json::from_str::<Value>(params) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("value".to_string(), Value::String(params.to_string()));
            map
        }
    };
    merge_state(interaction.provider_states_mut(), state, params);
}

/// Record a test name in the interaction comments.
pub fn test_name(interaction: &mut Interaction, name: &str) {
    interaction.set_test_name(name);
}

fn not_http(interaction: &Interaction, operation: &str) -> PactError {
    PactError::invalid_input(format!(
        "{operation} only applies to HTTP interactions, '{}' is {}",
        interaction.description(),
        interaction.kind()
    ))
}

/// Set the request method and path. The path may be integration JSON.
///
/// # Errors
///
/// Fails for message interactions and malformed matchers.
pub fn with_request(interaction: &mut Interaction, method: &str, path: &str) -> PactResult<()> {
    let Interaction::SynchronousHttp(http) = interaction else {
        return Err(not_http(interaction, "with_request"));
    };
    let (example, rule) = process_scalar(path)?;
    http.request.method = method.to_ascii_uppercase();
    http.request.path = example;
    let category = http.request.matching_rules.category_mut(Category::Path);
    category.remove(ROOT_KEY);
    if let Some(rule) = rule {
        category.add_rule(ROOT_KEY, rule);
    }
    Ok(())
}

/// Set the response status.
///
/// # Errors
///
/// Fails for message interactions.
pub fn response_status(interaction: &mut Interaction, status: u16) -> PactResult<()> {
    let Interaction::SynchronousHttp(http) = interaction else {
        return Err(not_http(interaction, "response_status"));
    };
    http.response.status = status;
    Ok(())
}

/// Add query parameter value number `index`. The value may be integration
/// JSON; `{"value": [..]}` replaces all values of the parameter.
///
/// # Errors
///
/// Fails for message interactions and malformed matchers.
pub fn with_query_parameter(interaction: &mut Interaction, name: &str, index: usize, value: &str) -> PactResult<()> {
    let Interaction::SynchronousHttp(http) = interaction else {
        return Err(not_http(interaction, "with_query_parameter"));
    };
    let category = http.request.matching_rules.category_mut(Category::Query);
    let values = process_multi_value(name, value, category)?;
    let existing = http.request.query.entry(name.to_string()).or_default();
    place_values(existing, index, values);
    Ok(())
}

fn place_values(existing: &mut Vec<String>, index: usize, mut values: Vec<String>) {
    if values.len() == 1 {
        let value = values.remove(0);
        if let Some(slot) = existing.get_mut(index) {
            *slot = value;
        } else {
            existing.push(value);
        }
    } else {
        *existing = values;
    }
}

/// Headers and rules of an HTTP part, or `None` for message interactions.
fn http_part(interaction: &mut Interaction, part: InteractionPart) -> Option<(&mut Headers, &mut MatchingRules)> {
    match interaction {
        Interaction::SynchronousHttp(http) => Some(match part {
            InteractionPart::Request => (&mut http.request.headers, &mut http.request.matching_rules),
            InteractionPart::Response => (&mut http.response.headers, &mut http.response.matching_rules),
        }),
        _ => None,
    }
}

/// The message contents a part refers to. Asynchronous messages have a
/// single part; synchronous responses are created on demand.
fn message_part(interaction: &mut Interaction, part: InteractionPart) -> Option<&mut MessageContents> {
    match interaction {
        Interaction::SynchronousHttp(_) => None,
        Interaction::AsynchronousMessage(message) => Some(&mut message.contents),
        Interaction::SynchronousMessages(messages) => match part {
            InteractionPart::Request => Some(&mut messages.request),
            InteractionPart::Response => {
                if messages.response.is_empty() {
                    messages.response.push(MessageContents::default());
                }
                messages.response.first_mut()
            }
        },
    }
}

/// Add header value number `index`, processing integration JSON. For
/// messages the header becomes a metadata entry.
///
/// # Errors
///
/// Fails for malformed matchers.
pub fn with_header(
    interaction: &mut Interaction,
    part: InteractionPart,
    name: &str,
    index: usize,
    value: &str,
) -> PactResult<()> {
    if let Some((headers, rules)) = http_part(interaction, part) {
        let values = process_multi_value(name, value, rules.category_mut(Category::Header))?;
        let mut existing = find_header(headers, name).cloned().unwrap_or_default();
        place_values(&mut existing, index, values);
        let name = existing_name(headers, name);
        set_header(headers, &name, existing);
        return Ok(());
    }
    if let Some(message) = message_part(interaction, part) {
        let (example, rule) = process_scalar(value)?;
        if let Some(rule) = rule {
            message.matching_rules.add_rule(Category::Metadata, name, rule);
        }
        message.metadata.insert(name.to_string(), Value::String(example));
    }
    Ok(())
}

/// Set header value number `index` verbatim, without integration JSON.
pub fn set_header_value(interaction: &mut Interaction, part: InteractionPart, name: &str, index: usize, value: &str) {
    if let Some((headers, _)) = http_part(interaction, part) {
        let mut existing = find_header(headers, name).cloned().unwrap_or_default();
        place_values(&mut existing, index, vec![value.to_string()]);
        let name = existing_name(headers, name);
        set_header(headers, &name, existing);
    } else if let Some(message) = message_part(interaction, part) {
        message.metadata.insert(name.to_string(), Value::String(value.to_string()));
    }
}

/// Keep the spelling of a header name that is already present.
fn existing_name(headers: &Headers, name: &str) -> String {
    headers
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// Content type declared for a part: the `Content-Type` header for HTTP, the
/// `contentType` metadata entry for messages.
fn declared_content_type(interaction: &mut Interaction, part: InteractionPart) -> Option<String> {
    if let Some((headers, _)) = http_part(interaction, part) {
        return find_header(headers, "Content-Type").and_then(|v| v.first()).cloned();
    }
    message_part(interaction, part).and_then(|message| {
        message
            .metadata
            .get("contentType")
            .and_then(Value::as_str)
            .map(ToString::to_string)
    })
}

/// Store a body with its rules, declaring the content type when the part
/// has none yet.
fn store_body(
    interaction: &mut Interaction,
    part: InteractionPart,
    body: OptionalBody,
    body_rules: Option<Vec<(String, MatchingRule)>>,
    content_type: &str,
) {
    let install = |rules: &mut MatchingRules| {
        if let Some(body_rules) = &body_rules {
            let category = rules.category_mut(Category::Body);
            category.rules.clear();
            for (path, rule) in body_rules {
                category.add_rule(path.clone(), rule.clone());
            }
        }
    };
    match interaction {
        Interaction::SynchronousHttp(http) => {
            let (headers, target, rules) = match part {
                InteractionPart::Request => (
                    &mut http.request.headers,
                    &mut http.request.body,
                    &mut http.request.matching_rules,
                ),
                InteractionPart::Response => (
                    &mut http.response.headers,
                    &mut http.response.body,
                    &mut http.response.matching_rules,
                ),
            };
            if find_header(headers, "Content-Type").is_none() && body.is_present() {
                set_header(headers, "Content-Type", vec![content_type.to_string()]);
            }
            *target = body;
            install(rules);
        }
        other => {
            if let Some(message) = message_part(other, part) {
                if !message.metadata.contains_key("contentType") && body.is_present() {
                    message
                        .metadata
                        .insert("contentType".to_string(), Value::String(content_type.to_string()));
                }
                message.contents = body;
                install(&mut message.matching_rules);
            }
        }
    }
}

/// Set the body of a part.
///
/// `content_type` is ignored when the part already declares one. JSON bodies
/// are processed as integration JSON, so matchers become examples plus rules.
/// `None` sets an empty body.
///
/// # Errors
///
/// Fails for malformed matchers in a JSON body.
pub fn with_body(
    interaction: &mut Interaction,
    part: InteractionPart,
    content_type: &str,
    body: Option<&str>,
) -> PactResult<()> {
    let content_type = declared_content_type(interaction, part).unwrap_or_else(|| content_type.to_string());
    let Some(body) = body else {
        store_body(interaction, part, OptionalBody::Empty, None, &content_type);
        return Ok(());
    };

    let parsed = ContentType::parse(&content_type)
        .is_json()
        .then(|| serde_json::from_str::<Value>(body).ok())
        .flatten();
    match parsed {
        Some(template) => {
            let mut category = pact_models::MatchingRuleCategory::default();
            let example = process_json(&template, &mut category, &DocPath::root())?;
            let rules = category
                .rules
                .into_iter()
                .flat_map(|(path, list)| list.rules.into_iter().map(move |rule| (path.clone(), rule)))
                .collect();
            debug!(content_type = %content_type, "Setting JSON body");
            let body = OptionalBody::Present(example.to_string().into_bytes(), Some(content_type.clone()));
            store_body(interaction, part, body, Some(rules), &content_type);
        }
        None => {
            let body = OptionalBody::text(body, Some(&content_type));
            store_body(interaction, part, body, Some(Vec::new()), &content_type);
        }
    }
    Ok(())
}

/// Set a binary body. The body matches any content of the same type.
pub fn with_binary_file(interaction: &mut Interaction, part: InteractionPart, content_type: &str, bytes: Option<&[u8]>) {
    let content_type = declared_content_type(interaction, part).unwrap_or_else(|| content_type.to_string());
    let body = bytes.map_or(OptionalBody::Empty, |bytes| {
        OptionalBody::Present(bytes.to_vec(), Some(content_type.clone()))
    });
    let rules = vec![(ROOT_KEY.to_string(), MatchingRule::ContentType(content_type.clone()))];
    store_body(interaction, part, body, Some(rules), &content_type);
}

/// Set a `multipart/form-data` body holding one file.
///
/// Without a path the file part is empty. Without a boundary one is
/// generated.
///
/// # Errors
///
/// Fails when the file cannot be read.
pub fn with_multipart_file(
    interaction: &mut Interaction,
    part: InteractionPart,
    content_type: &str,
    path: Option<&Path>,
    part_name: &str,
    boundary: Option<&str>,
) -> PactResult<()> {
    let (file_name, contents) = match path {
        Some(path) => (
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            std::fs::read(path)?,
        ),
        None => (String::new(), Vec::new()),
    };
    let boundary = boundary.map_or_else(
        || format!("pact-boundary-{}", uuid::Uuid::new_v4().simple()),
        ToString::to_string,
    );

    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{part_name}\"; filename=\"{file_name}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(&contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let multipart = format!("multipart/form-data; boundary={boundary}");
    if let Some((headers, rules)) = http_part(interaction, part) {
        let name = existing_name(headers, "Content-Type");
        set_header(headers, &name, vec![multipart.clone()]);
        rules.add_rule(
            Category::Header,
            "Content-Type",
            MatchingRule::Regex(MULTIPART_CONTENT_TYPE.to_string()),
        );
    }
    let rules = vec![(ROOT_KEY.to_string(), MatchingRule::ContentType("multipart/form-data".to_string()))];
    store_body(
        interaction,
        part,
        OptionalBody::Present(body, Some(multipart.clone())),
        Some(rules),
        &multipart,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::InteractionKind;
    use serde_json::json;

    fn http() -> Interaction {
        Interaction::new(InteractionKind::Http, "a request")
    }

    fn request(interaction: &Interaction) -> &pact_models::HttpRequest {
        &interaction.as_http().unwrap().request
    }

    #[test]
    fn test_provider_states() {
        let mut interaction = http();
        given(&mut interaction, "a user exists");
        given_with_param(&mut interaction, "a user exists", "id", "123");
        given_with_param(&mut interaction, "a user exists", "name", "Mary");
        given_with_params(&mut interaction, "an order exists", "not json");
        let states = interaction.provider_states();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].params["id"], json!(123));
        assert_eq!(states[0].params["name"], json!("Mary"));
        assert_eq!(states[1].params["value"], json!("not json"));
    }

    #[test]
    fn test_request_path_matcher() {
        let mut interaction = http();
        let path = json!({"pact:matcher:type": "regex", "regex": r"/users/\d+", "value": "/users/7"});
        with_request(&mut interaction, "get", &path.to_string()).unwrap();
        let request = request(&interaction);
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/users/7");
        assert!(
            request
                .matching_rules
                .category(Category::Path)
                .and_then(|c| c.for_name(ROOT_KEY))
                .is_some()
        );
    }

    #[test]
    fn test_repeated_headers_keep_order() {
        let mut interaction = http();
        with_header(&mut interaction, InteractionPart::Request, "X-Foo", 0, "bar").unwrap();
        with_header(&mut interaction, InteractionPart::Request, "x-foo", 1, "baz").unwrap();
        assert_eq!(request(&interaction).header("X-FOO").unwrap(), &vec!["bar".to_string(), "baz".to_string()]);
    }

    #[test]
    fn test_multi_value_header() {
        let mut interaction = http();
        let value = json!({"value": ["bar", "baz"]}).to_string();
        with_header(&mut interaction, InteractionPart::Response, "X-Foo", 0, &value).unwrap();
        let response = &interaction.as_http().unwrap().response;
        assert_eq!(response.headers["X-Foo"], vec!["bar".to_string(), "baz".to_string()]);
    }

    #[test]
    fn test_set_header_is_verbatim() {
        let mut interaction = http();
        let raw = json!({"value": "x"}).to_string();
        set_header_value(&mut interaction, InteractionPart::Request, "X-Raw", 0, &raw);
        assert_eq!(request(&interaction).headers["X-Raw"], vec![raw]);
    }

    #[test]
    fn test_query_parameters() {
        let mut interaction = http();
        with_query_parameter(&mut interaction, "name", 0, "John").unwrap();
        with_query_parameter(&mut interaction, "name", 1, "Mary").unwrap();
        let matcher = json!({"pact:matcher:type": "regex", "regex": r"\d+", "value": "1"}).to_string();
        with_query_parameter(&mut interaction, "page", 0, &matcher).unwrap();
        let request = request(&interaction);
        assert_eq!(request.query["name"], vec!["John".to_string(), "Mary".to_string()]);
        assert_eq!(request.query["page"], vec!["1".to_string()]);
        assert!(
            request
                .matching_rules
                .category(Category::Query)
                .and_then(|c| c.for_name("page"))
                .is_some()
        );
    }

    #[test]
    fn test_json_body_with_matchers() {
        let mut interaction = http();
        let body = json!({"id": {"pact:matcher:type": "integer", "value": 1}, "name": "Mary"});
        with_body(&mut interaction, InteractionPart::Request, "application/json", Some(&body.to_string())).unwrap();
        let request = request(&interaction);
        assert_eq!(request.body.as_json(), Some(json!({"id": 1, "name": "Mary"})));
        assert_eq!(request.header("content-type").unwrap()[0], "application/json");
        let rules = request.matching_rules.category(Category::Body).unwrap();
        assert_eq!(rules.for_name("$.id").unwrap().rules, vec![MatchingRule::Integer]);
    }

    #[test]
    fn test_json_body_rejects_oversized_array_minimum() {
        let mut interaction = http();
        let body = json!({"items": {"json_class": "Pact::ArrayLike", "contents": {"a": 1}, "min": 1_000_000_000u64}});
        let result = with_body(&mut interaction, InteractionPart::Request, "application/json", Some(&body.to_string()));
        assert!(matches!(result, Err(PactError::InvalidInput(_))));
    }

    #[test]
    fn test_header_content_type_wins() {
        let mut interaction = http();
        with_header(&mut interaction, InteractionPart::Request, "Content-Type", 0, "application/json").unwrap();
        with_body(&mut interaction, InteractionPart::Request, "text/plain", Some(r#"{"a": 1}"#)).unwrap();
        assert_eq!(request(&interaction).body.as_json(), Some(json!({"a": 1})));
        assert_eq!(request(&interaction).body.content_type(), Some("application/json"));
    }

    #[test]
    fn test_text_and_empty_bodies() {
        let mut interaction = http();
        with_body(&mut interaction, InteractionPart::Response, "text/plain", Some("hello")).unwrap();
        assert_eq!(interaction.as_http().unwrap().response.body.as_str_lossy(), "hello");
        with_body(&mut interaction, InteractionPart::Response, "text/plain", None).unwrap();
        assert_eq!(interaction.as_http().unwrap().response.body, OptionalBody::Empty);
    }

    #[test]
    fn test_binary_body_matches_by_content_type() {
        let mut interaction = http();
        with_binary_file(&mut interaction, InteractionPart::Request, "image/png", Some(&[0x89, 0x50, 0x4e, 0x47]));
        let request = request(&interaction);
        assert_eq!(request.body.bytes(), &[0x89, 0x50, 0x4e, 0x47]);
        let rules = request.matching_rules.category(Category::Body).unwrap();
        assert_eq!(
            rules.for_name(ROOT_KEY).unwrap().rules,
            vec![MatchingRule::ContentType("image/png".to_string())]
        );
    }

    #[test]
    fn test_multipart_body() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.csv");
        std::fs::write(&file, "a,b\n1,2\n").unwrap();
        let mut interaction = http();
        with_multipart_file(
            &mut interaction,
            InteractionPart::Request,
            "text/csv",
            Some(&file),
            "upload",
            Some("XYZ"),
        )
        .unwrap();
        let request = request(&interaction);
        assert_eq!(request.header("Content-Type").unwrap()[0], "multipart/form-data; boundary=XYZ");
        let text = request.body.as_str_lossy();
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"upload\"; filename=\"report.csv\""));
        assert!(text.ends_with("--XYZ--\r\n"));
    }

    #[test]
    fn test_message_parts() {
        let mut message = Interaction::new(InteractionKind::AsyncMessage, "an event");
        with_body(&mut message, InteractionPart::Response, "application/json", Some(r#"{"id": 1}"#)).unwrap();
        with_header(&mut message, InteractionPart::Request, "topic", 0, "users").unwrap();
        let contents = &message.as_async_message().unwrap().contents;
        assert_eq!(contents.contents.as_json(), Some(json!({"id": 1})));
        assert_eq!(contents.metadata["contentType"], json!("application/json"));
        assert_eq!(contents.metadata["topic"], json!("users"));

        let mut sync = Interaction::new(InteractionKind::SyncMessage, "a query");
        with_body(&mut sync, InteractionPart::Response, "text/plain", Some("pong")).unwrap();
        assert_eq!(sync.as_sync_messages().unwrap().response.len(), 1);
        assert!(with_request(&mut sync, "GET", "/").is_err());
    }
}
