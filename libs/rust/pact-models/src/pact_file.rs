//! Reading and writing pact files.

use crate::contract::Pact;
use crate::interaction::{Interaction, InteractionKind};
use crate::specification::PactSpecification;
use pact_common::{PactError, PactResult};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata namespace describing the library that wrote a pact.
pub const IMPLEMENTATION_NAMESPACE: &str = "pactRust";

/// Version of this crate, written under the implementation namespace.
pub const MODELS_VERSION: &str = env!("CARGO_PKG_VERSION");

impl Pact {
    /// File name for this pact: `<consumer>-<provider>.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.consumer.name, self.provider.name)
    }

    /// Serialise the whole pact at its specification version.
    ///
    /// # Errors
    ///
    /// Returns `PactError::UnsupportedSpecification` when the interactions
    /// cannot be expressed at that version, for example V3 pacts mixing HTTP
    /// and message interactions.
    pub fn to_json(&self) -> PactResult<Value> {
        let spec = self.specification.writable();

        let mut out = Map::new();
        out.insert("consumer".to_string(), json!({ "name": self.consumer.name }));
        out.insert("provider".to_string(), json!({ "name": self.provider.name }));

        if spec == PactSpecification::V4 {
            let interactions = self
                .interactions
                .iter()
                .map(|i| i.to_json(spec))
                .collect::<PactResult<Vec<_>>>()?;
            out.insert("interactions".to_string(), Value::Array(interactions));
        } else {
            let has_http = self.interactions.iter().any(|i| i.kind() == InteractionKind::Http);
            if has_http && self.has_messages() {
                return Err(PactError::UnsupportedSpecification(format!(
                    "{spec} pacts cannot mix HTTP and message interactions"
                )));
            }
            let values = self
                .interactions
                .iter()
                .map(|i| i.to_json(spec))
                .collect::<PactResult<Vec<_>>>()?;
            let key = if self.has_messages() { "messages" } else { "interactions" };
            out.insert(key.to_string(), Value::Array(values));
        }

        out.insert("metadata".to_string(), self.metadata_json(spec));
        Ok(Value::Object(out))
    }

    fn metadata_json(&self, spec: PactSpecification) -> Value {
        let mut metadata = Map::new();
        metadata.insert(
            "pactSpecification".to_string(),
            json!({ "version": spec.version_str() }),
        );
        let mut implementation = Map::new();
        implementation.insert("models".to_string(), Value::String(MODELS_VERSION.to_string()));
        if let Some(Value::Object(extra)) = self.metadata.get(IMPLEMENTATION_NAMESPACE) {
            implementation.extend(extra.clone());
        }
        metadata.insert(IMPLEMENTATION_NAMESPACE.to_string(), Value::Object(implementation));
        for (namespace, values) in &self.metadata {
            if namespace != IMPLEMENTATION_NAMESPACE && namespace != "pactSpecification" {
                metadata.insert(namespace.clone(), values.clone());
            }
        }
        Value::Object(metadata)
    }

    /// Read a pact from JSON, detecting the specification version.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the document is not a pact.
    pub fn from_json(value: &Value) -> PactResult<Self> {
        let name_of = |key: &str| {
            value
                .get(key)
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| PactError::invalid_input(format!("Pact is missing {key}.name")))
        };
        let mut pact = Self::new(name_of("consumer")?, name_of("provider")?)?;
        pact.specification = detect_specification(value);

        if let Some(Value::Object(metadata)) = value.get("metadata") {
            for (namespace, values) in metadata {
                let is_version = matches!(
                    namespace.as_str(),
                    "pactSpecification" | "pact-specification" | "pactSpecificationVersion"
                );
                if !is_version && namespace != IMPLEMENTATION_NAMESPACE {
                    pact.metadata.insert(namespace.clone(), values.clone());
                }
            }
        }

        for (key, kind) in [
            ("interactions", InteractionKind::Http),
            ("messages", InteractionKind::AsyncMessage),
        ] {
            if let Some(items) = value.get(key).and_then(Value::as_array) {
                for item in items {
                    pact.interactions
                        .push(Interaction::from_json(item, kind, pact.specification)?);
                }
            }
        }
        Ok(pact)
    }

    /// Read a pact file.
    ///
    /// # Errors
    ///
    /// Returns an I/O, JSON or `InvalidInput` error.
    pub fn read_file(path: &Path) -> PactResult<Self> {
        let contents = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;
        Self::from_json(&value)
    }

    /// Write the pact into `dir`, returning the file path.
    ///
    /// The directory is created if needed. When the file exists and
    /// `overwrite` is false, the existing interactions are kept and the new
    /// ones merged in.
    ///
    /// # Errors
    ///
    /// Returns `PactError::MergeConflict` on conflicting interactions, or an
    /// I/O or serialisation error.
    pub fn write_file(&self, dir: &Path, overwrite: bool) -> PactResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());

        let merged;
        let pact = if path.exists() && !overwrite {
            let mut existing = Self::read_file(&path)?;
            existing.specification = self.specification;
            existing.merge(self)?;
            merged = existing;
            &merged
        } else {
            self
        };

        let contents = serde_json::to_string_pretty(&pact.to_json()?)?;
        fs::write(&path, contents)?;
        tracing::info!(
            path = %path.display(),
            interactions = pact.interactions.len(),
            specification = %pact.specification,
            "Wrote pact file"
        );
        Ok(path)
    }
}

fn detect_specification(value: &Value) -> PactSpecification {
    let metadata = value.get("metadata");
    let declared = metadata
        .and_then(|m| {
            m.get("pactSpecification")
                .or_else(|| m.get("pact-specification"))
                .and_then(|s| s.get("version"))
                .or_else(|| m.get("pactSpecificationVersion"))
        })
        .and_then(Value::as_str);

    if let Some(version) = declared {
        match PactSpecification::parse(version) {
            Ok(spec) => return spec,
            Err(err) => tracing::warn!(version, error = %err, "Unrecognised pact specification version"),
        }
    }

    let typed = value
        .get("interactions")
        .and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(|i| i.get("type").is_some()));
    if typed {
        PactSpecification::V4
    } else {
        PactSpecification::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::OptionalBody;
    use crate::http::add_header;
    use crate::matchingrules::{Category, MatchingRule};
    use crate::provider_states::ProviderState;
    use tempfile::TempDir;

    fn sample_pact(spec: PactSpecification) -> Pact {
        let mut pact = Pact::new("web", "users").unwrap();
        pact.specification = spec;
        let mut interaction = Interaction::new(InteractionKind::Http, "get user");
        interaction
            .provider_states_mut()
            .push(ProviderState::new("user 1 exists"));
        if let Interaction::SynchronousHttp(http) = &mut interaction {
            http.request.path = "/users/1".to_string();
            http.response.body = OptionalBody::json(&json!({"id": 1, "name": "Mary"}));
            add_header(&mut http.response.headers, "Content-Type", "application/json");
            http.response
                .matching_rules
                .add_rule(Category::Body, "$.id", MatchingRule::Integer);
        }
        pact.interactions.push(interaction);
        pact
    }

    #[test]
    fn test_v3_layout() {
        let value = sample_pact(PactSpecification::V3).to_json().unwrap();
        assert_eq!(value["consumer"]["name"], json!("web"));
        assert_eq!(value["metadata"]["pactSpecification"]["version"], json!("3.0.0"));
        assert_eq!(value["metadata"]["pactRust"]["models"], json!(MODELS_VERSION));
        assert_eq!(
            value["interactions"][0]["providerStates"],
            json!([{"name": "user 1 exists"}])
        );
        assert_eq!(
            value["interactions"][0]["response"]["matchingRules"]["body"]["$.id"]["matchers"][0]["match"],
            json!("integer")
        );
    }

    #[test]
    fn test_v2_layout_uses_flat_rules() {
        let value = sample_pact(PactSpecification::V2).to_json().unwrap();
        assert_eq!(value["metadata"]["pactSpecification"]["version"], json!("2.0.0"));
        assert_eq!(value["interactions"][0]["providerState"], json!("user 1 exists"));
        assert_eq!(
            value["interactions"][0]["response"]["matchingRules"]["$.body.id"],
            json!({"match": "type"})
        );
    }

    #[test]
    fn test_v3_cannot_mix_kinds() {
        let mut pact = sample_pact(PactSpecification::V3);
        pact.interactions
            .push(Interaction::new(InteractionKind::AsyncMessage, "event"));
        assert!(matches!(pact.to_json(), Err(PactError::UnsupportedSpecification(_))));

        pact.specification = PactSpecification::V4;
        let value = pact.to_json().unwrap();
        assert_eq!(value["interactions"][1]["type"], json!("Asynchronous/Messages"));
    }

    #[test]
    fn test_v3_messages_use_messages_key() {
        let mut pact = Pact::new("web", "events").unwrap();
        pact.specification = PactSpecification::V3;
        pact.interactions
            .push(Interaction::new(InteractionKind::AsyncMessage, "event"));
        let value = pact.to_json().unwrap();
        assert!(value.get("interactions").is_none());
        assert_eq!(value["messages"][0]["description"], json!("event"));

        let restored = Pact::from_json(&value).unwrap();
        assert_eq!(restored.interactions[0].kind(), InteractionKind::AsyncMessage);
    }

    #[test]
    fn test_round_trip_every_version() {
        for spec in [PactSpecification::V2, PactSpecification::V3, PactSpecification::V4] {
            let pact = sample_pact(spec);
            let value = pact.to_json().unwrap();
            let restored = Pact::from_json(&value).unwrap();
            assert_eq!(restored.specification, spec);
            assert_eq!(restored.to_json().unwrap(), value);
        }
    }

    #[test]
    fn test_detects_version_without_metadata() {
        let v4 = json!({
            "consumer": {"name": "a"},
            "provider": {"name": "b"},
            "interactions": [{"type": "Synchronous/HTTP", "description": "x", "request": {}, "response": {}}]
        });
        assert_eq!(Pact::from_json(&v4).unwrap().specification, PactSpecification::V4);

        let old = json!({
            "consumer": {"name": "a"},
            "provider": {"name": "b"},
            "interactions": [{"description": "x", "provider_state": "s", "request": {}, "response": {}}],
            "metadata": {"pact-specification": {"version": "1.0.0"}}
        });
        let pact = Pact::from_json(&old).unwrap();
        assert_eq!(pact.specification, PactSpecification::V1);
        assert_eq!(pact.interactions[0].provider_states()[0].name, "s");
    }

    #[test]
    fn test_missing_participants_are_rejected() {
        assert!(Pact::from_json(&json!({"provider": {"name": "b"}})).is_err());
    }

    #[test]
    fn test_write_file_merges_unless_overwriting() {
        let dir = TempDir::new().unwrap();
        let first = sample_pact(PactSpecification::V4);
        let path = first.write_file(dir.path(), false).unwrap();
        assert!(path.ends_with("web-users.json"));

        let mut second = Pact::new("web", "users").unwrap();
        second
            .interactions
            .push(Interaction::new(InteractionKind::Http, "list users"));
        second.write_file(dir.path(), false).unwrap();
        assert_eq!(Pact::read_file(&path).unwrap().interactions.len(), 2);

        first.write_file(dir.path(), false).unwrap();
        assert_eq!(Pact::read_file(&path).unwrap().interactions.len(), 2);

        second.write_file(dir.path(), true).unwrap();
        assert_eq!(Pact::read_file(&path).unwrap().interactions.len(), 1);
    }

    #[test]
    fn test_write_file_reports_conflicts() {
        let dir = TempDir::new().unwrap();
        sample_pact(PactSpecification::V4)
            .write_file(dir.path(), false)
            .unwrap();

        let mut changed = sample_pact(PactSpecification::V4);
        if let Interaction::SynchronousHttp(http) = &mut changed.interactions[0] {
            http.response.status = 500;
        }
        assert!(matches!(
            changed.write_file(dir.path(), false),
            Err(PactError::MergeConflict(_))
        ));
    }

    #[test]
    fn test_user_metadata_is_written() {
        let mut pact = sample_pact(PactSpecification::V4);
        let mut values = Map::new();
        values.insert("ffi".to_string(), json!("0.1.0"));
        pact.add_metadata(IMPLEMENTATION_NAMESPACE, values);
        let mut custom = Map::new();
        custom.insert("team".to_string(), json!("web"));
        pact.add_metadata("build", custom);

        let value = pact.to_json().unwrap();
        assert_eq!(value["metadata"]["pactRust"]["ffi"], json!("0.1.0"));
        assert_eq!(value["metadata"]["pactRust"]["models"], json!(MODELS_VERSION));
        assert_eq!(value["metadata"]["build"]["team"], json!("web"));
    }
}
