//! Provider states: the preconditions an interaction relies on.

use serde_json::{Map, Value, json};

/// A named provider state with optional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderState {
    /// State description
    pub name: String,
    /// State parameters
    pub params: Map<String, Value>,
}

impl ProviderState {
    /// A state without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// A state with parameters.
    #[must_use]
    pub fn with_params(name: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Serialise in the V3/V4 form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        if self.params.is_empty() {
            json!({ "name": self.name })
        } else {
            json!({ "name": self.name, "params": self.params })
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::new(name.clone())),
            Value::Object(obj) => Some(Self {
                name: obj.get("name")?.as_str()?.to_string(),
                params: obj
                    .get("params")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Read the provider states of an interaction in any specification
    /// layout (`providerStates`, `providerState` or `provider_state`).
    #[must_use]
    pub fn read_states(interaction: &Value) -> Vec<Self> {
        if let Some(states) = interaction.get("providerStates").and_then(Value::as_array) {
            return states.iter().filter_map(Self::from_json).collect();
        }
        ["providerState", "provider_state"]
            .iter()
            .find_map(|key| interaction.get(*key).and_then(Value::as_str))
            .filter(|name| !name.is_empty())
            .map(|name| vec![Self::new(name)])
            .unwrap_or_default()
    }
}

/// Add a state, merging parameters into an existing state with the same name.
pub fn merge_state(states: &mut Vec<ProviderState>, name: &str, params: Map<String, Value>) {
    if let Some(existing) = states.iter_mut().find(|s| s.name == name) {
        existing.params.extend(params);
    } else {
        states.push(ProviderState::with_params(name, params));
    }
}
