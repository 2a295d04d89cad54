//! Verification results as published to a pact broker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version information for the provider being verified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProviderVersion {
    /// Provider application version
    pub version: String,
    /// Source control branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Version tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProviderVersion {
    /// Create a version without branch or tags.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            branch: None,
            tags: Vec::new(),
        }
    }

    /// Set the branch.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// A version can be published when it is not blank and no tag is blank.
    #[must_use]
    pub fn is_publishable(&self) -> bool {
        !self.version.trim().is_empty() && self.tags.iter().all(|t| !t.trim().is_empty())
    }
}

/// Outcome of one interaction, as reported to the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionTestResult {
    /// Interaction description
    pub interaction_description: String,
    /// Whether the interaction passed
    pub success: bool,
    /// Mismatches, in their serialised form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Value>,
}

/// Verification result payload for the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether verification succeeded
    pub success: bool,
    /// Provider version that was verified
    pub provider_application_version: String,
    /// Per-interaction results
    #[serde(default)]
    pub test_results: Vec<InteractionTestResult>,
    /// Implementation that ran the verification
    pub verified_by: VerifiedBy,
}

/// Implementation details attached to a verification result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedBy {
    /// Implementation name
    pub implementation: String,
    /// Implementation version
    pub version: String,
}

impl Default for VerifiedBy {
    fn default() -> Self {
        Self {
            implementation: "pact-rust".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl VerificationResult {
    /// Build a result; success is derived from the interaction results.
    #[must_use]
    pub fn new(provider_version: &ProviderVersion, test_results: Vec<InteractionTestResult>) -> Self {
        Self {
            success: test_results.iter().all(|r| r.success),
            provider_application_version: provider_version.version.clone(),
            test_results,
            verified_by: VerifiedBy::default(),
        }
    }

    /// Check if deployment should be allowed.
    #[must_use]
    pub const fn can_deploy(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(description: &str, success: bool) -> InteractionTestResult {
        InteractionTestResult {
            interaction_description: description.to_string(),
            success,
            mismatches: Vec::new(),
        }
    }

    #[test]
    fn test_publishable_versions() {
        assert!(ProviderVersion::new("1.0.0").is_publishable());
        assert!(!ProviderVersion::new(" ").is_publishable());
        assert!(
            !ProviderVersion::new("1.0.0")
                .with_tags(vec![String::new()])
                .is_publishable()
        );
        assert_eq!(
            ProviderVersion::new("1").with_branch("main").branch.as_deref(),
            Some("main")
        );
    }

    #[test]
    fn test_verification_result() {
        let version = ProviderVersion::new("2.0.0");
        let success = VerificationResult::new(&version, vec![outcome("a", true)]);
        assert!(success.can_deploy());

        let failure = VerificationResult::new(&version, vec![outcome("a", true), outcome("b", false)]);
        assert!(!failure.can_deploy());
    }

    #[test]
    fn test_broker_payload_shape() {
        let result = VerificationResult::new(&ProviderVersion::new("2.0.0"), vec![outcome("a", true)]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["providerApplicationVersion"], json!("2.0.0"));
        assert_eq!(value["testResults"][0]["interactionDescription"], json!("a"));
        assert_eq!(value["verifiedBy"]["implementation"], json!("pact-rust"));
        assert!(value["testResults"][0].get("mismatches").is_none());
    }
}
