//! Plugin protocol types
//!
//! Plugins communicate via JSON messages over stdin/stdout, one request line
//! in and one response line out. Each plugin must support the `--manifest`
//! flag to declare capabilities.

use serde::{Deserialize, Serialize};

/// Operation that turns a prompt into blueprint text
pub const GENERATE: &str = "generate";

/// Plugin manifest declaring capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name (e.g., "blueprint-source-openai")
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Supported operations
    #[serde(default)]
    pub operations: Vec<String>,
}

impl PluginManifest {
    pub fn supports(&self, operation: &str) -> bool {
        self.operations.iter().any(|op| op == operation)
    }
}

/// A message sent to a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRequest {
    /// The operation to perform
    pub operation: String,

    /// Operation-specific parameters
    pub params: serde_json::Value,
}

impl PluginRequest {
    pub fn new(operation: impl Into<String>, params: impl Into<serde_json::Value>) -> Self {
        Self {
            operation: operation.into(),
            params: params.into(),
        }
    }

    /// Asks for a blueprint describing `prompt`
    pub fn generate(prompt: &str) -> Self {
        Self::new(GENERATE, serde_json::json!({ "prompt": prompt }))
    }
}

/// A response from a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Whether the operation succeeded
    pub success: bool,

    /// Result data (if success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message (if failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of a successful `generate` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateData {
    pub blueprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_serialization() {
        let manifest = PluginManifest {
            name: "blueprint-source-openai".to_string(),
            version: "0.1.0".to_string(),
            description: "Blueprints from prompts".to_string(),
            operations: vec![GENERATE.to_string()],
        };

        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: PluginManifest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.name, manifest.name);
        assert!(parsed.supports("generate"));
        assert!(!parsed.supports("sync"));
    }

    #[test]
    fn generate_request_shape() {
        let request = PluginRequest::generate("a rust cli");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["operation"], "generate");
        assert_eq!(json["params"]["prompt"], "a rust cli");
    }

    #[test]
    fn generate_response_data() {
        let line = r#"{"success":true,"data":{"blueprint":"app/\n\tsrc/\n"}}"#;
        let response: PluginResponse = serde_json::from_str(line).unwrap();

        assert!(response.success);
        let data: GenerateData = serde_json::from_value(response.data.unwrap()).unwrap();
        assert_eq!(data.blueprint, "app/\n\tsrc/\n");
    }

    #[test]
    fn response_error() {
        let line = r#"{"success":false,"error":"quota exceeded"}"#;
        let response: PluginResponse = serde_json::from_str(line).unwrap();

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("quota exceeded"));
    }
}
