/// Tool catalog
///
/// Converts the subprocess's native tool definitions (name, description,
/// JSON-Schema input shape) into typed descriptors. The facade caches the
/// converted list; the supervisor clears that cache on every crash, restart,
/// and stop so the next call re-discovers tools from the new process.
use super::error::BridgeError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// A tool advertised by the subprocess
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    /// Tool identifier used in `tools/call`
    pub name: String,
    /// Human-readable name (native `title`, falling back to the identifier)
    pub display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Typed parameter schema
    pub schema: ToolSchema,
    /// Rough size cost, derived from the serialized native definition
    pub estimated_tokens: usize,
}

/// JSON-Schema-like parameter shape, as a tagged variant over the finite
/// primitive kinds rather than an untyped value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolSchema {
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        items: Option<Box<ToolSchema>>,
    },
    Object {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        properties: BTreeMap<String, ToolSchema>,
        required: Vec<String>,
    },
}

impl ToolSchema {
    /// Convert a native JSON-Schema value. Unknown or missing `type`
    /// degrades to an empty object schema instead of failing the catalog.
    pub fn from_value(value: &Value) -> Self {
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);

        match value.get("type").and_then(Value::as_str) {
            Some("string") => ToolSchema::String { description },
            Some("number") | Some("integer") => ToolSchema::Number { description },
            Some("boolean") => ToolSchema::Boolean { description },
            Some("array") => ToolSchema::Array {
                description,
                items: value.get("items").map(|v| Box::new(Self::from_value(v))),
            },
            _ => {
                let properties = value
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(k, v)| (k.clone(), Self::from_value(v)))
                            .collect()
                    })
                    .unwrap_or_default();
                let required = value
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();
                ToolSchema::Object {
                    description,
                    properties,
                    required,
                }
            }
        }
    }
}

/// Validate and convert a `tools/list` result.
///
/// Anything other than an object carrying a `tools` array is rejected;
/// individual definitions without a `name` are skipped with a warning.
pub fn parse_catalog(result: &Value) -> Result<Vec<ToolDescriptor>, BridgeError> {
    let tools = result
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            BridgeError::InvalidResponse("tools/list result missing 'tools' array".to_string())
        })?;

    let mut descriptors = Vec::with_capacity(tools.len());
    for raw in tools {
        let Some(name) = raw.get("name").and_then(Value::as_str) else {
            warn!(target: "bridge", tool = %raw, "Tool definition missing 'name'; skipping");
            continue;
        };
        let display_name = raw
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();
        let description = raw
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let schema = raw
            .get("inputSchema")
            .map(ToolSchema::from_value)
            .unwrap_or(ToolSchema::Object {
                description: None,
                properties: BTreeMap::new(),
                required: Vec::new(),
            });
        let estimated_tokens = estimate_tokens(raw);

        descriptors.push(ToolDescriptor {
            name: name.to_string(),
            display_name,
            description,
            schema,
            estimated_tokens,
        });
    }
    Ok(descriptors)
}

/// Size-based token estimate from the serialized native definition.
fn estimate_tokens(raw: &Value) -> usize {
    serde_json::to_string(raw).map(|s| s.len() / 4).unwrap_or(0)
}
