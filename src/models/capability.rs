use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    /// One of "string", "number", "boolean", "array", "object".
    pub param_type: String,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub action: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    pub estimated_execution_time_ms: u64,
}

impl Capability {
    /// All `required` parameters are present in `params` with a
    /// JSON-shape-compatible value. Used by `AgentRegistry::find_best`.
    pub fn accepts(&self, params: &std::collections::HashMap<String, serde_json::Value>) -> bool {
        self.parameters.iter().all(|spec| {
            if !spec.required {
                return true;
            }
            match params.get(&spec.name) {
                Some(value) => type_matches(&spec.param_type, value),
                None => false,
            }
        })
    }
}

fn type_matches(expected: &str, value: &serde_json::Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}
