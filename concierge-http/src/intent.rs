use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::ChatError;

/// Name used when the registry is built from a single resource id
pub const DEFAULT_INTENT_NAME: &str = "default";

/// A named routing target pointing at a remote agent deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub remote_agent_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Intent {
    pub fn new(name: impl Into<String>, remote_agent_resource_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_agent_resource_id: remote_agent_resource_id.into(),
            description: None,
        }
    }
}

/// Routing collaborator consulted once per connection
pub trait IntentResolver: Send + Sync {
    /// Intent serving connections that do not ask for a specific one
    fn resolve_default_intent(&self) -> Result<Intent, ChatError>;
}

#[derive(Debug, Deserialize)]
struct IntentsFile {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    intents: Vec<Intent>,
}

/// Statically configured set of intents
#[derive(Debug, Clone, Default)]
pub struct IntentRegistry {
    intents: Vec<Intent>,
    default: Option<String>,
}

impl IntentRegistry {
    /// Build a registry, rejecting duplicate names and an unknown default
    pub fn new(intents: Vec<Intent>, default: Option<String>) -> Result<Self, ChatError> {
        let mut seen = HashSet::new();
        for intent in &intents {
            if !seen.insert(intent.name.as_str()) {
                return Err(ChatError::Configuration(format!(
                    "Duplicate intent name: {}",
                    intent.name
                )));
            }
        }

        if let Some(name) = &default {
            if !seen.contains(name.as_str()) {
                return Err(ChatError::Configuration(format!(
                    "Default intent '{}' is not registered",
                    name
                )));
            }
        }

        Ok(Self { intents, default })
    }

    /// Registry with one intent, named `default`, that is also the default
    pub fn single(remote_agent_resource_id: impl Into<String>) -> Self {
        Self {
            intents: vec![Intent::new(DEFAULT_INTENT_NAME, remote_agent_resource_id)],
            default: Some(DEFAULT_INTENT_NAME.to_string()),
        }
    }

    /// Parse `{"default": "...", "intents": [...]}`
    pub fn from_json(json: &str) -> Result<Self, ChatError> {
        let file: IntentsFile = serde_json::from_str(json)
            .map_err(|e| ChatError::Configuration(format!("Invalid intents file: {}", e)))?;
        Self::new(file.intents, file.default)
    }

    /// Load the registry from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json(&content)?;
        info!(
            "Loaded {} intent(s) from {} (default: {})",
            registry.intents.len(),
            path.display(),
            registry.default.as_deref().unwrap_or("none")
        );
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.name == name)
    }

    pub fn list(&self) -> &[Intent] {
        &self.intents
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

impl IntentResolver for IntentRegistry {
    fn resolve_default_intent(&self) -> Result<Intent, ChatError> {
        self.default
            .as_deref()
            .and_then(|name| self.get(name))
            .cloned()
            .ok_or_else(|| ChatError::Configuration("No default intent registered".to_string()))
    }
}
