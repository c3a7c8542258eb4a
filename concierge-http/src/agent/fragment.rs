use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One incremental unit of a streamed agent reply
///
/// Only `content.parts[].text` is interpreted. Every other field is kept
/// in the `extra` maps so that it can be forwarded to the client unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FragmentContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentContent {
    #[serde(default)]
    pub parts: Vec<FragmentPart>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FragmentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    /// A part carries an answer only when it has non-empty text
    pub fn has_answer(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl Fragment {
    /// Build a fragment holding a single text part
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: Some(FragmentContent {
                parts: vec![FragmentPart::text(text)],
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    /// Consume the fragment, keeping only the parts that carry an answer
    pub fn into_answer_parts(self) -> Vec<FragmentPart> {
        self.content
            .map(|c| c.parts.into_iter().filter(FragmentPart::has_answer).collect())
            .unwrap_or_default()
    }
}
