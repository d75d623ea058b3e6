//! Artifact references.
//!
//! The data layer stores derived artifacts in several shapes: a bare URL
//! string, an attachment object carrying a `url`, or a list of either.
//! Rows are decoded into [`Artifact`] once and resolved to a plain URL at the
//! data-layer boundary, so the rest of the system only sees `Option<String>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A stored artifact reference in any of the shapes the data layer emits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Artifact {
    /// Empty slot.
    #[default]
    None,
    /// A bare URL string.
    Direct(String),
    /// An attachment object with a `url` (or `signedUrl`) field.
    Wrapped(String),
    /// A list of artifacts; the first resolvable one wins.
    List(Vec<Artifact>),
}

impl Artifact {
    /// Build an artifact from an arbitrary JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Artifact::None,
            Value::String(s) => {
                if s.trim().is_empty() {
                    Artifact::None
                } else {
                    Artifact::Direct(s)
                }
            }
            Value::Object(map) => {
                let url = ["url", "signedUrl", "signed_url", "path"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .filter(|s| !s.trim().is_empty());
                match url {
                    Some(url) => Artifact::Wrapped(url.to_string()),
                    None => Artifact::None,
                }
            }
            Value::Array(items) => Artifact::List(items.into_iter().map(Artifact::from_value).collect()),
            Value::Bool(_) | Value::Number(_) => Artifact::None,
        }
    }

    /// Check whether the artifact resolves to a URL.
    pub fn is_present(&self) -> bool {
        resolve_artifact_url(self).is_some()
    }
}

/// Resolve an artifact to its URL, if any.
pub fn resolve_artifact_url(artifact: &Artifact) -> Option<&str> {
    match artifact {
        Artifact::None => None,
        Artifact::Direct(url) | Artifact::Wrapped(url) => Some(url.as_str()),
        Artifact::List(items) => items.iter().find_map(resolve_artifact_url),
    }
}

impl From<Option<String>> for Artifact {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(url) if !url.trim().is_empty() => Artifact::Direct(url),
            _ => Artifact::None,
        }
    }
}

impl<'de> Deserialize<'de> for Artifact {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Artifact::from_value(value))
    }
}

impl Serialize for Artifact {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match resolve_artifact_url(self) {
            Some(url) => serializer.serialize_str(url),
            None => serializer.serialize_none(),
        }
    }
}
