//! Perspective identity records.

use crate::types::{LanguageAddress, PerspectiveId};
use serde::{Deserialize, Serialize};

/// Binding of a perspective to a shared namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neighbourhood {
    pub link_language_address: LanguageAddress,
    #[serde(default)]
    pub shared_metadata: serde_json::Value,
}

impl Neighbourhood {
    pub fn new(link_language_address: impl Into<LanguageAddress>) -> Self {
        Self {
            link_language_address: link_language_address.into(),
            shared_metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.shared_metadata = metadata;
        self
    }
}

/// Durable identity record of a perspective.
///
/// This is the unit that gets persisted; the link graph is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveHandle {
    pub uuid: PerspectiveId,
    pub name: String,
    #[serde(default)]
    pub shared_url: Option<String>,
    #[serde(default)]
    pub neighbourhood: Option<Neighbourhood>,
}

impl PerspectiveHandle {
    pub fn new(uuid: PerspectiveId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            shared_url: None,
            neighbourhood: None,
        }
    }

    pub fn language_address(&self) -> Option<&str> {
        self.neighbourhood
            .as_ref()
            .map(|n| n.link_language_address.as_str())
    }
}
