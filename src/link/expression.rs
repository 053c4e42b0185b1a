//! Link triples and signed link expressions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (source, predicate, target) triple of expression references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            predicate: None,
            target: target.into(),
        }
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// Signature over a link expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionProof {
    /// Hex-encoded signature bytes
    pub signature: String,
    /// Hex-encoded verifying key
    pub key: String,
    /// Whether the signature verified when the proof was last checked
    #[serde(default)]
    pub valid: bool,
}

/// A link together with its author, creation time and optional proof.
///
/// Expressions are never edited in place: the proof covers the exact triple,
/// so replacing a link means removing the old expression and adding a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkExpression {
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub data: Link,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ExpressionProof>,
}

/// Identity of a link expression inside a store.
///
/// The proof is deliberately left out: two deliveries of the same expression
/// must collapse even if one peer re-validated the signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub predicate: Option<String>,
    pub target: String,
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    author: &'a str,
    timestamp: String,
    data: &'a Link,
}

impl LinkExpression {
    /// Build an unsigned expression.
    pub fn new(author: impl Into<String>, timestamp: DateTime<Utc>, data: Link) -> Self {
        Self {
            author: author.into(),
            timestamp,
            data,
            proof: None,
        }
    }

    pub fn with_proof(mut self, proof: ExpressionProof) -> Self {
        self.proof = Some(proof);
        self
    }

    pub fn key(&self) -> LinkKey {
        LinkKey {
            author: self.author.clone(),
            timestamp: self.timestamp,
            source: self.data.source.clone(),
            predicate: self.data.predicate.clone(),
            target: self.data.target.clone(),
        }
    }

    /// Canonical bytes covered by the proof.
    pub fn signing_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&SigningPayload {
            author: &self.author,
            timestamp: self.timestamp.to_rfc3339(),
            data: &self.data,
        })
    }
}
