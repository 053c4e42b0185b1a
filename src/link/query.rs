//! Link queries.

use super::LinkExpression;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter over a perspective's links. Every field is optional; an empty
/// query selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkQuery {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// Inclusive lower bound on the link timestamp
    #[serde(default)]
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the link timestamp
    #[serde(default)]
    pub until_date: Option<DateTime<Utc>>,
    /// Keep only the first `limit` results after ordering
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LinkQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn from_date(mut self, from: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn until_date(mut self, until: DateTime<Utc>) -> Self {
        self.until_date = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a single expression passes every filter set on this query.
    pub fn matches(&self, link: &LinkExpression) -> bool {
        if let Some(source) = &self.source {
            if &link.data.source != source {
                return false;
            }
        }
        if let Some(predicate) = &self.predicate {
            if link.data.predicate.as_ref() != Some(predicate) {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if &link.data.target != target {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if link.timestamp < from {
                return false;
            }
        }
        if let Some(until) = self.until_date {
            if link.timestamp > until {
                return false;
            }
        }
        true
    }
}
