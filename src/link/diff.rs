//! Link diffs: the unit of synchronization.

use super::LinkExpression;
use crate::types::LanguageAddress;
use serde::{Deserialize, Serialize};

/// An atomic batch of additions and removals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDiff {
    #[serde(default)]
    pub additions: Vec<LinkExpression>,
    #[serde(default)]
    pub removals: Vec<LinkExpression>,
}

impl LinkDiff {
    pub fn new(additions: Vec<LinkExpression>, removals: Vec<LinkExpression>) -> Self {
        Self {
            additions,
            removals,
        }
    }

    pub fn addition(link: LinkExpression) -> Self {
        Self::new(vec![link], Vec::new())
    }

    pub fn removal(link: LinkExpression) -> Self {
        Self::new(Vec::new(), vec![link])
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// A diff delivered by a link language, tagged with the language's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDiff {
    pub language: LanguageAddress,
    pub diff: LinkDiff,
}

impl RemoteDiff {
    pub fn new(language: impl Into<LanguageAddress>, diff: LinkDiff) -> Self {
        Self {
            language: language.into(),
            diff,
        }
    }
}
