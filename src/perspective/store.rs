//! In-memory link store
//!
//! Holds the links of one perspective. There is no canonical lookup key for
//! queries; identity (`LinkKey`) only serves deduplication and removal.
//! Results are ordered by timestamp, then by insertion sequence.

use crate::link::{LinkDiff, LinkExpression, LinkKey, LinkQuery};
use std::collections::{BTreeMap, HashMap};

/// Changes that a diff actually made to a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedDiff {
    pub added: Vec<LinkExpression>,
    pub removed: Vec<LinkExpression>,
}

impl AppliedDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Link storage with idempotent insert and remove.
#[derive(Debug, Default)]
pub struct LinkStore {
    next_seq: u64,
    by_seq: BTreeMap<u64, LinkExpression>,
    index: HashMap<LinkKey, u64>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    pub fn contains(&self, link: &LinkExpression) -> bool {
        self.index.contains_key(&link.key())
    }

    /// Insert a link. Returns false if an identical link is already stored.
    pub fn insert(&mut self, link: LinkExpression) -> bool {
        let key = link.key();
        if self.index.contains_key(&key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(key, seq);
        self.by_seq.insert(seq, link);
        true
    }

    /// Remove a link. Removing an absent link is a no-op returning false.
    pub fn remove(&mut self, link: &LinkExpression) -> bool {
        match self.index.remove(&link.key()) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    /// Merge a diff: additions first, then removals.
    pub fn apply(&mut self, diff: &LinkDiff) -> AppliedDiff {
        let mut applied = AppliedDiff::default();
        for link in &diff.additions {
            if self.insert(link.clone()) {
                applied.added.push(link.clone());
            }
        }
        for link in &diff.removals {
            if let Some(seq) = self.index.remove(&link.key()) {
                if let Some(stored) = self.by_seq.remove(&seq) {
                    applied.removed.push(stored);
                }
            }
        }
        applied
    }

    /// Links matching `query`, ordered by timestamp then insertion.
    pub fn query(&self, query: &LinkQuery) -> Vec<LinkExpression> {
        let mut matches: Vec<(u64, &LinkExpression)> = self
            .by_seq
            .iter()
            .filter(|(_, link)| query.matches(link))
            .map(|(seq, link)| (*seq, link))
            .collect();

        matches.sort_by(|(seq_a, a), (seq_b, b)| {
            a.timestamp.cmp(&b.timestamp).then_with(|| seq_a.cmp(seq_b))
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        matches
            .into_iter()
            .take(limit)
            .map(|(_, link)| link.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<LinkExpression> {
        self.query(&LinkQuery::default())
    }
}
