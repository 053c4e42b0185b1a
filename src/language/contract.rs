//! Link language capability surface.

use crate::error::{LanguageError, PropagationError};
use crate::link::{LinkDiff, LinkExpression};
use crate::types::LanguageAddress;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// Stream of remote diffs handed out to the single registered observer.
pub type DiffReceiver = mpsc::Receiver<LinkDiff>;

/// Acknowledgement that a language accepted a local diff for propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub language: LanguageAddress,
    pub additions: usize,
    pub removals: usize,
}

impl Ack {
    pub fn for_diff(language: impl Into<LanguageAddress>, diff: &LinkDiff) -> Self {
        Self {
            language: language.into(),
            additions: diff.additions.len(),
            removals: diff.removals.len(),
        }
    }
}

/// A plugin that replicates links across peers sharing a neighbourhood.
///
/// Delivery is at-least-once in both directions. Implementations must not
/// assume diffs arrive in causal order.
#[async_trait]
pub trait LinkLanguage: Send + Sync {
    /// Address this language is installed under.
    fn address(&self) -> &str;

    /// Hand out the stream of remote diffs. Only one observer may register.
    fn register_diff_observer(&self) -> Result<DiffReceiver, LanguageError>;

    /// Drop the registered observer so a later registration can succeed.
    ///
    /// Called on uninstall. Languages that keep the default cannot be
    /// installed again once uninstalled.
    fn release_diff_observer(&self) {}

    /// Propagate a locally produced diff to peers.
    async fn submit_local_diff(&self, diff: LinkDiff) -> Result<Ack, PropagationError>;

    /// The language's current view of the shared link set, for backfill.
    async fn current_state(&self) -> Result<Vec<LinkExpression>, PropagationError>;
}

impl fmt::Debug for dyn LinkLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkLanguage")
            .field("address", &self.address())
            .finish()
    }
}
