//! Installed link languages and the merged remote diff stream.

use super::contract::LinkLanguage;
use crate::error::{ApiError, LanguageError};
use crate::link::RemoteDiff;
use crate::types::LanguageAddress;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct InstalledLanguage {
    language: Arc<dyn LinkLanguage>,
    forwarder: JoinHandle<()>,
}

/// Holds loaded link languages and merges their remote diffs into one
/// stream tagged with the originating address.
///
/// The merged stream has a single consumer, normally the perspectives
/// registry. `install` must be called from within a tokio runtime.
pub struct LanguageController {
    languages: RwLock<HashMap<LanguageAddress, InstalledLanguage>>,
    events_tx: mpsc::Sender<RemoteDiff>,
    events_rx: Mutex<Option<mpsc::Receiver<RemoteDiff>>>,
}

impl LanguageController {
    /// Create a controller whose merged stream buffers up to `capacity` diffs.
    pub fn new(capacity: usize) -> Self {
        let (events_tx, events_rx) = mpsc::channel(capacity.max(1));
        Self {
            languages: RwLock::new(HashMap::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Install a language and start forwarding its remote diffs.
    pub fn install(&self, language: Arc<dyn LinkLanguage>) -> Result<(), ApiError> {
        let address = language.address().to_string();
        let mut languages = self.languages.write();
        if languages.contains_key(&address) {
            return Err(LanguageError::AlreadyInstalled(address).into());
        }

        let mut diffs = language.register_diff_observer()?;
        let events = self.events_tx.clone();
        let tag = address.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(diff) = diffs.recv().await {
                debug!(
                    language = %tag,
                    additions = diff.additions.len(),
                    removals = diff.removals.len(),
                    "Forwarding remote diff"
                );
                if events.send(RemoteDiff::new(tag.clone(), diff)).await.is_err() {
                    debug!(language = %tag, "Remote diff stream closed, stopping forwarder");
                    break;
                }
            }
        });

        languages.insert(
            address.clone(),
            InstalledLanguage {
                language,
                forwarder,
            },
        );
        info!(language = %address, "Installed link language");
        Ok(())
    }

    /// Remove a language. Its forwarder stops and its observer is released;
    /// buffered diffs already in the merged stream are still delivered.
    pub fn uninstall(&self, address: &str) -> Option<Arc<dyn LinkLanguage>> {
        let removed = self.languages.write().remove(address)?;
        removed.forwarder.abort();
        removed.language.release_diff_observer();
        info!(language = %address, "Uninstalled link language");
        Some(removed.language)
    }

    pub fn language(&self, address: &str) -> Option<Arc<dyn LinkLanguage>> {
        self.languages
            .read()
            .get(address)
            .map(|installed| Arc::clone(&installed.language))
    }

    pub fn addresses(&self) -> Vec<LanguageAddress> {
        let mut addresses: Vec<_> = self.languages.read().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    /// Take the merged remote diff stream. Succeeds once.
    pub fn take_diff_events(&self) -> Result<mpsc::Receiver<RemoteDiff>, LanguageError> {
        self.events_rx
            .lock()
            .take()
            .ok_or(LanguageError::DiffStreamTaken)
    }

    /// Sender into the merged stream, for hosts relaying diffs from
    /// languages that live outside this process.
    pub fn event_sender(&self) -> mpsc::Sender<RemoteDiff> {
        self.events_tx.clone()
    }
}

impl Drop for LanguageController {
    fn drop(&mut self) {
        let languages = self.languages.get_mut();
        if !languages.is_empty() {
            warn!(
                count = languages.len(),
                "Dropping language controller with installed languages"
            );
        }
        for (_, installed) in languages.drain() {
            installed.forwarder.abort();
        }
    }
}
