//! In-process link language.
//!
//! Keeps the shared link set in memory. Remote peers are simulated with
//! `deliver_remote`. Accepted local submissions are echoed back through the
//! observer the way a gossiping network returns them, unless echo is
//! switched off.

use super::contract::{Ack, DiffReceiver, LinkLanguage};
use crate::error::{LanguageError, PropagationError};
use crate::link::{LinkDiff, LinkExpression};
use crate::perspective::LinkStore;
use crate::types::LanguageAddress;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

pub struct MemoryLinkLanguage {
    address: LanguageAddress,
    capacity: usize,
    echo: bool,
    observer: Mutex<Option<mpsc::Sender<LinkDiff>>>,
    registered: Mutex<bool>,
    shared: Mutex<LinkStore>,
    submitted: Mutex<Vec<LinkDiff>>,
    outage: Mutex<Option<String>>,
}

impl MemoryLinkLanguage {
    pub fn new(address: impl Into<LanguageAddress>) -> Self {
        Self {
            address: address.into(),
            capacity: DEFAULT_CAPACITY,
            echo: true,
            observer: Mutex::new(None),
            registered: Mutex::new(false),
            shared: Mutex::new(LinkStore::new()),
            submitted: Mutex::new(Vec::new()),
            outage: Mutex::new(None),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Whether accepted local diffs are echoed back to the observer.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Seed the shared state as if peers had published these links before
    /// this agent joined.
    pub fn seed(&self, links: Vec<LinkExpression>) {
        self.shared.lock().apply(&LinkDiff::new(links, Vec::new()));
    }

    /// Simulate a diff arriving from another peer.
    pub async fn deliver_remote(&self, diff: LinkDiff) -> Result<(), PropagationError> {
        self.shared.lock().apply(&diff);
        self.notify(diff).await
    }

    /// Make every submission fail with `Unavailable` until cleared.
    pub fn set_unavailable(&self, reason: Option<String>) {
        *self.outage.lock() = reason;
    }

    /// Diffs accepted through `submit_local_diff`, in order.
    pub fn submitted(&self) -> Vec<LinkDiff> {
        self.submitted.lock().clone()
    }

    async fn notify(&self, diff: LinkDiff) -> Result<(), PropagationError> {
        let observer = self.observer.lock().clone();
        let Some(observer) = observer else {
            debug!(language = %self.address, "No diff observer registered, diff kept in shared state only");
            return Ok(());
        };
        observer
            .send(diff)
            .await
            .map_err(|_| PropagationError::Unavailable {
                address: self.address.clone(),
                reason: "diff observer dropped".to_string(),
            })
    }
}

#[async_trait]
impl LinkLanguage for MemoryLinkLanguage {
    fn address(&self) -> &str {
        &self.address
    }

    fn register_diff_observer(&self) -> Result<DiffReceiver, LanguageError> {
        let mut registered = self.registered.lock();
        if *registered {
            return Err(LanguageError::ObserverAlreadyRegistered(
                self.address.clone(),
            ));
        }
        let (tx, rx) = mpsc::channel(self.capacity);
        *self.observer.lock() = Some(tx);
        *registered = true;
        Ok(rx)
    }

    fn release_diff_observer(&self) {
        let mut registered = self.registered.lock();
        *self.observer.lock() = None;
        *registered = false;
    }

    async fn submit_local_diff(&self, diff: LinkDiff) -> Result<Ack, PropagationError> {
        let outage = self.outage.lock().clone();
        if let Some(reason) = outage {
            return Err(PropagationError::Unavailable {
                address: self.address.clone(),
                reason,
            });
        }

        let ack = Ack::for_diff(self.address.clone(), &diff);
        self.shared.lock().apply(&diff);
        self.submitted.lock().push(diff.clone());
        if self.echo {
            if let Err(err) = self.notify(diff).await {
                debug!(language = %self.address, error = %err, "Echo not delivered");
            }
        }
        Ok(ack)
    }

    async fn current_state(&self) -> Result<Vec<LinkExpression>, PropagationError> {
        let outage = self.outage.lock().clone();
        if let Some(reason) = outage {
            return Err(PropagationError::Unavailable {
                address: self.address.clone(),
                reason,
            });
        }
        Ok(self.shared.lock().all())
    }
}
