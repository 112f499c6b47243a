use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Caller chosen token binding a request to its replies
pub type CorrelationId = String;

/// Delivery side of a registered request, handed out to the dispatcher
pub type ResponseSender = mpsc::UnboundedSender<Vec<u8>>;

/// Errors raised by the [`CorrelationRegistry`]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Another request with the same id is still waiting for its reply
    #[error("request '{0}' is already awaiting a response")]
    DuplicateId(CorrelationId),
}

#[derive(Debug)]
struct Entry {
    token: u64,
    tx: ResponseSender,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Mutex<HashMap<CorrelationId, Entry>>,
    next_token: AtomicU64,
}

/// Concurrency safe mapping from correlation id to the delivery channel of a waiting request
///
/// Cloning is cheap and every clone refers to the same map. A registry is created once per
/// client and shared between all reply listeners and in-flight requests.
#[derive(Debug, Clone, Default)]
pub struct CorrelationRegistry {
    state: Arc<RegistryState>,
}

impl CorrelationRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a delivery channel for `id` and returns the receiving side
    ///
    /// Must be called before the request is published so that no reply can slip through.
    /// The entry lives until the returned [`PendingResponse`] is released or dropped.
    pub fn register(&self, id: impl Into<CorrelationId>) -> Result<PendingResponse, RegistryError> {
        let id = id.into();
        let token = self.state.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut entries = self.entries();
            if entries.contains_key(&id) {
                return Err(RegistryError::DuplicateId(id));
            }
            entries.insert(id.clone(), Entry { token, tx });
        }

        trace!(request_id = %id, "Registered pending request");

        Ok(PendingResponse {
            id,
            token,
            rx,
            registry: self.clone(),
            released: false,
        })
    }

    /// Non-blocking lookup of the delivery channel for `id`
    pub fn lookup(&self, id: &str) -> Option<ResponseSender> {
        self.entries().get(id).map(|entry| entry.tx.clone())
    }

    /// Removes the entry for `id` regardless of who registered it
    ///
    /// Returns whether an entry existed. Regular callers never need this as
    /// [`PendingResponse`] releases its own entry.
    pub fn release(&self, id: &str) -> bool {
        self.entries().remove(id).is_some()
    }

    /// Whether a request with the given id is currently waiting
    pub fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    /// Number of requests currently waiting
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no request is currently waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release_token(&self, id: &str, token: u64) -> bool {
        let mut entries = self.entries();

        // The id may have been released externally and registered again in the meantime
        match entries.get(id) {
            Some(entry) if entry.token == token => entries.remove(id).is_some(),
            _ => false,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CorrelationId, Entry>> {
        // Critical sections never panic half-way, the map is consistent even if poisoned
        self.state
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of one request, owned by whoever waits for its replies
///
/// Releases the registry entry exactly once, either explicitly through
/// [`release`](PendingResponse::release) or when dropped.
#[derive(Debug)]
pub struct PendingResponse {
    id: CorrelationId,
    token: u64,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    registry: CorrelationRegistry,
    released: bool,
}

impl PendingResponse {
    /// Correlation id this registration listens for
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the next payload routed to this registration
    ///
    /// Returns `None` once the entry has been removed from the registry and all
    /// payloads delivered before that have been consumed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Closes the delivery channel and removes the registry entry
    pub fn release(mut self) {
        self.release_entry();
    }

    fn release_entry(&mut self) {
        if self.released {
            return;
        }

        self.released = true;
        self.rx.close();

        if self.registry.release_token(&self.id, self.token) {
            trace!(request_id = %self.id, "Released pending request");
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.release_entry();
    }
}
