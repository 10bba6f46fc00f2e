//! Live subscriber registry for the per-tenant event stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Messages buffered per connection before further broadcasts to it are dropped.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Sending side of one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<String>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

type Registry = HashMap<Uuid, HashMap<ConnectionId, mpsc::Sender<String>>>;

/// Tenant id -> live connections. Every access goes through the one mutex;
/// sends are non-blocking so the lock is never held across an await.
pub struct BroadcastHub {
    subscribers: Mutex<Registry>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self, tenant_id: Uuid, handle: ConnectionHandle) {
        let mut registry = self.registry();
        registry
            .entry(tenant_id)
            .or_default()
            .insert(handle.id, handle.sender);
        tracing::debug!("Subscriber {} connected to tenant {tenant_id}", handle.id);
    }

    /// Returns false if the connection was not registered under this tenant.
    pub fn disconnect(&self, tenant_id: Uuid, id: ConnectionId) -> bool {
        let mut registry = self.registry();
        let Some(connections) = registry.get_mut(&tenant_id) else {
            return false;
        };
        let removed = connections.remove(&id).is_some();
        if connections.is_empty() {
            registry.remove(&tenant_id);
        }
        if removed {
            tracing::debug!("Subscriber {id} disconnected from tenant {tenant_id}");
        }
        removed
    }

    /// Sends `message` to every connection of the tenant and returns how many
    /// accepted it. A failed send (closed, or buffer full) is skipped; the
    /// connection stays registered until its own lifecycle ends.
    pub fn broadcast(&self, tenant_id: Uuid, message: &str) -> usize {
        let registry = self.registry();
        let Some(connections) = registry.get(&tenant_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, sender) in connections {
            match sender.try_send(message.to_string()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("Subscriber {id} of tenant {tenant_id} is lagging, message dropped")
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!("Broadcast to subscriber {id} of tenant {tenant_id} failed")
                }
            }
        }
        delivered
    }

    /// Registers a fresh connection and returns the guard that owns it.
    pub fn subscribe(self: &Arc<Self>, tenant_id: Uuid) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let handle = ConnectionHandle::new(sender);
        let id = handle.id();
        self.connect(tenant_id, handle);
        Subscription {
            hub: Arc::clone(self),
            tenant_id,
            id,
            receiver,
        }
    }

    pub fn subscriber_count(&self, tenant_id: Uuid) -> usize {
        self.registry().get(&tenant_id).map_or(0, HashMap::len)
    }

    pub fn tenant_count(&self) -> usize {
        self.registry().len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered live connection. Dropping it disconnects it, exactly once.
pub struct Subscription {
    hub: Arc<BroadcastHub>,
    tenant_id: Uuid,
    id: ConnectionId,
    receiver: mpsc::Receiver<String>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.disconnect(self.tenant_id, self.id);
    }
}
