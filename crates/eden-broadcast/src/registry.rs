use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use eden_core::types::ConnId;
use tokio::sync::{mpsc, Notify};
use tracing::debug;

use crate::error::BroadcastError;

/// One serialized alert, shared by every recipient of a dispatch.
pub type Frame = Arc<str>;

/// Sending half of a viewer's bounded outbound queue.
pub type Outbox = mpsc::Sender<Frame>;

/// A registry entry as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ConnId,
    pub outbox: Outbox,
}

struct Slot {
    outbox: Outbox,
    /// Fired on removal so the owning connection task stops at once.
    removed: Arc<Notify>,
}

/// The set of live viewer connections.
///
/// Backed by a sharded map keyed by connection id, so subscribe, disconnect
/// and dispatch snapshots from many tasks never contend on one lock. Entries
/// are inserted whole; a snapshot never sees a half-built member.
pub struct ConnectionRegistry {
    members: DashMap<ConnId, Slot>,
    /// Reserved slots, including adds that have not inserted yet.
    slots: AtomicUsize,
    max_connections: usize,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            members: DashMap::new(),
            slots: AtomicUsize::new(0),
            max_connections,
        }
    }

    /// Register a newly accepted connection. Always creates a new entry.
    pub fn add(&self, outbox: Outbox) -> Result<ConnId, BroadcastError> {
        self.insert(outbox).map(|(id, _)| id)
    }

    /// Register and tie membership to the returned guard's lifetime.
    pub fn join(self: &Arc<Self>, outbox: Outbox) -> Result<Membership, BroadcastError> {
        let (id, removed) = self.insert(outbox)?;
        Ok(Membership {
            registry: Arc::clone(self),
            id,
            removed,
        })
    }

    fn insert(&self, outbox: Outbox) -> Result<(ConnId, Arc<Notify>), BroadcastError> {
        let max = self.max_connections;
        self.slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|_| BroadcastError::RegistryFull { max })?;

        let id = ConnId::new();
        let removed = Arc::new(Notify::new());
        self.members.insert(
            id.clone(),
            Slot {
                outbox,
                removed: Arc::clone(&removed),
            },
        );
        debug!(conn_id = %id, "viewer registered");
        Ok((id, removed))
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn remove(&self, id: &ConnId) -> bool {
        if let Some((_, slot)) = self.members.remove(id) {
            self.slots.fetch_sub(1, Ordering::AcqRel);
            slot.removed.notify_one();
            debug!(conn_id = %id, "viewer deregistered");
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.members.contains_key(id)
    }

    /// Point-in-time copy of the members, safe to iterate while the
    /// registry keeps changing.
    pub fn snapshot(&self) -> Vec<Member> {
        self.members
            .iter()
            .map(|entry| Member {
                id: entry.key().clone(),
                outbox: entry.value().outbox.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// Scoped registry membership: the entry is removed when this is dropped,
/// whichever way the owning connection task exits.
pub struct Membership {
    registry: Arc<ConnectionRegistry>,
    id: ConnId,
    removed: Arc<Notify>,
}

impl Membership {
    pub fn id(&self) -> &ConnId {
        &self.id
    }

    /// False once a failed delivery has already evicted this connection.
    pub fn is_registered(&self) -> bool {
        self.registry.contains(&self.id)
    }

    /// Resolves once this connection has been removed from the registry,
    /// including a removal that happened before the call.
    pub async fn evicted(&self) {
        if !self.is_registered() {
            return;
        }
        self.removed.notified().await;
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
