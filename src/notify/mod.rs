// Copyright (c) Ravell Team
// SPDX-License-Identifier: Apache-2.0

//! In-memory WebSocket notification fan-out.
//!
//! The registry holds the live send handles of every connected client,
//! keyed by user id, behind one process-wide lock. Delivery is best-effort:
//! no queueing, no replay, and a handle whose receiver has gone away is
//! dropped from the registry during the send.

pub mod push;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

/// A server-to-client notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub from_username: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        kind: impl Into<String>,
        from_username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            from_username: from_username.into(),
            message: message.into(),
        }
    }
}

type ClientSender = mpsc::UnboundedSender<Notification>;

struct ClientHandle {
    id: u64,
    tx: ClientSender,
}

/// Registry of live client connections, injected into handlers through the
/// application state rather than accessed as a global.
pub struct NotificationRegistry {
    clients: RwLock<HashMap<i32, Vec<ClientHandle>>>,
    next_handle: AtomicU64,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    /// Add a connection for a user. The returned handle id identifies the
    /// connection for `unregister`.
    pub fn register(&self, user_id: i32, tx: ClientSender) -> u64 {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let mut clients = self.clients.write().unwrap();
        clients
            .entry(user_id)
            .or_default()
            .push(ClientHandle { id, tx });
        debug!("Registered connection {} for user {}", id, user_id);
        id
    }

    /// Remove one of a user's connections.
    pub fn unregister(&self, user_id: i32, handle: u64) {
        let mut clients = self.clients.write().unwrap();
        if let Some(handles) = clients.get_mut(&user_id) {
            handles.retain(|h| h.id != handle);
            if handles.is_empty() {
                clients.remove(&user_id);
            }
        }
        debug!("Removed connection {} for user {}", handle, user_id);
    }

    /// Push a notification to every active connection of a user. Dead
    /// connections are pruned. Returns the number of deliveries.
    pub fn notify(&self, user_id: i32, notification: Notification) -> usize {
        let mut clients = self.clients.write().unwrap();
        let Some(handles) = clients.get_mut(&user_id) else {
            return 0;
        };

        let before = handles.len();
        handles.retain(|h| h.tx.send(notification.clone()).is_ok());
        let delivered = handles.len();
        if handles.is_empty() {
            clients.remove(&user_id);
        }
        if delivered < before {
            debug!(
                "Pruned {} dead connections for user {}",
                before - delivered,
                user_id
            );
        }
        delivered
    }

    /// Total number of live connections across all users.
    pub fn connection_count(&self) -> usize {
        self.clients.read().unwrap().values().map(Vec::len).sum()
    }
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(msg: &str) -> Notification {
        Notification::new("test", "system", msg)
    }

    #[tokio::test]
    async fn delivers_to_all_user_connections() {
        let registry = NotificationRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register(1, tx1);
        registry.register(1, tx2);

        assert_eq!(registry.notify(1, note("hello")), 2);
        assert_eq!(rx1.recv().await.unwrap().message, "hello");
        assert_eq!(rx2.recv().await.unwrap().message, "hello");
    }

    #[tokio::test]
    async fn does_not_cross_users() {
        let registry = NotificationRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(1, tx);

        assert_eq!(registry.notify(2, note("other")), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn prunes_dead_connections_on_send() {
        let registry = NotificationRegistry::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register(1, tx1);
        registry.register(1, tx2);
        assert_eq!(registry.connection_count(), 2);

        drop(rx1);
        assert_eq!(registry.notify(1, note("ping")), 1);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(rx2.recv().await.unwrap().message, "ping");
    }

    #[tokio::test]
    async fn unregister_removes_only_that_handle() {
        let registry = NotificationRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let h1 = registry.register(1, tx1);
        registry.register(1, tx2);

        registry.unregister(1, h1);
        assert_eq!(registry.notify(1, note("bye")), 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.recv().await.unwrap().message, "bye");
    }
}
