use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::events::ServerEvent;

pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

struct ConnectionHandle {
    player_id: Option<String>,
    sender: OutboundSender,
}

/// Live connections and the identity each one authenticated as. The
/// sender is the only way anything reaches a client; the socket writer
/// task drains it.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<String, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry::default()
    }

    pub async fn register(&self, connection_id: &str, sender: OutboundSender) {
        let mut inner = self.inner.lock().await;
        inner.insert(
            connection_id.to_string(),
            ConnectionHandle {
                player_id: None,
                sender,
            },
        );
    }

    pub async fn remove(&self, connection_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.remove(connection_id);
    }

    /// Bind an authenticated identity to the connection. Every later
    /// event on this connection is checked against it.
    pub async fn bind_player(&self, connection_id: &str, player_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.get_mut(connection_id) {
            handle.player_id = Some(player_id.to_string());
        }
    }

    pub async fn player_of(&self, connection_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .get(connection_id)
            .and_then(|handle| handle.player_id.clone())
    }

    pub async fn connection_of_player(&self, player_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .iter()
            .find(|(_, handle)| handle.player_id.as_deref() == Some(player_id))
            .map(|(connection_id, _)| connection_id.clone())
    }

    /// Push an event to one connection. A closed or unknown connection
    /// is logged and skipped; gameplay never fails on delivery.
    pub async fn send_to(&self, connection_id: &str, event: ServerEvent) {
        let inner = self.inner.lock().await;
        match inner.get(connection_id) {
            Some(handle) => {
                if handle.sender.send(event).is_err() {
                    warn!("Dropped event for closed connection {}", connection_id);
                }
            }
            None => warn!("Dropped event for unknown connection {}", connection_id),
        }
    }
}
