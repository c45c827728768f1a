use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

/// Connection sets per match id: both players plus any spectators.
/// Membership only controls broadcast fan-out, never game authority.
#[derive(Clone, Default)]
pub struct Rooms {
    inner: Arc<Mutex<HashMap<String, HashSet<String>>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Rooms::default()
    }

    pub async fn join(&self, match_id: &str, connection_id: &str) {
        let mut inner = self.inner.lock().await;
        inner
            .entry(match_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    pub async fn members(&self, match_id: &str) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .get(match_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn close(&self, match_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.remove(match_id);
    }

    /// Drop a connection from every room it is in; empty rooms are
    /// removed.
    pub async fn leave_all(&self, connection_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }
}
