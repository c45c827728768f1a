use std::sync::Arc;
use std::time::Duration;

use shared::services::matchmaking_service::MatchmakingService;
use tokio::task::JoinHandle;
use tracing::info;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic eviction of stale queue entries and abandoned matches, off
/// the request path.
pub fn spawn(matchmaking_service: Arc<MatchmakingService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        info!("Matchmaking sweeper running every {:?}", SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            matchmaking_service.cleanup_stale_matches().await;
        }
    })
}
