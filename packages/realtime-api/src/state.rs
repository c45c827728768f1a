use std::sync::Arc;

use shared::auth::TokenVerifier;
use shared::services::match_state_service::MatchStateService;
use shared::services::matchmaking_service::MatchmakingService;

use crate::connections::ConnectionRegistry;
use crate::rooms::Rooms;

#[derive(Clone)]
pub struct AppState {
    pub match_service: Arc<MatchStateService>,
    pub matchmaking_service: Arc<MatchmakingService>,
    pub token_verifier: Arc<TokenVerifier>,
    pub connections: ConnectionRegistry,
    pub rooms: Rooms,
}

impl AppState {
    pub fn new(
        match_service: Arc<MatchStateService>,
        matchmaking_service: Arc<MatchmakingService>,
        token_verifier: Arc<TokenVerifier>,
    ) -> Self {
        AppState {
            match_service,
            matchmaking_service,
            token_verifier,
            connections: ConnectionRegistry::new(),
            rooms: Rooms::new(),
        }
    }
}
