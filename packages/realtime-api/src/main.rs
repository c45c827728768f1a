use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use realtime_api::handlers::ws_handler;
use realtime_api::state::AppState;
use realtime_api::sweeper;
use shared::auth::TokenVerifier;
use shared::engines::EngineRegistry;
use shared::repositories::match_state_repository::{
    DynamoDbMatchStateRepository, MatchStateRepository,
};
use shared::repositories::stats_repository::{
    DynamoDbStatsRepository, FixedRatingStatsRepository, StatsRepository,
};
use shared::services::match_state_service::MatchStateService;
use shared::services::matchmaking_service::MatchmakingService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let jwt_secret =
        std::env::var("JWT_SECRET").expect("JWT_SECRET environment variable must be set");
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let match_table = std::env::var("MATCH_STATES_TABLE").ok();
    let stats_table = std::env::var("PLAYER_STATS_TABLE").ok();
    let dynamodb = if match_table.is_some() || stats_table.is_some() {
        let config = aws_config::load_from_env().await;
        Some(aws_sdk_dynamodb::Client::new(&config))
    } else {
        None
    };

    let match_repository: Option<Arc<dyn MatchStateRepository>> =
        match (match_table, dynamodb.clone()) {
            (Some(table), Some(client)) => {
                info!("Persisting match state to DynamoDB table {}", table);
                Some(Arc::new(DynamoDbMatchStateRepository::with_table_name(
                    client, table,
                )))
            }
            _ => {
                warn!("MATCH_STATES_TABLE not set; matches will not survive a restart");
                None
            }
        };
    let stats_repository: Arc<dyn StatsRepository> = match (stats_table, dynamodb) {
        (Some(table), Some(client)) => {
            Arc::new(DynamoDbStatsRepository::with_table_name(client, table))
        }
        _ => {
            warn!("PLAYER_STATS_TABLE not set; every player rates at the default");
            Arc::new(FixedRatingStatsRepository)
        }
    };

    let match_service = Arc::new(MatchStateService::new(
        EngineRegistry::with_builtin_engines(),
        match_repository,
    ));
    let matchmaking_service = Arc::new(MatchmakingService::new(stats_repository));
    let token_verifier = Arc::new(TokenVerifier::new(jwt_secret));

    sweeper::spawn(matchmaking_service.clone());

    let app_state = AppState::new(match_service, matchmaking_service, token_verifier);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listen address");
    info!("Realtime gateway listening on {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

async fn health_check() -> &'static str {
    "OK"
}
