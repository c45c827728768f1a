use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared::models::game_match::{Match, MatchStatus};
use shared::models::game_type::GameType;

use crate::events::{ClientEvent, ServerEvent};
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per connection: a writer draining the outbound channel and
/// this read loop feeding the dispatcher. Everything a client ever
/// receives goes through the connection registry's sender.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.connections.register(&connection_id, tx).await;
    info!("Connection {} opened", connection_id);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(payload) => {
                    if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize server event: {}", e),
            }
        }
    });

    let mut limiter = RateLimiter::default();
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => dispatch(&state, &connection_id, &mut limiter, event).await,
                Err(e) => {
                    state
                        .connections
                        .send_to(
                            &connection_id,
                            ServerEvent::Error {
                                message: format!("Unrecognized event: {}", e),
                            },
                        )
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Connection {} errored: {}", connection_id, e);
                break;
            }
        }
    }

    disconnect(&state, &connection_id).await;
    writer.abort();
    info!("Connection {} closed", connection_id);
}

/// A dropped connection cancels any pending search and leaves its
/// rooms. In-flight matches stay: the state store holds the truth and
/// the player can reconnect.
async fn disconnect(state: &AppState, connection_id: &str) {
    if let Some(player_id) = state.connections.player_of(connection_id).await {
        state.matchmaking_service.cancel_search(&player_id).await;
    }
    state.rooms.leave_all(connection_id).await;
    state.connections.remove(connection_id).await;
}

pub async fn dispatch(
    state: &AppState,
    connection_id: &str,
    limiter: &mut RateLimiter,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Authenticate { player_id, token } => {
            handle_authenticate(state, connection_id, &player_id, &token).await;
        }
        ClientEvent::Search {
            game_type,
            stake,
            player_id,
        } => {
            if !check_rate(state, connection_id, limiter).await {
                return;
            }
            if require_identity(state, connection_id, &player_id)
                .await
                .is_none()
            {
                return;
            }
            handle_search(state, connection_id, game_type, stake, &player_id).await;
        }
        ClientEvent::CancelSearch => {
            if let Some(player_id) = state.connections.player_of(connection_id).await {
                state.matchmaking_service.cancel_search(&player_id).await;
            }
        }
        ClientEvent::Move {
            match_id,
            player_id,
            mv,
        } => {
            if !check_rate(state, connection_id, limiter).await {
                return;
            }
            if require_identity(state, connection_id, &player_id)
                .await
                .is_none()
            {
                return;
            }
            handle_move(state, connection_id, &match_id, &player_id, mv).await;
        }
        ClientEvent::Resign {
            match_id,
            player_id,
        } => {
            if require_identity(state, connection_id, &player_id)
                .await
                .is_none()
            {
                return;
            }
            handle_resign(state, &match_id, &player_id).await;
        }
        ClientEvent::Chat {
            match_id,
            player_id,
            message,
        } => {
            if require_identity(state, connection_id, &player_id)
                .await
                .is_none()
            {
                return;
            }
            broadcast(
                state,
                &match_id,
                ServerEvent::Chat {
                    match_id: match_id.clone(),
                    player_id,
                    message,
                },
            )
            .await;
        }
        ClientEvent::Spectate { match_id } => {
            handle_spectate(state, connection_id, &match_id).await;
        }
    }
}

async fn handle_authenticate(state: &AppState, connection_id: &str, player_id: &str, token: &str) {
    match state.token_verifier.verify(token) {
        Ok(claims) if claims.sub == player_id => {
            state.connections.bind_player(connection_id, player_id).await;
            info!("Connection {} authenticated as {}", connection_id, player_id);
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Authenticated {
                        player_id: player_id.to_string(),
                    },
                )
                .await;
        }
        Ok(_) => {
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: "Token does not belong to this player".to_string(),
                    },
                )
                .await;
        }
        Err(e) => {
            warn!("Authentication failed on connection {}: {}", connection_id, e);
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: format!("Authentication failed: {}", e),
                    },
                )
                .await;
        }
    }
}

async fn handle_search(
    state: &AppState,
    connection_id: &str,
    game_type: GameType,
    stake: f64,
    player_id: &str,
) {
    match state
        .matchmaking_service
        .find_or_create_match(game_type, stake, player_id, connection_id)
        .await
    {
        Ok(found) if found.status == MatchStatus::Found => {
            open_match(state, connection_id, found).await;
        }
        Ok(searching) => {
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Searching {
                        match_id: searching.match_id,
                    },
                )
                .await;
        }
        Err(e) => {
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: e.to_string(),
                    },
                )
                .await;
        }
    }
}

/// Seed the match state, put both players in the room and tell each who
/// they are facing. The waiting player holds the first seat.
async fn open_match(state: &AppState, connection_id: &str, found: Match) {
    let Some(player2_id) = found.player2_id.clone() else {
        error!("Found match {} has no second player", found.match_id);
        return;
    };

    let initial_state = match state
        .match_service
        .create_match_state(
            &found.match_id,
            found.game_type,
            &found.player1_id,
            &player2_id,
        )
        .await
    {
        Ok(initial_state) => initial_state,
        Err(e) => {
            error!("Failed to start match {}: {}", found.match_id, e);
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: "Failed to start match".to_string(),
                    },
                )
                .await;
            return;
        }
    };

    let player2_connection = found
        .player2_connection_id
        .clone()
        .unwrap_or_else(|| connection_id.to_string());
    state
        .rooms
        .join(&found.match_id, &found.player1_connection_id)
        .await;
    state.rooms.join(&found.match_id, &player2_connection).await;

    state
        .connections
        .send_to(
            &found.player1_connection_id,
            ServerEvent::MatchFound {
                match_id: found.match_id.clone(),
                opponent_id: player2_id.clone(),
                is_first_player: true,
                initial_state: initial_state.clone(),
            },
        )
        .await;
    state
        .connections
        .send_to(
            &player2_connection,
            ServerEvent::MatchFound {
                match_id: found.match_id.clone(),
                opponent_id: found.player1_id.clone(),
                is_first_player: false,
                initial_state,
            },
        )
        .await;
}

async fn handle_move(
    state: &AppState,
    connection_id: &str,
    match_id: &str,
    player_id: &str,
    mv: Value,
) {
    match state
        .match_service
        .apply_move(match_id, player_id, mv.clone())
        .await
    {
        Ok(outcome) => {
            // Broadcast strictly after the authoritative mutation and
            // persistence attempt.
            broadcast(
                state,
                match_id,
                ServerEvent::OpponentMove {
                    match_id: match_id.to_string(),
                    mv,
                    state: outcome.state.clone(),
                },
            )
            .await;
            broadcast(
                state,
                match_id,
                ServerEvent::StateUpdate {
                    match_id: match_id.to_string(),
                    current_turn: outcome.state.current_turn,
                    state: outcome.state.clone(),
                },
            )
            .await;

            if outcome.is_complete {
                if let Some(scores) = outcome.scores {
                    broadcast(
                        state,
                        match_id,
                        ServerEvent::Complete {
                            match_id: match_id.to_string(),
                            scores,
                        },
                    )
                    .await;
                }
                state.matchmaking_service.clear_match(match_id).await;
                state.rooms.close(match_id).await;
            }
        }
        Err(e) => {
            // One player's bad input never reaches the other player.
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::InvalidMove {
                        match_id: match_id.to_string(),
                        error: e.to_string(),
                    },
                )
                .await;
        }
    }
}

async fn handle_resign(state: &AppState, match_id: &str, player_id: &str) {
    match state.match_service.resign(match_id, player_id).await {
        Ok(outcome) => {
            broadcast(
                state,
                match_id,
                ServerEvent::Resigned {
                    match_id: match_id.to_string(),
                    resigned_player: player_id.to_string(),
                },
            )
            .await;
            if let Some(scores) = outcome.scores {
                broadcast(
                    state,
                    match_id,
                    ServerEvent::Complete {
                        match_id: match_id.to_string(),
                        scores,
                    },
                )
                .await;
            }
            state.matchmaking_service.clear_match(match_id).await;
            state.rooms.close(match_id).await;
        }
        Err(e) => {
            if let Some(connection_id) = connection_of_player(state, player_id).await {
                state
                    .connections
                    .send_to(
                        &connection_id,
                        ServerEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
            }
        }
    }
}

async fn handle_spectate(state: &AppState, connection_id: &str, match_id: &str) {
    match state.match_service.get_match_state(match_id).await {
        Ok(snapshot) => {
            state.rooms.join(match_id, connection_id).await;
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::MatchState {
                        match_id: match_id.to_string(),
                        state: snapshot,
                    },
                )
                .await;
        }
        Err(e) => {
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: e.to_string(),
                    },
                )
                .await;
        }
    }
}

async fn broadcast(state: &AppState, match_id: &str, event: ServerEvent) {
    for member in state.rooms.members(match_id).await {
        state.connections.send_to(&member, event.clone()).await;
    }
}

async fn check_rate(state: &AppState, connection_id: &str, limiter: &mut RateLimiter) -> bool {
    if limiter.allow() {
        return true;
    }
    warn!("Rate limited connection {}", connection_id);
    state
        .connections
        .send_to(
            connection_id,
            ServerEvent::RateLimited {
                message: "Too many requests, slow down".to_string(),
            },
        )
        .await;
    false
}

/// The claimed player id must match the identity the connection
/// authenticated as; everything else is rejected before touching game
/// state.
async fn require_identity(
    state: &AppState,
    connection_id: &str,
    claimed_player_id: &str,
) -> Option<String> {
    match state.connections.player_of(connection_id).await {
        Some(bound) if bound == claimed_player_id => Some(bound),
        Some(_) => {
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: "Player id does not match this connection".to_string(),
                    },
                )
                .await;
            None
        }
        None => {
            state
                .connections
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: "Not authenticated".to_string(),
                    },
                )
                .await;
            None
        }
    }
}

async fn connection_of_player(state: &AppState, player_id: &str) -> Option<String> {
    state.connections.connection_of_player(player_id).await
}
