//! HTTP and WebSocket routes.

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{Request, StatusCode},
    response::Response,
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};
use wordduel::GameMode;

use crate::host::{ConnectionId, HostCommand, MatchClosed, MatchHandle};
use crate::identity::TokenIssuer;
use crate::lobby::Lobby;
use crate::presence::Presence;
use crate::protocol::{ClientMessage, LobbyMessage, MatchId, PrivateMatchRequest};
use crate::registry::MatchRegistry;
use crate::{AggregatedStats, StatsService};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: MatchRegistry,
    lobby: Lobby,
    presence: Presence,
    tokens: Arc<TokenIssuer>,
    stats: StatsService,
    next_connection: Arc<AtomicU64>,
}

impl AppState {
    /// Bundles the server's collaborators.
    pub fn new(registry: MatchRegistry, presence: Presence, tokens: TokenIssuer, stats: StatsService) -> Self {
        Self {
            lobby: Lobby::new(registry.clone()),
            registry,
            presence,
            tokens: Arc::new(tokens),
            stats,
            next_connection: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_connection(&self) -> ConnectionId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }
}

/// Builds the application router with request logging.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/lobby/{mode}", get(lobby_socket))
        .route("/private/{mode}", post(create_private_match))
        .route("/match/{mode}/{match_id}", get(match_socket))
        .route("/presence", get(presence))
        .route("/stats/{player_id}", get(player_stats))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

/// Query string of a match socket.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    country: Option<String>,
}

/// Query string of a stats lookup.
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    mode: Option<GameMode>,
}

/// Body of a stats lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    #[serde(flatten)]
    totals: AggregatedStats,
    win_rate: f64,
}

#[instrument(skip(ws, state))]
async fn match_socket(
    ws: WebSocketUpgrade,
    Path((mode, match_id)): Path<(GameMode, MatchId)>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let handle = state.registry.open(mode, &match_id);
    ws.on_upgrade(move |socket| run_match_connection(socket, handle, state, params.country))
}

async fn run_match_connection(socket: WebSocket, handle: MatchHandle, state: AppState, country: Option<String>) {
    let connection = state.next_connection();
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel();

    if let Err(e) = handle.send(HostCommand::Connect {
        connection,
        country,
        outbound,
    }) {
        warn!(error = %e, "Match closed before the socket attached");
        return;
    }
    info!(connection, match_id = %handle.id(), "Match socket connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to serialize frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let tokens = Arc::clone(&state.tokens);
    let inbound = handle.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(message) => {
                        if forward(&inbound, &tokens, connection, message).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(connection, error = %e, "Dropped malformed frame"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(connection, error = %e, "Socket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    if handle.send(HostCommand::Disconnect { connection }).is_err() {
        debug!(connection, "Match already closed");
    }
    info!(connection, match_id = %handle.id(), "Match socket disconnected");
}

/// Turns a client frame into a host command.
///
/// Token verification happens here so the host never waits on it.
fn forward(
    handle: &MatchHandle,
    tokens: &TokenIssuer,
    connection: ConnectionId,
    message: ClientMessage,
) -> Result<(), MatchClosed> {
    let command = match message {
        ClientMessage::Join {
            token,
            username,
            country,
        } => match tokens.resolve(token.as_deref()) {
            Ok(identity) => HostCommand::Join {
                connection,
                identity,
                username,
                country,
            },
            Err(e) => {
                warn!(connection, error = %e, "Could not resolve identity");
                return Ok(());
            }
        },
        ClientMessage::TypeLetter { letter } => HostCommand::TypeLetter { connection, letter },
        ClientMessage::SubmitGuess => HostCommand::SubmitGuess { connection },
        ClientMessage::RequestRematch => HostCommand::RequestRematch { connection },
    };
    handle.send(command)
}

#[instrument(skip(ws, state))]
async fn lobby_socket(ws: WebSocketUpgrade, Path(mode): Path<GameMode>, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_lobby_connection(socket, mode, state))
}

async fn run_lobby_connection(socket: WebSocket, mode: GameMode, state: AppState) {
    let connection = state.next_connection();
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<LobbyMessage>();

    info!(connection, %mode, "Lobby socket connected");
    state.lobby.arrive(mode, connection, outbound);

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "Failed to serialize lobby frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            if let Message::Close(_) = frame {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    state.lobby.leave(mode, connection);
    info!(connection, %mode, "Lobby socket disconnected");
}

#[instrument(skip(state))]
async fn create_private_match(
    Path(mode): Path<GameMode>,
    State(state): State<AppState>,
    Json(request): Json<PrivateMatchRequest>,
) -> Json<LobbyMessage> {
    let handle = state.registry.create(mode, Some(request.time_to_guess));
    info!(match_id = %handle.id(), "Private match created");
    Json(LobbyMessage::Ready {
        match_id: handle.id().clone(),
        mode,
    })
}

#[instrument(skip(state))]
async fn presence(State(state): State<AppState>) -> Json<BTreeMap<GameMode, usize>> {
    Json(state.presence.snapshot())
}

#[instrument(skip(state))]
async fn player_stats(
    Path(player_id): Path<String>,
    Query(params): Query<StatsParams>,
    State(state): State<AppState>,
) -> Result<Json<PlayerStats>, StatusCode> {
    let stats = state.stats.clone();
    let lookup = tokio::task::spawn_blocking(move || stats.get_stats(&player_id, params.mode)).await;

    match lookup {
        Ok(Ok(totals)) => Ok(Json(PlayerStats {
            win_rate: totals.win_rate(),
            totals,
        })),
        Ok(Err(e)) => {
            warn!(error = %e, "Stats lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            error!(error = %e, "Stats task panicked");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
