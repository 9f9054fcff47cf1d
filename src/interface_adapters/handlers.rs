// HTTP handlers: payload extraction, registry calls, error mapping. All
// failures surface as `{error}` JSON with a non-2xx status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::domain::errors::GameError;
use crate::interface_adapters::protocol::{
    AddDummyRequest, CreateLobbyRequest, ErrorResponse, JoinLobbyRequest, KickPlayerRequest,
    LobbyIdResponse, LobbyStateDto, LogInRequest, MessagesResponse, PlayerNameRequest,
    RelicsResponse, ReplayResponse, RequestReplayRequest, StartGameRequest, StartTimeResponse,
    SubmitChoiceRequest, SubmitDenyRequest,
};
use crate::interface_adapters::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type EmptyResult = Result<StatusCode, ApiError>;

pub async fn create_lobby(
    State(state): State<AppState>,
    Json(payload): Json<CreateLobbyRequest>,
) -> Result<Json<LobbyIdResponse>, ApiError> {
    let lobby_id = state
        .registry
        .create_lobby(&payload.name, &payload.email)
        .await
        .map_err(map_game_error)?;
    Ok(Json(LobbyIdResponse { lobby_id }))
}

pub async fn join_lobby(
    State(state): State<AppState>,
    Path(join_code): Path<String>,
    Json(payload): Json<JoinLobbyRequest>,
) -> EmptyResult {
    state
        .registry
        .join_lobby(&join_code, &payload.name, &payload.email)
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

pub async fn log_in(
    State(state): State<AppState>,
    Json(payload): Json<LogInRequest>,
) -> EmptyResult {
    state
        .registry
        .log_in(&payload.name, &payload.email)
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

pub async fn get_raid_lobby(
    State(state): State<AppState>,
    Json(payload): Json<PlayerNameRequest>,
) -> Result<Json<LobbyIdResponse>, ApiError> {
    let lobby_id = state
        .registry
        .get_raid_lobby(&payload.name)
        .await
        .map_err(map_game_error)?;
    Ok(Json(LobbyIdResponse { lobby_id }))
}

pub async fn get_next_raid_time(
    State(state): State<AppState>,
) -> Result<Json<StartTimeResponse>, ApiError> {
    let start_time = state.registry.next_raid_time().await;
    Ok(Json(StartTimeResponse { start_time }))
}

pub async fn get_player_relics(
    State(state): State<AppState>,
    Json(payload): Json<PlayerNameRequest>,
) -> Result<Json<RelicsResponse>, ApiError> {
    let relics = state
        .registry
        .relics_for(&payload.name)
        .await
        .map_err(map_game_error)?;
    Ok(Json(RelicsResponse {
        relics: relics.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_gremlin_lobby(
    State(state): State<AppState>,
    Json(payload): Json<PlayerNameRequest>,
) -> Result<Json<LobbyIdResponse>, ApiError> {
    let lobby_id = state
        .registry
        .create_gremlin_lobby(&payload.name)
        .await
        .map_err(map_game_error)?;
    Ok(Json(LobbyIdResponse { lobby_id }))
}

pub async fn get_state(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
) -> Result<Json<LobbyStateDto>, ApiError> {
    let lobby = state
        .registry
        .lobby_snapshot(&lobby_id)
        .await
        .map_err(map_game_error)?;
    Ok(Json(LobbyStateDto::from(&lobby)))
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(payload): Json<StartGameRequest>,
) -> EmptyResult {
    state
        .registry
        .start_game(&lobby_id, &payload.admin)
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

// The bot endpoint carries the lobby id in the body rather than the path.
pub async fn add_dummy(
    State(state): State<AppState>,
    Json(payload): Json<AddDummyRequest>,
) -> EmptyResult {
    state
        .registry
        .add_bot(&payload.lobby_id, &payload.name)
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

pub async fn kick_player(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(payload): Json<KickPlayerRequest>,
) -> EmptyResult {
    state
        .registry
        .kick_player(&lobby_id, &payload.admin, &payload.target)
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

pub async fn submit_choice(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(payload): Json<SubmitChoiceRequest>,
) -> EmptyResult {
    state
        .registry
        .submit_choice(
            &lobby_id,
            &payload.player,
            payload.resource.as_deref(),
            payload.action.as_deref(),
            payload.target.as_deref(),
        )
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

pub async fn submit_deny_target(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(payload): Json<SubmitDenyRequest>,
) -> EmptyResult {
    state
        .registry
        .submit_deny_target(&lobby_id, &payload.player, &payload.target)
        .await
        .map_err(map_game_error)?;
    Ok(StatusCode::OK)
}

pub async fn get_player_messages(
    State(state): State<AppState>,
    Path((lobby_id, player)): Path<(String, String)>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .registry
        .player_messages(&lobby_id, &player)
        .await
        .map_err(map_game_error)?;
    Ok(Json(MessagesResponse { messages }))
}

pub async fn request_replay(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(payload): Json<RequestReplayRequest>,
) -> Result<Json<ReplayResponse>, ApiError> {
    let next_lobby_id = state
        .registry
        .request_replay(&lobby_id, &payload.player)
        .await
        .map_err(map_game_error)?;
    Ok(Json(ReplayResponse { next_lobby_id }))
}

// Helper to build a JSON error response.
fn error_response(status: StatusCode, error: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// Maps domain errors to HTTP status codes and client-facing text.
fn map_game_error(err: GameError) -> ApiError {
    match err {
        GameError::LobbyNotFound => error_response(StatusCode::NOT_FOUND, "lobby not found"),
        GameError::PlayerNotFound => {
            error_response(StatusCode::NOT_FOUND, "player is not in this lobby")
        }
        GameError::InvalidName => error_response(StatusCode::BAD_REQUEST, "invalid player name"),
        GameError::InvalidEmail => error_response(StatusCode::BAD_REQUEST, "email is required"),
        GameError::LobbyFull => error_response(StatusCode::CONFLICT, "lobby is full"),
        GameError::NotAdmin => {
            error_response(StatusCode::FORBIDDEN, "only the lobby admin can do that")
        }
        GameError::GameAlreadyStarted => {
            error_response(StatusCode::CONFLICT, "the game has already started")
        }
        GameError::NotEnoughPlayers => {
            error_response(StatusCode::CONFLICT, "not enough players to start")
        }
        GameError::RoundNotActive => error_response(StatusCode::CONFLICT, "no active round"),
        GameError::Spectator => error_response(StatusCode::CONFLICT, "spectators cannot act"),
        GameError::PlayerDown => error_response(StatusCode::CONFLICT, "you are out of the fight"),
        GameError::InvalidTarget => error_response(StatusCode::BAD_REQUEST, "invalid target"),
        GameError::UnknownChoice => {
            error_response(StatusCode::BAD_REQUEST, "unknown resource or action")
        }
        GameError::NotPendingDeny => {
            error_response(StatusCode::FORBIDDEN, "you were not chosen to deny")
        }
        GameError::ReplayNotOpen => {
            error_response(StatusCode::CONFLICT, "the game is not over yet")
        }
        GameError::RaidScheduled => {
            error_response(StatusCode::CONFLICT, "raid lobbies start on schedule")
        }
        GameError::StorageFailure => error_response(StatusCode::BAD_GATEWAY, "storage error"),
    }
}
