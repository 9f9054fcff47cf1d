use axum::{
    routing::{get, post},
    Router,
};

use crate::interface_adapters::handlers::{
    add_dummy, create_gremlin_lobby, create_lobby, get_next_raid_time, get_player_messages,
    get_player_relics, get_raid_lobby, get_state, join_lobby, kick_player, log_in, request_replay,
    start_game, submit_choice, submit_deny_target,
};
use crate::interface_adapters::state::AppState;

// Build the HTTP router for the public game API.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/create_lobby", post(create_lobby))
        .route("/join_lobby/{join_code}", post(join_lobby))
        .route("/log_in", post(log_in))
        .route("/get_raid_lobby", post(get_raid_lobby))
        .route("/get_next_raid_time", get(get_next_raid_time))
        .route("/get_player_relics", post(get_player_relics))
        .route("/create_gremlin_lobby", post(create_gremlin_lobby))
        .route("/get_state/{lobby_id}", get(get_state))
        .route("/start_game/{lobby_id}", post(start_game))
        .route("/add_dummy", post(add_dummy))
        .route("/kick_player/{lobby_id}", post(kick_player))
        .route("/submit_choice/{lobby_id}", post(submit_choice))
        .route("/submit_deny_target/{lobby_id}", post(submit_deny_target))
        .route(
            "/get_player_messages/{lobby_id}/{player}",
            get(get_player_messages),
        )
        .route("/request_replay/{lobby_id}", post(request_replay))
        .with_state(state)
}
