// Wire DTOs for the public game API. Field names here are the contract the
// polling client was built against and must not drift.

use serde::{Deserialize, Serialize};

use crate::domain::lobby::{Lobby, Player};
use crate::domain::relics::Relic;

// ---- Requests -------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateLobbyRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinLobbyRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LogInRequest {
    pub name: String,
    pub email: String,
}

// `/get_raid_lobby`, `/get_player_relics` and `/create_gremlin_lobby` all
// carry just the player name.
#[derive(Debug, Deserialize)]
pub struct PlayerNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StartGameRequest {
    pub admin: String,
}

#[derive(Debug, Deserialize)]
pub struct AddDummyRequest {
    pub name: String,
    pub lobby_id: String,
}

#[derive(Debug, Deserialize)]
pub struct KickPlayerRequest {
    pub admin: String,
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitChoiceRequest {
    pub player: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDenyRequest {
    pub player: String,
    pub target: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestReplayRequest {
    pub player: String,
}

// ---- Responses ------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct LobbyIdResponse {
    pub lobby_id: String,
}

#[derive(Debug, Serialize)]
pub struct StartTimeResponse {
    pub start_time: u64,
}

#[derive(Debug, Serialize)]
pub struct RelicsResponse {
    pub relics: Vec<RelicDto>,
}

#[derive(Debug, Serialize)]
pub struct RelicDto {
    pub id: String,
    pub name: String,
    pub count: u32,
}

impl From<Relic> for RelicDto {
    fn from(relic: Relic) -> Self {
        Self {
            id: relic.id,
            name: relic.name,
            count: relic.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_lobby_id: Option<String>,
}

// Human-readable error string for consistent JSON error responses; the
// client alerts this text verbatim.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shared lobby snapshot polled by every client every couple of seconds.
#[derive(Debug, Serialize)]
pub struct LobbyStateDto {
    pub round: u32,
    pub players: Vec<PlayerDto>,
    pub winner: Option<String>,
    pub raidwinner: Option<String>,
    pub pending_deny: Option<String>,
    pub deny_target: Option<String>,
    #[serde(rename = "readyPlayers")]
    pub ready_players: Vec<String>,
    /// RFC3339; the client feeds it straight into `new Date(...)`.
    pub round_end_time: Option<String>,
    /// Epoch milliseconds.
    pub start_time: u64,
    pub boss_fight: bool,
    pub gameover: bool,
    pub replay_votes_count: u32,
    pub replay_votes_needed: u32,
    pub next_lobby_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayerDto {
    pub name: String,
    pub admin: bool,
    pub hp: i32,
    pub coins: i32,
    #[serde(rename = "attackDamage")]
    pub attack_damage: i32,
    pub alive: bool,
    /// Always empty in the shared snapshot; real messages are private and go
    /// through `/get_player_messages`.
    pub messages: Vec<Vec<String>>,
    pub idle_rounds: u32,
    pub spectator: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub boss: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "submittedResource", skip_serializing_if = "Option::is_none")]
    pub submitted_resource: Option<String>,
    #[serde(rename = "submittedAction", skip_serializing_if = "Option::is_none")]
    pub submitted_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            admin: player.admin,
            hp: player.hp,
            coins: player.coins,
            attack_damage: player.attack_damage,
            alive: player.is_alive(),
            messages: Vec::new(),
            idle_rounds: player.idle_rounds,
            spectator: player.spectator,
            boss: player.is_boss(),
            title: player.title.clone(),
            submitted_resource: player.choice.resource.map(|r| r.as_str().to_string()),
            submitted_action: player.choice.action.map(|a| a.as_str().to_string()),
            target: player.choice.target.clone(),
        }
    }
}

impl From<&Lobby> for LobbyStateDto {
    fn from(lobby: &Lobby) -> Self {
        Self {
            round: lobby.round,
            players: lobby.players.iter().map(PlayerDto::from).collect(),
            winner: lobby.winner.clone(),
            raidwinner: lobby.raidwinner.clone(),
            pending_deny: lobby.pending_deny.clone(),
            deny_target: lobby.deny_target.clone(),
            ready_players: lobby.ready_players(),
            round_end_time: lobby.round_end_time.and_then(rfc3339),
            start_time: lobby.start_time,
            boss_fight: lobby.boss_fight(),
            gameover: lobby.gameover,
            replay_votes_count: lobby.replay_votes.len() as u32,
            replay_votes_needed: lobby.replay_votes_needed,
            next_lobby_id: lobby.next_lobby_id.clone(),
        }
    }
}

fn rfc3339(epoch_ms: u64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(epoch_ms as i64).map(|dt| dt.to_rfc3339())
}
