// Round clock transitions: Idle -> Collecting -> Resolving -> Collecting | Ended.
// Callers hold the per-lobby lock for everything in this module, so a round
// can never resolve twice or concurrently with a submission.

use std::time::Duration;

use crate::domain::combat;
use crate::domain::lobby::Lobby;
use crate::domain::tuning::GameTuning;
use crate::use_cases::bots;
use crate::use_cases::lifecycle::{self, MatchEnd};

/// Enters Collecting: bumps the round, arms the deadline, wipes choices and
/// lets bot/boss seats act immediately.
pub fn open_round(lobby: &mut Lobby, now_ms: u64, round_duration: Duration) {
    lobby.round += 1;
    lobby.round_end_time = Some(now_ms + round_duration.as_millis() as u64);
    lobby.clear_choices();
    bots::submit_auto_choices(lobby);
    tracing::debug!(lobby_id = %lobby.id, round = lobby.round, "round opened");
}

/// Every live seat that is allowed to act has an action in.
pub fn ready_to_resolve(lobby: &Lobby) -> bool {
    lobby.round_active() && lobby.all_choices_in()
}

/// The Collecting deadline has elapsed.
pub fn past_deadline(lobby: &Lobby, now_ms: u64) -> bool {
    lobby.round_active() && lobby.round_end_time.is_some_and(|end| now_ms >= end)
}

/// Resolves the current round and either opens the next one or ends the
/// match. Returns the end-of-match report when this resolution was terminal.
pub fn advance_round(
    lobby: &mut Lobby,
    now_ms: u64,
    round_duration: Duration,
    tuning: &GameTuning,
) -> Option<MatchEnd> {
    let resolved_round = lobby.round;
    let outcome = combat::resolve_round(lobby, tuning);
    let end = lifecycle::check_game_over(lobby, &outcome, tuning);
    if end.is_none() {
        open_round(lobby, now_ms, round_duration);
    }
    tracing::debug!(
        lobby_id = %lobby.id,
        round = resolved_round,
        gameover = lobby.gameover,
        "round resolved"
    );
    end
}

/// Drains as many rounds as are currently resolvable (a lobby where only
/// bots remain is instantly ready again after each open). Bounded by the
/// max-round cutoff. Returns the match end if one was reached.
pub fn drain_resolvable(
    lobby: &mut Lobby,
    now_ms: u64,
    round_duration: Duration,
    tuning: &GameTuning,
) -> Option<MatchEnd> {
    while ready_to_resolve(lobby) || past_deadline(lobby, now_ms) {
        if let Some(end) = advance_round(lobby, now_ms, round_duration, tuning) {
            return Some(end);
        }
    }
    None
}
