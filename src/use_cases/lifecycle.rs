// Terminal-condition checks and end-of-match bookkeeping.

use crate::domain::combat::RoundOutcome;
use crate::domain::lobby::{Lobby, LobbyKind, Player};
use crate::domain::relics::{self, RelicSpec};
use crate::domain::tuning::GameTuning;

/// What the registry still has to do once a match ends (the relic ledger is
/// behind an async port, so the sync domain path only reports the award).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEnd {
    pub relic_award: Option<(String, RelicSpec)>,
}

/// Applies the terminal rules after a resolution. Returns `Some` exactly once
/// per lobby; `gameover` never reverts.
pub fn check_game_over(
    lobby: &mut Lobby,
    outcome: &RoundOutcome,
    tuning: &GameTuning,
) -> Option<MatchEnd> {
    if lobby.gameover {
        return None;
    }

    match lobby.kind {
        LobbyKind::Standard => {
            let live: Vec<String> = lobby.live_combatants().map(|p| p.name.clone()).collect();
            if live.len() == 1 {
                lobby.winner = live.into_iter().next();
            } else if live.is_empty() {
                // Mutual knockout: fall back to the tie-break over every seat.
                lobby.winner = tie_break(lobby.combatants());
            } else if lobby.round >= tuning.max_rounds {
                lobby.winner = tie_break(lobby.live_combatants());
            } else {
                return None;
            }
        }
        LobbyKind::Raid | LobbyKind::Gremlin => {
            let boss_alive = lobby.players.iter().any(|p| p.is_boss() && p.is_alive());
            let humans_alive = lobby.live_combatants().any(|p| p.is_human());
            if !boss_alive {
                lobby.raidwinner = outcome
                    .boss_felled_by
                    .clone()
                    .or_else(|| tie_break(lobby.live_combatants().filter(|p| p.is_human())));
            } else if !humans_alive || lobby.round >= tuning.max_rounds {
                // The boss outlasted everyone, or the raid timed out.
                lobby.winner = lobby
                    .players
                    .iter()
                    .find(|p| p.is_boss())
                    .map(|p| p.name.clone());
            } else {
                return None;
            }
        }
    }

    lobby.gameover = true;
    lobby.round_end_time = None;
    lobby.pending_deny = None;
    lobby.deny_target = None;
    lobby.replay_votes_needed = replay_votes_needed(lobby);

    let headline = match (&lobby.winner, &lobby.raidwinner) {
        (_, Some(slayer)) => format!("Game over! {slayer} struck down the boss."),
        (Some(winner), _) => format!("Game over! {winner} has won the game."),
        (None, None) => "Game over! Nobody was left standing.".to_string(),
    };
    let names: Vec<String> = lobby.players.iter().map(|p| p.name.clone()).collect();
    for name in names {
        lobby.push_message(&name, headline.clone());
    }

    let relic_award = winning_human(lobby)
        .map(|name| (name, relics::award_for(lobby.kind)));
    Some(MatchEnd { relic_award })
}

/// Replay threshold published at game over: every seated human for standard
/// lobbies, a single vote for gremlin duels, disabled for scheduled raids.
fn replay_votes_needed(lobby: &Lobby) -> u32 {
    match lobby.kind {
        LobbyKind::Standard => lobby.human_count() as u32,
        LobbyKind::Gremlin => 1,
        LobbyKind::Raid => 0,
    }
}

/// Highest hp wins, then most coins, then the earlier seat.
fn tie_break<'a>(candidates: impl Iterator<Item = &'a Player>) -> Option<String> {
    let mut best: Option<&Player> = None;
    for player in candidates {
        if best.is_none_or(|b| (player.hp, player.coins) > (b.hp, b.coins)) {
            best = Some(player);
        }
    }
    best.map(|p| p.name.clone())
}

/// Relics only ever go to human winners.
fn winning_human(lobby: &Lobby) -> Option<String> {
    let name = lobby.raidwinner.clone().or_else(|| lobby.winner.clone())?;
    lobby
        .player(&name)
        .filter(|p| p.is_human())
        .map(|p| p.name.clone())
}
