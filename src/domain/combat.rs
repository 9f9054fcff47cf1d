// Round resolution. Pure over the lobby's players and the round's deny
// target: no clock, no randomness, identical input yields identical output.

use std::collections::{HashMap, HashSet};

use crate::domain::choices::ActionKind;
use crate::domain::choices::Resource;
use crate::domain::lobby::{Inbox, Lobby, LobbyKind};
use crate::domain::tuning::GameTuning;

/// What resolution reports upward to the lifecycle checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Who earned the deny pick for the next round, if anyone.
    pub next_pending_deny: Option<String>,
    /// The attacker whose blow dropped the boss, for raid wins.
    pub boss_felled_by: Option<String>,
}

struct Swing {
    attacker: String,
    target: String,
    damage: i32,
}

fn note(inboxes: &mut HashMap<String, Inbox>, name: &str, message: String) {
    inboxes.entry(name.to_string()).or_default().push(vec![message]);
}

/// Resolves one round of submitted choices into stat deltas and private
/// messages. Ordering is fixed for reproducibility: idle defaults, resource
/// effects in seat order, defend flags, raid shares, then attacks in seat
/// order. Eligibility for an attack is decided before any blow lands, so
/// simultaneous knockouts are possible.
pub fn resolve_round(lobby: &mut Lobby, tuning: &GameTuning) -> RoundOutcome {
    let denied = lobby.deny_target.take();
    let is_denied = |name: &str| denied.as_deref() == Some(name);

    let mut inboxes: HashMap<String, Inbox> = lobby
        .players
        .iter()
        .map(|p| (p.name.clone(), Vec::new()))
        .collect();

    // Missing actions default to defending; the denied seat is left alone
    // since it was never allowed to act.
    for player in &mut lobby.players {
        if !player.is_combatant() || denied.as_deref() == Some(player.name.as_str()) {
            continue;
        }
        if player.choice.action.is_none() {
            player.choice.action = Some(ActionKind::Defend);
            player.idle_rounds += 1;
            note(
                &mut inboxes,
                &player.name,
                "You hesitated and fell back to defending.".to_string(),
            );
        } else {
            player.idle_rounds = 0;
        }
    }
    if let Some(name) = &denied {
        note(
            &mut inboxes,
            name,
            "Your turn was denied. Nothing you chose took effect.".to_string(),
        );
    }

    // Resource effects, seat order.
    for i in 0..lobby.players.len() {
        let name = lobby.players[i].name.clone();
        if !lobby.players[i].is_combatant() || is_denied(&name) {
            continue;
        }
        let Some(resource) = lobby.players[i].choice.resource else {
            continue;
        };
        let player = &mut lobby.players[i];
        match resource {
            Resource::GainHp => {
                if player.hp < tuning.hp_cap {
                    player.hp += 1;
                    note(&mut inboxes, &name, "You gained 1 HP.".to_string());
                } else {
                    note(
                        &mut inboxes,
                        &name,
                        "You are already at full health.".to_string(),
                    );
                }
            }
            Resource::GainCoin => {
                player.coins += 1;
                note(&mut inboxes, &name, "You pocketed 1 coin.".to_string());
            }
            Resource::GainAttack => {
                if player.coins >= tuning.attack_cost {
                    player.coins -= tuning.attack_cost;
                    player.attack_damage += 1;
                    note(
                        &mut inboxes,
                        &name,
                        format!(
                            "You forged {} coins into +1 attack damage.",
                            tuning.attack_cost
                        ),
                    );
                } else {
                    note(
                        &mut inboxes,
                        &name,
                        "You cannot afford more attack damage.".to_string(),
                    );
                }
            }
        }
    }

    // Defend flags apply to every blow this round.
    let defenders: HashSet<String> = lobby
        .players
        .iter()
        .filter(|p| {
            p.is_combatant() && !is_denied(&p.name) && p.choice.action == Some(ActionKind::Defend)
        })
        .map(|p| p.name.clone())
        .collect();

    // Raiders split the shared pool evenly; no direct target.
    let raiders: Vec<String> = lobby
        .players
        .iter()
        .filter(|p| {
            p.is_combatant() && !is_denied(&p.name) && p.choice.action == Some(ActionKind::Raid)
        })
        .map(|p| p.name.clone())
        .collect();
    if !raiders.is_empty() {
        let share = tuning.raid_pool / raiders.len() as i32;
        for name in &raiders {
            if share > 0 {
                if let Some(player) = lobby.player_mut(name) {
                    player.coins += share;
                }
                note(
                    &mut inboxes,
                    name,
                    format!("Your raid brought back {share} coins."),
                );
            } else {
                note(
                    &mut inboxes,
                    name,
                    "The coffers were picked clean; your raid brought back nothing.".to_string(),
                );
            }
        }
    }

    // Attacks: eligibility and damage are snapshotted before any blow lands,
    // then applied in seat order. A target that already fell only whiffs.
    let swings: Vec<Swing> = lobby
        .players
        .iter()
        .filter(|p| {
            p.is_combatant() && !is_denied(&p.name) && p.choice.action == Some(ActionKind::Attack)
        })
        .filter_map(|p| {
            p.choice.target.clone().map(|target| Swing {
                attacker: p.name.clone(),
                target,
                damage: p.attack_damage,
            })
        })
        .collect();

    let mut damage_taken: HashMap<String, i32> = HashMap::new();
    let mut boss_felled_by = None;
    for swing in swings {
        let defended = defenders.contains(&swing.target);
        let (fell, damage, target_is_boss) = {
            let Some(target) = lobby.player_mut(&swing.target) else {
                continue;
            };
            if !target.is_alive() {
                note(
                    &mut inboxes,
                    &swing.attacker,
                    format!("{} was already down when your blow landed.", swing.target),
                );
                continue;
            }
            let damage = if defended {
                (swing.damage + 1) / 2
            } else {
                swing.damage
            };
            target.hp -= damage;
            let fell = target.hp <= 0;
            if fell {
                target.hp = 0;
            }
            (fell, damage, target.is_boss())
        };

        *damage_taken.entry(swing.target.clone()).or_insert(0) += damage;
        note(
            &mut inboxes,
            &swing.attacker,
            format!("You hit {} for {} damage.", swing.target, damage),
        );
        note(
            &mut inboxes,
            &swing.target,
            format!("{} hit you for {} damage.", swing.attacker, damage),
        );
        if defended {
            note(
                &mut inboxes,
                &swing.target,
                "Your guard softened the blow.".to_string(),
            );
        }
        if fell {
            note(&mut inboxes, &swing.target, "You have fallen.".to_string());
            note(
                &mut inboxes,
                &swing.attacker,
                format!("You struck down {}!", swing.target),
            );
            if target_is_boss {
                boss_felled_by = Some(swing.attacker.clone());
            }
        }
    }

    // The human who survived the most punishment earns the deny pick.
    // Standard lobbies only; a boss duel would deny the same seat forever.
    let next_pending_deny = if lobby.kind == LobbyKind::Standard
        && lobby.live_combatants().count() >= 2
    {
        let mut best: Option<(String, i32)> = None;
        for player in lobby.players.iter().filter(|p| p.is_human() && p.is_combatant()) {
            let taken = damage_taken.get(&player.name).copied().unwrap_or(0);
            if taken > 0 && best.as_ref().is_none_or(|(_, b)| taken > *b) {
                best = Some((player.name.clone(), taken));
            }
        }
        best.map(|(name, _)| name)
    } else {
        None
    };
    if let Some(name) = &next_pending_deny {
        note(
            &mut inboxes,
            name,
            "You weathered the worst of it. Choose someone to deny next round.".to_string(),
        );
    }

    lobby.inboxes = inboxes;
    lobby.pending_deny = next_pending_deny.clone();

    RoundOutcome {
        next_pending_deny,
        boss_felled_by,
    }
}
