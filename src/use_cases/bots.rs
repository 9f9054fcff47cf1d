// Auto-play for bot and boss seats. Randomness lives here, at round open,
// never inside resolution.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::choices::{ActionKind, Choice, Resource};
use crate::domain::lobby::{Controller, Lobby};

const BOT_NAMES: [&str; 8] = [
    "Snaggletooth",
    "Mudwort",
    "Grubbins",
    "Pocketfiend",
    "Krivvens",
    "Bogmaw",
    "Sooty",
    "Nibblick",
];

/// Picks a bot name not already seated in the lobby.
pub fn bot_name(lobby: &Lobby) -> String {
    let mut rng = rand::thread_rng();
    let mut pool: Vec<&str> = BOT_NAMES
        .iter()
        .copied()
        .filter(|name| lobby.player(name).is_none())
        .collect();
    pool.shuffle(&mut rng);
    match pool.first() {
        Some(name) => (*name).to_string(),
        None => format!("Gremlin-{}", lobby.players.len() + 1),
    }
}

/// Submits a valid pseudo-random choice for every bot and boss seat, so
/// rounds never wait on them.
pub fn submit_auto_choices(lobby: &mut Lobby) {
    let mut rng = rand::thread_rng();

    let live_names: Vec<String> = lobby
        .live_combatants()
        .map(|p| p.name.clone())
        .collect();
    let live_humans: Vec<String> = lobby
        .live_combatants()
        .filter(|p| p.is_human())
        .map(|p| p.name.clone())
        .collect();

    for player in &mut lobby.players {
        if !player.is_alive() || player.spectator {
            continue;
        }
        match player.controller {
            Controller::Human => continue,
            Controller::Boss => {
                // Bosses only ever swing at humans.
                player.choice = match live_humans.choose(&mut rng) {
                    Some(target) => Choice {
                        resource: None,
                        action: Some(ActionKind::Attack),
                        target: Some(target.clone()),
                    },
                    None => Choice {
                        resource: None,
                        action: Some(ActionKind::Defend),
                        target: None,
                    },
                };
            }
            Controller::Bot => {
                let resource = match rng.gen_range(0..3) {
                    0 => Resource::GainHp,
                    1 => Resource::GainCoin,
                    _ => Resource::GainAttack,
                };
                let targets: Vec<&String> = live_names
                    .iter()
                    .filter(|name| **name != player.name)
                    .collect();
                let action = match rng.gen_range(0..3) {
                    0 if !targets.is_empty() => {
                        let target = targets[rng.gen_range(0..targets.len())].clone();
                        player.choice.target = Some(target);
                        ActionKind::Attack
                    }
                    1 => ActionKind::Raid,
                    _ => ActionKind::Defend,
                };
                player.choice.resource = Some(resource);
                player.choice.action = Some(action);
                if action != ActionKind::Attack {
                    player.choice.target = None;
                }
            }
        }
    }
}
