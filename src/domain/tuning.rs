/// Gameplay tuning for turn-based combat.
///
/// Keep this separate from runtime/server configuration (ports, sweep rates, etc.).

#[derive(Debug, Clone, Copy)]
pub struct GameTuning {
    /// Starting hit points for a seated player.
    pub start_hp: i32,

    /// Hard cap for `gain_hp` regeneration.
    pub hp_cap: i32,

    /// Starting coin balance.
    pub start_coins: i32,

    /// Starting attack damage.
    pub start_attack: i32,

    /// Coins consumed by `gain_attack` for +1 attack damage.
    pub attack_cost: i32,

    /// Coins in the shared pool split evenly among raiders each round.
    pub raid_pool: i32,

    /// Hit points of the gremlin-lobby boss (the client hp bar divides by this).
    pub gremlin_hp: i32,

    /// Hit points of the scheduled raid boss.
    pub raid_boss_hp: i32,

    /// Attack damage dealt by any boss.
    pub boss_attack: i32,

    /// Seat cap per lobby, bots included.
    pub max_players: usize,

    /// Minimum seated players required to start.
    pub min_players: usize,

    /// Round count at which the match is cut off and tie-broken.
    pub max_rounds: u32,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            start_hp: 5,
            hp_cap: 10,
            start_coins: 0,
            start_attack: 1,
            attack_cost: 3,
            raid_pool: 4,
            gremlin_hp: 5,
            raid_boss_hp: 15,
            boss_attack: 2,
            max_players: 8,
            min_players: 2,
            max_rounds: 20,
        }
    }
}
