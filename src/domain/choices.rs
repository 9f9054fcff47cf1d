// Per-round choice vocabulary shared by the collector and the resolver.

/// Resource pick submitted alongside an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    GainHp,
    GainCoin,
    GainAttack,
}

impl Resource {
    /// Parses the wire string the client sends; `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gain_hp" => Some(Self::GainHp),
            "gain_coin" => Some(Self::GainCoin),
            "gain_attack" => Some(Self::GainAttack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GainHp => "gain_hp",
            Self::GainCoin => "gain_coin",
            Self::GainAttack => "gain_attack",
        }
    }
}

/// Action submitted for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    Defend,
    Raid,
}

impl ActionKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "attack" => Some(Self::Attack),
            "defend" => Some(Self::Defend),
            "raid" => Some(Self::Raid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defend => "defend",
            Self::Raid => "raid",
        }
    }
}

/// A player's accumulated submission for the current round.
///
/// The client patches resource and action independently, so fields merge
/// one at a time; each is last-write-wins up to the deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    pub resource: Option<Resource>,
    pub action: Option<ActionKind>,
    pub target: Option<String>,
}

impl Choice {
    /// Wipes the submission at round start.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// A seat counts as ready once it has an action for the round.
    pub fn is_ready(&self) -> bool {
        self.action.is_some()
    }
}
