// Relic entity and the fixed award catalog.

use serde::{Deserialize, Serialize};

use crate::domain::lobby::LobbyKind;

/// Persistent cross-match reward owned by a player account.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relic {
    pub id: String,
    pub name: String,
    pub count: u32,
}

/// Catalog entry: stable id plus display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelicSpec {
    pub id: &'static str,
    pub name: &'static str,
}

pub const VICTORS_LAUREL: RelicSpec = RelicSpec {
    id: "victors_laurel",
    name: "Victor's Laurel",
};

pub const GREMLIN_FANG: RelicSpec = RelicSpec {
    id: "gremlin_fang",
    name: "Gremlin Fang",
};

pub const RAID_TROPHY: RelicSpec = RelicSpec {
    id: "raid_trophy",
    name: "Raid Trophy",
};

/// Which relic a winning human earns in a lobby of the given kind.
pub fn award_for(kind: LobbyKind) -> RelicSpec {
    match kind {
        LobbyKind::Standard => VICTORS_LAUREL,
        LobbyKind::Gremlin => GREMLIN_FANG,
        LobbyKind::Raid => RAID_TROPHY,
    }
}
