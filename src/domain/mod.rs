// Domain layer: match state, combat rules, and ports.

pub mod choices;
pub mod combat;
pub mod errors;
pub mod lobby;
pub mod ports;
pub mod relics;
pub mod tuning;

pub use choices::{ActionKind, Choice, Resource};
pub use errors::GameError;
pub use lobby::{Controller, Inbox, Lobby, LobbyKind, Player};
pub use relics::Relic;
pub use tuning::GameTuning;
