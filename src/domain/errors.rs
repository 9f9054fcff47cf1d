// Domain-level errors for lobby and match workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    LobbyNotFound,
    PlayerNotFound,
    InvalidName,
    InvalidEmail,
    LobbyFull,
    NotAdmin,
    GameAlreadyStarted,
    NotEnoughPlayers,
    RoundNotActive,
    Spectator,
    PlayerDown,
    InvalidTarget,
    UnknownChoice,
    NotPendingDeny,
    ReplayNotOpen,
    RaidScheduled,
    StorageFailure,
}
