// Use-case layer: lobby orchestration, the round clock and match lifecycle.

pub mod bots;
pub mod lifecycle;
pub mod raid;
pub mod registry;
pub mod rounds;

#[cfg(test)]
pub(crate) mod test_support;

pub use raid::FixedIntervalSchedule;
pub use registry::{LobbyRegistry, RegistrySettings};
