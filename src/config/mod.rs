/// Main configuration module.
///
/// Re-exports submodules for matchmaking and session lifecycle configuration.
pub mod matchmaking;
pub mod session;
