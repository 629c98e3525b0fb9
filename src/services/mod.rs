//! Command handling, the draw and storage supervision.

/// Slash command parsing.
pub mod commands;
/// Participant directory and delivery records.
pub mod directory;
/// Scope routing and the top-level error boundary for inbound updates.
pub mod dispatch;
/// Group command handlers driving the game lifecycle.
pub mod game_service;
/// User-facing chat texts.
pub mod messages;
/// Best-effort outbound sends.
pub mod outbox;
/// Secret Santa draw and giver notification.
pub mod pairing;
/// Game store connection supervision.
pub mod storage_supervisor;

#[cfg(test)]
pub(crate) mod testing;
