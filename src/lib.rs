//! Library crate for the Secret Santa bot, exposing modules for the binary and tests.

/// Runtime configuration.
pub mod config;
/// Persistence layer.
pub mod dao;
/// Service errors.
pub mod error;
/// Chat platform seam.
pub mod gateway;
/// Command handling and the draw.
pub mod services;
/// Shared state and game lifecycle.
pub mod state;
/// Telegram transport.
pub mod telegram;
