//! Telegram transport: teloxide update handling and the [`ChatGateway`](crate::gateway::ChatGateway) implementation.

pub mod gateway;
pub mod handlers;

pub use gateway::TelegramGateway;
