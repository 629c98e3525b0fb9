//! Entities as the game stores persist them.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Persisted lifecycle state of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStateEntity {
    /// Registration is open and participants can join.
    Registration,
    /// Pairs were distributed; the participant set has been cleared.
    Completed,
}

/// Persisted kind of the chat that owns a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatKindEntity {
    /// One-to-one chat with the bot.
    Private,
    /// Basic group.
    Group,
    /// Supergroup.
    Supergroup,
    /// Channel or unknown kind.
    Other,
}

/// Game row, one per chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Chat identifier, also the primary key of the game.
    pub chat_id: i64,
    /// Kind of chat the game was registered in.
    pub chat_kind: ChatKindEntity,
    /// Current lifecycle state.
    pub state: GameStateEntity,
    /// Currency code of the gift amount (e.g. "USD").
    pub currency: String,
    /// Canonical decimal representation of the gift amount.
    pub amount: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the game row was updated.
    pub updated_at: SystemTime,
}

/// Participant row owned by a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Chat identifier of the owning game.
    pub game_id: i64,
    /// Telegram identifier of the person.
    pub telegram_id: i64,
    /// Display handle: `@username`, else the full name. `None` when the person has neither.
    pub handle: Option<String>,
    /// Moment the person joined; participant listings follow this order.
    pub joined_at: SystemTime,
}

/// Proof that the bot once delivered a private message to a person.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryRecordEntity {
    /// Telegram identifier of the person.
    pub telegram_id: i64,
    /// First successful private delivery.
    pub sent_at: SystemTime,
}

/// Outcome of inserting a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The person was added to the participant set.
    Added,
    /// The person already belonged to the participant set; nothing changed.
    AlreadyJoined,
}
