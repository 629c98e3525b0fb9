//! Outbound messaging seam between the game services and the chat platform.

use std::collections::HashSet;

use futures::future::BoxFuture;
use thiserror::Error;

/// Callback payload attached to the inline "join" button.
pub const JOIN_GAME_CALLBACK: &str = "join_game";

/// Inline control rendered below a group message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineAction {
    /// Button that joins the current registration.
    JoinGame,
}

impl InlineAction {
    /// Callback payload identifying the action.
    pub fn callback_data(self) -> &'static str {
        match self {
            InlineAction::JoinGame => JOIN_GAME_CALLBACK,
        }
    }

    /// Resolve a callback payload back into an action.
    pub fn from_callback_data(data: &str) -> Option<Self> {
        (data == JOIN_GAME_CALLBACK).then_some(InlineAction::JoinGame)
    }
}

/// Outcome of a private message attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateDelivery {
    /// The message reached the person.
    Delivered,
    /// The person never opened a private chat with the bot, or blocked it.
    Blocked,
    /// Any other transport failure, including timeouts.
    Failed(String),
}

impl PrivateDelivery {
    /// Whether the message reached the person.
    pub fn is_delivered(&self) -> bool {
        matches!(self, PrivateDelivery::Delivered)
    }
}

/// Transport failure reported by a [`ChatGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The platform answered with an error.
    #[error("chat platform request failed: {0}")]
    Request(String),
    /// No answer within the configured timeout.
    #[error("chat platform request timed out")]
    Timeout,
}

/// Result alias for gateway requests.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Messaging operations the game services need from the chat platform.
pub trait ChatGateway: Send + Sync {
    /// Post to a group, optionally with an inline control.
    fn send_group_message(
        &self,
        chat_id: i64,
        text: String,
        action: Option<InlineAction>,
    ) -> BoxFuture<'static, GatewayResult<()>>;

    /// Send a direct message; never fails, the outcome is classified instead.
    fn send_private_message(&self, person_id: i64, text: String)
    -> BoxFuture<'static, PrivateDelivery>;

    /// Replace the text (and inline control) of a message previously sent by the bot.
    fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: String,
        action: Option<InlineAction>,
    ) -> BoxFuture<'static, GatewayResult<()>>;

    /// Ids of the chat's administrators.
    fn list_admins(&self, chat_id: i64) -> BoxFuture<'static, GatewayResult<HashSet<i64>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_round_trips_join_action() {
        let data = InlineAction::JoinGame.callback_data();
        assert_eq!(data, "join_game");
        assert_eq!(
            InlineAction::from_callback_data(data),
            Some(InlineAction::JoinGame)
        );
        assert_eq!(InlineAction::from_callback_data("leave_game"), None);
    }
}
