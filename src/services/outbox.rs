//! Best-effort outbound sends shared by the command handlers.

use tokio::time::timeout;
use tracing::warn;

use crate::{
    gateway::{GatewayError, InlineAction, PrivateDelivery},
    state::SharedState,
};

/// Post to a group chat. A failed post is logged and otherwise ignored.
pub async fn send_group(
    state: &SharedState,
    chat_id: i64,
    text: String,
    action: Option<InlineAction>,
) {
    let send = state.gateway().send_group_message(chat_id, text, action);
    let result = match timeout(state.config().send_timeout, send).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout),
    };
    if let Err(err) = result {
        warn!(chat_id, error = %err, "failed to post group message");
    }
}

/// Send a direct message within the configured timeout. A timeout counts as a failed delivery.
pub async fn send_private(state: &SharedState, person_id: i64, text: String) -> PrivateDelivery {
    let send = state.gateway().send_private_message(person_id, text);
    match timeout(state.config().send_timeout, send).await {
        Ok(outcome) => outcome,
        Err(_) => PrivateDelivery::Failed(GatewayError::Timeout.to_string()),
    }
}
