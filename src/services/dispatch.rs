//! Entry point for inbound updates: routes commands by chat scope and reports failures.

use std::{any::Any, panic::AssertUnwindSafe};

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::{
    error::{Rejection, ServiceError},
    gateway::{InlineAction, PrivateDelivery},
    services::{
        commands::{self, Command},
        game_service::{self, JoinSource},
        messages, outbox,
    },
    state::{
        SharedState,
        game::{ChatKind, Sender},
    },
};

/// Text message received in any chat.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Chat the message was posted in.
    pub chat_id: i64,
    /// Kind of that chat.
    pub chat_kind: ChatKind,
    /// Author.
    pub sender: Sender,
    /// Raw message text.
    pub text: String,
}

/// Inline button press.
#[derive(Debug, Clone)]
pub struct InboundCallback {
    /// Chat holding the button.
    pub chat_id: i64,
    /// Kind of that chat.
    pub chat_kind: ChatKind,
    /// Message carrying the pressed button, when the platform still knows it.
    pub message_id: Option<i32>,
    /// Person who pressed the button.
    pub sender: Sender,
    /// Callback payload.
    pub data: String,
}

/// Handle a message. Failures, panics included, are reported to the chat and never propagate.
pub async fn handle_message(state: &SharedState, message: InboundMessage) {
    let (chat_kind, chat_id) = (message.chat_kind, message.chat_id);
    let outcome = AssertUnwindSafe(route_message(state, message))
        .catch_unwind()
        .await;
    conclude(state, chat_kind, chat_id, outcome).await;
}

/// Handle an inline button press. Unknown payloads are ignored.
pub async fn handle_callback(state: &SharedState, callback: InboundCallback) {
    let (chat_kind, chat_id) = (callback.chat_kind, callback.chat_id);
    let outcome = AssertUnwindSafe(route_callback(state, callback))
        .catch_unwind()
        .await;
    conclude(state, chat_kind, chat_id, outcome).await;
}

async fn route_message(state: &SharedState, message: InboundMessage) -> Result<(), ServiceError> {
    let Some(command) = commands::parse(&message.text, state.bot_username()) else {
        return Ok(());
    };
    debug!(chat_id = message.chat_id, ?command, "command received");

    match message.chat_kind {
        ChatKind::Private => private_command(state, &message, command).await,
        ChatKind::Group | ChatKind::Supergroup => group_command(state, &message, command).await,
        ChatKind::Other => Err(Rejection::UnsupportedChat.into()),
    }
}

async fn route_callback(state: &SharedState, callback: InboundCallback) -> Result<(), ServiceError> {
    let Some(action) = InlineAction::from_callback_data(&callback.data) else {
        debug!(chat_id = callback.chat_id, data = %callback.data, "ignoring unknown callback");
        return Ok(());
    };

    match (action, callback.chat_kind) {
        (InlineAction::JoinGame, ChatKind::Group | ChatKind::Supergroup) => {
            let source = JoinSource::Button {
                message_id: callback.message_id,
            };
            game_service::join(state, callback.chat_id, &callback.sender, source)
                .await
                .map(drop)
        }
        (InlineAction::JoinGame, ChatKind::Private) => Err(Rejection::GroupOnly.into()),
        (InlineAction::JoinGame, ChatKind::Other) => Err(Rejection::UnsupportedChat.into()),
    }
}

async fn conclude(
    state: &SharedState,
    chat_kind: ChatKind,
    chat_id: i64,
    outcome: Result<Result<(), ServiceError>, Box<dyn Any + Send>>,
) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => report(state, chat_kind, chat_id, &err).await,
        Err(panic) => {
            error!(chat_id, panic = panic_message(panic.as_ref()), "update handler panicked");
            reply(state, chat_kind, chat_id, messages::apology()).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Private chats only get static answers and never touch games.
async fn private_command(
    state: &SharedState,
    message: &InboundMessage,
    command: Command,
) -> Result<(), ServiceError> {
    let text = match command {
        Command::Start { .. } => messages::private_greeting(&message.sender.full_name),
        Command::Info => messages::private_info(),
        Command::Join | Command::Stop | Command::Reset => return Err(Rejection::GroupOnly.into()),
        Command::Unknown(_) => messages::private_unknown(),
    };
    reply(state, ChatKind::Private, message.chat_id, text).await;
    Ok(())
}

async fn group_command(
    state: &SharedState,
    message: &InboundMessage,
    command: Command,
) -> Result<(), ServiceError> {
    let chat_id = message.chat_id;
    let sender = &message.sender;
    match command {
        Command::Start { args } => {
            game_service::start(state, chat_id, message.chat_kind, sender, &args).await
        }
        Command::Join => game_service::join(state, chat_id, sender, JoinSource::Command)
            .await
            .map(drop),
        Command::Stop => game_service::stop(state, chat_id, sender).await.map(drop),
        Command::Reset => game_service::reset(state, chat_id, sender).await,
        Command::Info => game_service::info(state, chat_id).await,
        Command::Unknown(_) => {
            reply(state, message.chat_kind, chat_id, messages::group_unknown()).await;
            Ok(())
        }
    }
}

/// Turn a failed command into a chat reply. Rejections are expected; storage failures are logged.
async fn report(state: &SharedState, chat_kind: ChatKind, chat_id: i64, err: &ServiceError) {
    let text = match err {
        ServiceError::Rejected(rejection) => {
            info!(chat_id, %rejection, "command rejected");
            messages::rejection(rejection)
        }
        ServiceError::Degraded | ServiceError::Unavailable(_) => {
            error!(chat_id, error = %err, "game store unavailable while handling update");
            messages::storage_unavailable()
        }
    };
    reply(state, chat_kind, chat_id, text).await;
}

async fn reply(state: &SharedState, chat_kind: ChatKind, chat_id: i64, text: String) {
    if chat_kind != ChatKind::Private {
        outbox::send_group(state, chat_id, text, None).await;
        return;
    }
    match outbox::send_private(state, chat_id, text).await {
        PrivateDelivery::Delivered => {}
        PrivateDelivery::Blocked => debug!(chat_id, "private reply refused"),
        PrivateDelivery::Failed(reason) => warn!(chat_id, %reason, "private reply failed"),
    }
}
