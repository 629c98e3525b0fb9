//! Update handling tree and command menus.

use teloxide::{
    RequestError,
    dispatching::UpdateHandler,
    prelude::*,
    types::{BotCommand, BotCommandScope, Chat, User},
};
use tracing::warn;

use crate::{
    services::dispatch::{self, InboundCallback, InboundMessage},
    state::{
        SharedState,
        game::{ChatKind, Sender},
    },
};

/// Update tree: text messages and inline button presses.
pub fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

/// Publish the command menus shown by Telegram clients in groups and private chats.
pub async fn register_commands(bot: &Bot) -> Result<(), RequestError> {
    let group = vec![
        BotCommand::new("start", "Open registration: /start <currency> <amount>"),
        BotCommand::new("join", "Join the registration"),
        BotCommand::new("info", "List participants"),
        BotCommand::new("stop", "Close registration and draw pairs"),
        BotCommand::new("reset", "Delete the game"),
    ];
    let private = vec![
        BotCommand::new("start", "Say hello"),
        BotCommand::new("info", "What this bot does"),
    ];

    bot.set_my_commands(group)
        .scope(BotCommandScope::AllGroupChats)
        .await?;
    bot.set_my_commands(private)
        .scope(BotCommandScope::AllPrivateChats)
        .await?;
    Ok(())
}

async fn on_message(msg: Message, state: SharedState) -> ResponseResult<()> {
    let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };
    let inbound = InboundMessage {
        chat_id: msg.chat.id.0,
        chat_kind: chat_kind(&msg.chat),
        sender: sender(user),
        text: text.to_owned(),
    };
    dispatch::handle_message(&state, inbound).await;
    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, state: SharedState) -> ResponseResult<()> {
    if let Err(err) = bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %err, "failed to answer callback query");
    }

    let (Some(data), Some(message)) = (query.data.as_ref(), query.message.as_ref()) else {
        return Ok(());
    };
    let inbound = InboundCallback {
        chat_id: message.chat().id.0,
        chat_kind: chat_kind(message.chat()),
        message_id: Some(message.id().0),
        sender: sender(&query.from),
        data: data.clone(),
    };
    dispatch::handle_callback(&state, inbound).await;
    Ok(())
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_group() {
        ChatKind::Group
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else {
        ChatKind::Other
    }
}

fn sender(user: &User) -> Sender {
    Sender {
        // Telegram user ids fit in 52 bits.
        id: user.id.0 as i64,
        username: user.username.clone(),
        full_name: user.full_name(),
    }
}
