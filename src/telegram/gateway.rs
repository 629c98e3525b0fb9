//! Telegram Bot API implementation of the chat gateway.

use std::collections::HashSet;

use futures::future::BoxFuture;
use teloxide::{
    ApiError, RequestError,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId},
};

use crate::gateway::{ChatGateway, GatewayError, GatewayResult, InlineAction, PrivateDelivery};

/// [`ChatGateway`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
    join_label: String,
}

impl TelegramGateway {
    /// Gateway labelling the join button with `join_label`.
    pub fn new(bot: Bot, join_label: impl Into<String>) -> Self {
        Self {
            bot,
            join_label: join_label.into(),
        }
    }

    fn keyboard(&self, action: InlineAction) -> InlineKeyboardMarkup {
        let label = match action {
            InlineAction::JoinGame => self.join_label.clone(),
        };
        InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            label,
            action.callback_data(),
        )]])
    }
}

impl ChatGateway for TelegramGateway {
    fn send_group_message(
        &self,
        chat_id: i64,
        text: String,
        action: Option<InlineAction>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(action) = action {
            request = request.reply_markup(self.keyboard(action));
        }
        Box::pin(async move { request.await.map(drop).map_err(request_error) })
    }

    fn send_private_message(
        &self,
        person_id: i64,
        text: String,
    ) -> BoxFuture<'static, PrivateDelivery> {
        let request = self.bot.send_message(ChatId(person_id), text);
        Box::pin(async move {
            match request.await {
                Ok(_) => PrivateDelivery::Delivered,
                Err(err) => classify_private_error(&err),
            }
        })
    }

    fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: String,
        action: Option<InlineAction>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        if let Some(action) = action {
            request = request.reply_markup(self.keyboard(action));
        }
        Box::pin(async move { request.await.map(drop).map_err(request_error) })
    }

    fn list_admins(&self, chat_id: i64) -> BoxFuture<'static, GatewayResult<HashSet<i64>>> {
        let request = self.bot.get_chat_administrators(ChatId(chat_id));
        Box::pin(async move {
            let members = request.await.map_err(request_error)?;
            Ok(members
                .into_iter()
                .filter_map(|member| i64::try_from(member.user.id.0).ok())
                .collect())
        })
    }
}

fn request_error(err: RequestError) -> GatewayError {
    GatewayError::Request(err.to_string())
}

/// Errors meaning the person never opened a private chat with the bot, or closed it for good.
fn classify_private_error(err: &RequestError) -> PrivateDelivery {
    match err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::CantInitiateConversation
            | ApiError::CantTalkWithBots
            | ApiError::UserDeactivated
            | ApiError::ChatNotFound,
        ) => PrivateDelivery::Blocked,
        RequestError::Api(ApiError::Unknown(description)) if description.contains("Forbidden") => {
            PrivateDelivery::Blocked
        }
        other => PrivateDelivery::Failed(other.to_string()),
    }
}
