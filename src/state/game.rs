//! Domain types of a chat's Secret Santa game.

use std::{fmt, time::SystemTime};

use crate::dao::models::{
    ChatKindEntity, GameEntity, GameStateEntity, ParticipantEntity,
};
use crate::state::state_machine::GamePhase;

/// Kind of chat an update originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with the bot.
    Private,
    /// Basic group.
    Group,
    /// Supergroup.
    Supergroup,
    /// Channels and anything else the bot does not serve.
    Other,
}

impl ChatKind {
    /// Whether games can be registered in this kind of chat.
    pub fn is_group(self) -> bool {
        match self {
            ChatKind::Group | ChatKind::Supergroup => true,
            ChatKind::Private | ChatKind::Other => false,
        }
    }
}

/// Person behind an inbound command or button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Telegram identifier of the person.
    pub id: i64,
    /// Public username, without the leading `@`.
    pub username: Option<String>,
    /// First and last name joined by a space.
    pub full_name: String,
}

impl Sender {
    /// Human-facing handle stored with a participant: `@username`, else the full name.
    pub fn display_handle(&self) -> Option<String> {
        match &self.username {
            Some(username) if !username.is_empty() => Some(format!("@{username}")),
            _ => {
                let name = self.full_name.trim();
                (!name.is_empty()).then(|| name.to_owned())
            }
        }
    }
}

/// Gift currency code, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency(String);

impl Currency {
    /// Validate a currency token: non-empty, at most `max_len` characters, letters or symbols only.
    pub fn parse(raw: &str, max_len: usize) -> Option<Self> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > max_len {
            return None;
        }
        if trimmed
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || c.is_ascii_digit())
        {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    /// Canonical upper-case code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strictly positive gift amount kept in canonical decimal form (`20`, `12.5`).
///
/// Both `.` and `,` are accepted as decimal separator. Leading zeros of the integer part and
/// trailing zeros of the fractional part are dropped, so `020.50` and `20,5` compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount(String);

impl Amount {
    /// Parse and canonicalize; `None` for zero, negative or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().replace(',', ".");
        let (integer, fraction) = match normalized.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (normalized.as_str(), ""),
        };

        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        if normalized.ends_with('.') {
            return None;
        }
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !all_digits(integer) || !all_digits(fraction) {
            return None;
        }

        let integer = integer.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        let integer = if integer.is_empty() { "0" } else { integer };
        let canonical = if fraction.is_empty() {
            integer.to_owned()
        } else {
            format!("{integer}.{fraction}")
        };
        Some(Self(canonical))
    }

    /// Canonical decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Person registered in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Telegram user id.
    pub telegram_id: i64,
    /// Display handle captured when the person joined.
    pub handle: Option<String>,
    /// Join time; lists follow this order.
    pub joined_at: SystemTime,
}

impl Participant {
    /// Text used to name the participant in chat messages.
    pub fn mention(&self) -> String {
        self.handle
            .clone()
            .unwrap_or_else(|| format!("participant #{}", self.telegram_id))
    }
}

/// Secret Santa game registered in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// Chat the game belongs to.
    pub chat_id: i64,
    /// Kind of that chat.
    pub chat_kind: ChatKind,
    /// Current lifecycle phase.
    pub phase: GamePhase,
    /// Gift currency.
    pub currency: Currency,
    /// Gift amount.
    pub amount: Amount,
    /// Registration time.
    pub created_at: SystemTime,
    /// Last change of terms or phase.
    pub updated_at: SystemTime,
}

impl Game {
    /// Fresh game entering registration.
    pub fn new(chat_id: i64, chat_kind: ChatKind, currency: Currency, amount: Amount) -> Self {
        let now = SystemTime::now();
        Self {
            chat_id,
            chat_kind,
            phase: GamePhase::Registration,
            currency,
            amount,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the gift terms. Returns `true` when anything changed.
    pub fn set_terms(&mut self, currency: Currency, amount: Amount) -> bool {
        if self.currency == currency && self.amount == amount {
            return false;
        }
        self.currency = currency;
        self.amount = amount;
        self.updated_at = SystemTime::now();
        true
    }

    /// Move to `phase` and touch `updated_at`.
    pub fn set_phase(&mut self, phase: GamePhase) {
        self.phase = phase;
        self.updated_at = SystemTime::now();
    }
}

impl From<ChatKindEntity> for ChatKind {
    fn from(value: ChatKindEntity) -> Self {
        match value {
            ChatKindEntity::Private => ChatKind::Private,
            ChatKindEntity::Group => ChatKind::Group,
            ChatKindEntity::Supergroup => ChatKind::Supergroup,
            ChatKindEntity::Other => ChatKind::Other,
        }
    }
}

impl From<ChatKind> for ChatKindEntity {
    fn from(value: ChatKind) -> Self {
        match value {
            ChatKind::Private => ChatKindEntity::Private,
            ChatKind::Group => ChatKindEntity::Group,
            ChatKind::Supergroup => ChatKindEntity::Supergroup,
            ChatKind::Other => ChatKindEntity::Other,
        }
    }
}

impl From<GameStateEntity> for GamePhase {
    fn from(value: GameStateEntity) -> Self {
        match value {
            GameStateEntity::Registration => GamePhase::Registration,
            GameStateEntity::Completed => GamePhase::Completed,
        }
    }
}

impl From<GamePhase> for GameStateEntity {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Registration => GameStateEntity::Registration,
            GamePhase::Completed => GameStateEntity::Completed,
        }
    }
}

impl TryFrom<GameEntity> for Game {
    type Error = String;

    fn try_from(value: GameEntity) -> Result<Self, Self::Error> {
        let currency = Currency::parse(&value.currency, usize::MAX)
            .ok_or_else(|| format!("invalid currency `{}`", value.currency))?;
        let amount = Amount::parse(&value.amount)
            .ok_or_else(|| format!("invalid amount `{}`", value.amount))?;

        Ok(Self {
            chat_id: value.chat_id,
            chat_kind: value.chat_kind.into(),
            phase: value.state.into(),
            currency,
            amount,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

impl From<Game> for GameEntity {
    fn from(value: Game) -> Self {
        Self {
            chat_id: value.chat_id,
            chat_kind: value.chat_kind.into(),
            state: value.phase.into(),
            currency: value.currency.as_str().to_owned(),
            amount: value.amount.as_str().to_owned(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            telegram_id: value.telegram_id,
            handle: value.handle,
            joined_at: value.joined_at,
        }
    }
}
