use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{
    ChatKindEntity, DeliveryRecordEntity, GameEntity, GameStateEntity, ParticipantEntity,
};

/// `games` collection document; the chat id is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    chat_id: i64,
    chat_kind: ChatKindEntity,
    state: GameStateEntity,
    currency: String,
    amount: String,
    created_at: DateTime,
    updated_at: DateTime,
}

/// `participants` collection document, unique on `(game_id, telegram_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    game_id: i64,
    telegram_id: i64,
    handle: Option<String>,
    joined_at: DateTime,
}

/// `delivery_records` collection document keyed by the person id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoDeliveryRecordDocument {
    #[serde(rename = "_id")]
    telegram_id: i64,
    sent_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            chat_id: value.chat_id,
            chat_kind: value.chat_kind,
            state: value.state,
            currency: value.currency,
            amount: value.amount,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            chat_id: value.chat_id,
            chat_kind: value.chat_kind,
            state: value.state,
            currency: value.currency,
            amount: value.amount,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            game_id: value.game_id,
            telegram_id: value.telegram_id,
            handle: value.handle,
            joined_at: DateTime::from_system_time(value.joined_at),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            game_id: value.game_id,
            telegram_id: value.telegram_id,
            handle: value.handle,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

impl From<DeliveryRecordEntity> for MongoDeliveryRecordDocument {
    fn from(value: DeliveryRecordEntity) -> Self {
        Self {
            telegram_id: value.telegram_id,
            sent_at: DateTime::from_system_time(value.sent_at),
        }
    }
}

pub fn doc_id(id: i64) -> Document {
    doc! {"_id": id}
}

pub fn game_filter(chat_id: i64) -> Document {
    doc! {"game_id": chat_id}
}

impl MongoDeliveryRecordDocument {
    /// Filter matching the record of this person.
    pub fn filter(&self) -> Document {
        doc_id(self.telegram_id)
    }

    /// Update that only writes when no record exists yet.
    pub fn set_on_insert(&self) -> Document {
        doc! {"$setOnInsert": {"sent_at": self.sent_at}}
    }
}
