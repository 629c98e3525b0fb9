//! MongoDB implementation of the game store.

use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database,
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoDeliveryRecordDocument, MongoGameDocument, MongoParticipantDocument, doc_id,
        game_filter,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{DeliveryRecordEntity, GameEntity, JoinOutcome, ParticipantEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const DELIVERY_COLLECTION_NAME: &str = "delivery_records";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// [`GameStore`] backed by MongoDB. Completion and deletion need a replica set for transactions.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // The unique index turns concurrent duplicate joins into duplicate-key errors.
        let participants = self.participant_collection().await;
        let unique_member = mongodb::IndexModel::builder()
            .keys(doc! {"game_id": 1, "telegram_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_game_person_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        participants
            .create_index(unique_member)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "game_id,telegram_id",
                source,
            })?;

        let join_order = mongodb::IndexModel::builder()
            .keys(doc! {"game_id": 1, "joined_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_join_order_idx".to_owned()))
                    .build(),
            )
            .build();

        participants
            .create_index(join_order)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "game_id,joined_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn game_collection(&self) -> Collection<MongoGameDocument> {
        self.database()
            .await
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn participant_collection(&self) -> Collection<MongoParticipantDocument> {
        self.database()
            .await
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn delivery_collection(&self) -> Collection<MongoDeliveryRecordDocument> {
        self.database()
            .await
            .collection::<MongoDeliveryRecordDocument>(DELIVERY_COLLECTION_NAME)
    }

    async fn find_game(&self, chat_id: i64) -> MongoResult<Option<GameEntity>> {
        let collection = self.game_collection().await;
        let document = collection
            .find_one(doc_id(chat_id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { chat_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let chat_id = game.chat_id;
        let document: MongoGameDocument = game.into();
        let collection = self.game_collection().await;
        collection
            .replace_one(doc_id(chat_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { chat_id, source })?;
        Ok(())
    }

    /// Open a session with a started transaction. Dropping it uncommitted aborts the transaction.
    async fn begin(&self, chat_id: i64) -> MongoResult<ClientSession> {
        let client = {
            let guard = self.inner.state.read().await;
            guard.client.clone()
        };
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction { chat_id, source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { chat_id, source })?;
        Ok(session)
    }

    async fn commit(session: &mut ClientSession, chat_id: i64) -> MongoResult<()> {
        session
            .commit_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { chat_id, source })
    }

    /// Delete the game and its participants in one transaction.
    async fn delete_game(&self, chat_id: i64) -> MongoResult<bool> {
        let mut session = self.begin(chat_id).await?;

        self.participant_collection()
            .await
            .delete_many(game_filter(chat_id))
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::ClearParticipants { chat_id, source })?;
        let result = self
            .game_collection()
            .await
            .delete_one(doc_id(chat_id))
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::DeleteGame { chat_id, source })?;

        Self::commit(&mut session, chat_id).await?;
        Ok(result.deleted_count > 0)
    }

    /// Store the completed game and drop its participants in one transaction.
    async fn complete_game(&self, game: GameEntity) -> MongoResult<()> {
        let chat_id = game.chat_id;
        let document: MongoGameDocument = game.into();
        let mut session = self.begin(chat_id).await?;

        self.game_collection()
            .await
            .replace_one(doc_id(chat_id), &document)
            .upsert(true)
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::SaveGame { chat_id, source })?;
        self.participant_collection()
            .await
            .delete_many(game_filter(chat_id))
            .session(&mut session)
            .await
            .map_err(|source| MongoDaoError::ClearParticipants { chat_id, source })?;

        Self::commit(&mut session, chat_id).await
    }

    async fn add_participant(&self, participant: ParticipantEntity) -> MongoResult<JoinOutcome> {
        let chat_id = participant.game_id;
        let telegram_id = participant.telegram_id;
        let document: MongoParticipantDocument = participant.into();
        let collection = self.participant_collection().await;

        match collection.insert_one(&document).await {
            Ok(_) => Ok(JoinOutcome::Added),
            Err(err) if is_duplicate_key(&err) => Ok(JoinOutcome::AlreadyJoined),
            Err(source) => Err(MongoDaoError::SaveParticipant {
                chat_id,
                telegram_id,
                source,
            }),
        }
    }

    async fn list_participants(&self, chat_id: i64) -> MongoResult<Vec<ParticipantEntity>> {
        let collection = self.participant_collection().await;
        let documents: Vec<MongoParticipantDocument> = collection
            .find(game_filter(chat_id))
            .sort(doc! {"joined_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListParticipants { chat_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListParticipants { chat_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn clear_participants(&self, chat_id: i64) -> MongoResult<u64> {
        let collection = self.participant_collection().await;
        let result = collection
            .delete_many(game_filter(chat_id))
            .await
            .map_err(|source| MongoDaoError::ClearParticipants { chat_id, source })?;
        Ok(result.deleted_count)
    }

    async fn has_delivery_record(&self, telegram_id: i64) -> MongoResult<bool> {
        let collection = self.delivery_collection().await;
        let record = collection
            .find_one(doc_id(telegram_id))
            .await
            .map_err(|source| MongoDaoError::DeliveryRecord {
                telegram_id,
                source,
            })?;
        Ok(record.is_some())
    }

    async fn insert_delivery_record(&self, record: DeliveryRecordEntity) -> MongoResult<bool> {
        let telegram_id = record.telegram_id;
        let document: MongoDeliveryRecordDocument = record.into();
        let collection = self.delivery_collection().await;
        let result = collection
            .update_one(document.filter(), document.set_on_insert())
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::DeliveryRecord {
                telegram_id,
                source,
            })?;
        Ok(result.upserted_id.is_some())
    }
}

impl GameStore for MongoGameStore {
    fn find_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(chat_id).await.map_err(Into::into) })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn delete_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(chat_id).await.map_err(Into::into) })
    }

    fn complete_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.complete_game(game).await.map_err(Into::into) })
    }

    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.add_participant(participant).await.map_err(Into::into) })
    }

    fn list_participants(
        &self,
        chat_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(chat_id).await.map_err(Into::into) })
    }

    fn clear_participants(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.clear_participants(chat_id).await.map_err(Into::into) })
    }

    fn has_delivery_record(&self, telegram_id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .has_delivery_record(telegram_id)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_delivery_record(
        &self,
        record: DeliveryRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_delivery_record(record)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
