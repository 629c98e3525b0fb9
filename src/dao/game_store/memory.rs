//! Process-local store used when no database is configured and in tests.
//!
//! Every chat lives in a single map entry; mutations for one chat run under that entry's
//! lock, so concurrent updates to the same chat are serialized.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::dao::{
    game_store::GameStore,
    models::{DeliveryRecordEntity, GameEntity, JoinOutcome, ParticipantEntity},
    storage::{StorageError, StorageResult},
};

/// [`GameStore`] kept in process memory. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<i64, MemoryGame>,
    deliveries: DashMap<i64, DeliveryRecordEntity>,
}

struct MemoryGame {
    game: GameEntity,
    participants: IndexMap<i64, ParticipantEntity>,
}

impl InMemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn save_game(&self, game: GameEntity) {
        match self.inner.games.entry(game.chat_id) {
            Entry::Occupied(mut slot) => slot.get_mut().game = game,
            Entry::Vacant(slot) => {
                slot.insert(MemoryGame {
                    game,
                    participants: IndexMap::new(),
                });
            }
        }
    }

    fn complete_game(&self, game: GameEntity) {
        match self.inner.games.entry(game.chat_id) {
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                stored.game = game;
                stored.participants.clear();
            }
            Entry::Vacant(slot) => {
                slot.insert(MemoryGame {
                    game,
                    participants: IndexMap::new(),
                });
            }
        }
    }

    fn add_participant(&self, participant: ParticipantEntity) -> StorageResult<JoinOutcome> {
        let chat_id = participant.game_id;
        let mut stored = self
            .inner
            .games
            .get_mut(&chat_id)
            .ok_or(StorageError::MissingGame { chat_id })?;

        if stored.participants.contains_key(&participant.telegram_id) {
            return Ok(JoinOutcome::AlreadyJoined);
        }
        stored
            .participants
            .insert(participant.telegram_id, participant);
        Ok(JoinOutcome::Added)
    }

    fn list_participants(&self, chat_id: i64) -> Vec<ParticipantEntity> {
        self.inner
            .games
            .get(&chat_id)
            .map(|stored| stored.participants.values().cloned().collect())
            .unwrap_or_default()
    }

    fn clear_participants(&self, chat_id: i64) -> u64 {
        self.inner
            .games
            .get_mut(&chat_id)
            .map(|mut stored| {
                let removed = stored.participants.len() as u64;
                stored.participants.clear();
                removed
            })
            .unwrap_or(0)
    }

    fn insert_delivery_record(&self, record: DeliveryRecordEntity) -> bool {
        match self.inner.deliveries.entry(record.telegram_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }
}

impl GameStore for InMemoryGameStore {
    fn find_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let game = self
            .inner
            .games
            .get(&chat_id)
            .map(|stored| stored.game.clone());
        Box::pin(async move { Ok(game) })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.save_game(game);
        Box::pin(async { Ok(()) })
    }

    fn delete_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let deleted = self.inner.games.remove(&chat_id).is_some();
        Box::pin(async move { Ok(deleted) })
    }

    fn complete_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.complete_game(game);
        Box::pin(async { Ok(()) })
    }

    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let outcome = self.add_participant(participant);
        Box::pin(async move { outcome })
    }

    fn list_participants(
        &self,
        chat_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let participants = self.list_participants(chat_id);
        Box::pin(async move { Ok(participants) })
    }

    fn clear_participants(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<u64>> {
        let removed = self.clear_participants(chat_id);
        Box::pin(async move { Ok(removed) })
    }

    fn has_delivery_record(&self, telegram_id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let exists = self.inner.deliveries.contains_key(&telegram_id);
        Box::pin(async move { Ok(exists) })
    }

    fn insert_delivery_record(
        &self,
        record: DeliveryRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inserted = self.insert_delivery_record(record);
        Box::pin(async move { Ok(inserted) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{ChatKindEntity, GameStateEntity};

    fn game(chat_id: i64) -> GameEntity {
        GameEntity {
            chat_id,
            chat_kind: ChatKindEntity::Group,
            state: GameStateEntity::Registration,
            currency: "USD".into(),
            amount: "20".into(),
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    fn participant(chat_id: i64, telegram_id: i64) -> ParticipantEntity {
        ParticipantEntity {
            game_id: chat_id,
            telegram_id,
            handle: Some(format!("user{telegram_id}")),
            joined_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_participant_is_reported_as_already_joined() {
        let store = InMemoryGameStore::new();
        GameStore::save_game(&store, game(-1)).await.unwrap();

        let first = GameStore::add_participant(&store, participant(-1, 7))
            .await
            .unwrap();
        let second = GameStore::add_participant(&store, participant(-1, 7))
            .await
            .unwrap();

        assert_eq!(first, JoinOutcome::Added);
        assert_eq!(second, JoinOutcome::AlreadyJoined);
        assert_eq!(GameStore::list_participants(&store, -1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn participants_keep_join_order() {
        let store = InMemoryGameStore::new();
        GameStore::save_game(&store, game(-1)).await.unwrap();
        for id in [30, 10, 20] {
            GameStore::add_participant(&store, participant(-1, id))
                .await
                .unwrap();
        }

        let ids: Vec<i64> = GameStore::list_participants(&store, -1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.telegram_id)
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn same_person_can_join_games_in_different_chats() {
        let store = InMemoryGameStore::new();
        GameStore::save_game(&store, game(-1)).await.unwrap();
        GameStore::save_game(&store, game(-2)).await.unwrap();

        assert_eq!(
            GameStore::add_participant(&store, participant(-1, 7))
                .await
                .unwrap(),
            JoinOutcome::Added
        );
        assert_eq!(
            GameStore::add_participant(&store, participant(-2, 7))
                .await
                .unwrap(),
            JoinOutcome::Added
        );
    }

    #[tokio::test]
    async fn joining_without_game_fails() {
        let store = InMemoryGameStore::new();
        let err = GameStore::add_participant(&store, participant(-5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingGame { chat_id: -5 }));
    }

    #[tokio::test]
    async fn delete_game_cascades_participants() {
        let store = InMemoryGameStore::new();
        GameStore::save_game(&store, game(-1)).await.unwrap();
        GameStore::add_participant(&store, participant(-1, 1))
            .await
            .unwrap();

        assert!(GameStore::delete_game(&store, -1).await.unwrap());
        assert!(GameStore::find_game(&store, -1).await.unwrap().is_none());
        assert!(GameStore::list_participants(&store, -1).await.unwrap().is_empty());
        assert!(!GameStore::delete_game(&store, -1).await.unwrap());
    }

    #[tokio::test]
    async fn complete_game_clears_participants() {
        let store = InMemoryGameStore::new();
        GameStore::save_game(&store, game(-1)).await.unwrap();
        GameStore::add_participant(&store, participant(-1, 1))
            .await
            .unwrap();

        let mut completed = game(-1);
        completed.state = GameStateEntity::Completed;
        GameStore::complete_game(&store, completed).await.unwrap();

        let stored = GameStore::find_game(&store, -1).await.unwrap().unwrap();
        assert_eq!(stored.state, GameStateEntity::Completed);
        assert!(GameStore::list_participants(&store, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_record_insert_is_idempotent() {
        let store = InMemoryGameStore::new();
        let record = DeliveryRecordEntity {
            telegram_id: 9,
            sent_at: SystemTime::now(),
        };

        assert!(!GameStore::has_delivery_record(&store, 9).await.unwrap());
        assert!(
            GameStore::insert_delivery_record(&store, record.clone())
                .await
                .unwrap()
        );
        assert!(!GameStore::insert_delivery_record(&store, record).await.unwrap());
        assert!(GameStore::has_delivery_record(&store, 9).await.unwrap());
    }
}
