/// In-process store.
pub mod memory;
/// MongoDB store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{DeliveryRecordEntity, GameEntity, JoinOutcome, ParticipantEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for games, participants and delivery records.
///
/// Implementations must keep at most one game per chat, reject a second participant row
/// for the same `(game_id, telegram_id)` pair and delete participants together with their game.
pub trait GameStore: Send + Sync {
    /// Game registered in `chat_id`, if any.
    fn find_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Insert or replace the game row, leaving its participants untouched.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete the game and all of its participants. Returns `false` when no game existed.
    fn delete_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<bool>>;
    /// Persist the completed game row and drop its participants in one operation.
    fn complete_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Register a participant; a second row for the same person reports `AlreadyJoined`.
    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>>;
    /// Participants of a game in join order.
    fn list_participants(
        &self,
        chat_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Remove every participant of the chat's game. Returns the number removed.
    fn clear_participants(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<u64>>;
    /// Whether a private message ever reached `telegram_id`.
    fn has_delivery_record(&self, telegram_id: i64) -> BoxFuture<'static, StorageResult<bool>>;
    /// Insert a delivery record unless one already exists. Returns `true` on insertion.
    fn insert_delivery_record(
        &self,
        record: DeliveryRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
