//! Test doubles shared by the service tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;

use crate::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::InMemoryGameStore},
        models::{DeliveryRecordEntity, GameEntity, JoinOutcome, ParticipantEntity},
        storage::{StorageError, StorageResult},
    },
    gateway::{ChatGateway, GatewayError, GatewayResult, InlineAction, PrivateDelivery},
    state::{
        AppState, SharedState,
        game::{Amount, ChatKind, Currency, Game, Sender},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub action: Option<InlineAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateAttempt {
    pub person_id: i64,
    pub text: String,
    pub outcome: PrivateDelivery,
}

/// [`ChatGateway`] that records every request and answers from configured fixtures.
#[derive(Default)]
pub struct RecordingGateway {
    group: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<(i32, SentMessage)>>,
    private: Mutex<Vec<PrivateAttempt>>,
    admins: Mutex<HashMap<i64, HashSet<i64>>>,
    blocked: Mutex<HashSet<i64>>,
    failing: Mutex<HashSet<i64>>,
    block_after: Mutex<HashMap<i64, usize>>,
    hanging: Mutex<HashSet<i64>>,
    edits_fail: Mutex<bool>,
    admin_lookup_fails: Mutex<bool>,
    admin_lookup_panics: Mutex<bool>,
}

impl RecordingGateway {
    pub fn set_admins(&self, chat_id: i64, admins: impl IntoIterator<Item = i64>) {
        self.admins
            .lock()
            .unwrap()
            .insert(chat_id, admins.into_iter().collect());
    }

    /// Private messages to `person_id` are refused as if the bot was never started.
    pub fn block(&self, person_id: i64) {
        self.blocked.lock().unwrap().insert(person_id);
    }

    /// Private messages to `person_id` fail with a transport error.
    pub fn fail(&self, person_id: i64) {
        self.failing.lock().unwrap().insert(person_id);
    }

    /// Deliver `deliveries` private messages to `person_id`, then refuse the rest.
    pub fn block_after(&self, person_id: i64, deliveries: usize) {
        self.block_after
            .lock()
            .unwrap()
            .insert(person_id, deliveries);
    }

    /// Private messages to `person_id` never get an answer.
    pub fn hang(&self, person_id: i64) {
        self.hanging.lock().unwrap().insert(person_id);
    }

    /// Message edits are recorded, then fail.
    pub fn fail_edits(&self) {
        *self.edits_fail.lock().unwrap() = true;
    }

    pub fn fail_admin_lookup(&self) {
        *self.admin_lookup_fails.lock().unwrap() = true;
    }

    /// Admin lookups panic inside the gateway.
    pub fn panic_on_admin_lookup(&self) {
        *self.admin_lookup_panics.lock().unwrap() = true;
    }

    pub fn group_messages(&self, chat_id: i64) -> Vec<SentMessage> {
        self.group
            .lock()
            .unwrap()
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn group_texts(&self, chat_id: i64) -> Vec<String> {
        self.group_messages(chat_id)
            .into_iter()
            .map(|message| message.text)
            .collect()
    }

    pub fn last_group_text(&self, chat_id: i64) -> String {
        self.group_texts(chat_id).pop().unwrap_or_default()
    }

    pub fn edits(&self) -> Vec<(i32, SentMessage)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn private_attempts(&self) -> Vec<PrivateAttempt> {
        self.private.lock().unwrap().clone()
    }

    pub fn delivered_to(&self, person_id: i64) -> Vec<String> {
        self.private_attempts()
            .into_iter()
            .filter(|attempt| attempt.person_id == person_id && attempt.outcome.is_delivered())
            .map(|attempt| attempt.text)
            .collect()
    }

    fn classify(&self, person_id: i64) -> PrivateDelivery {
        if self.hanging.lock().unwrap().contains(&person_id) {
            return PrivateDelivery::Failed("no answer".into());
        }
        if self.blocked.lock().unwrap().contains(&person_id) {
            return PrivateDelivery::Blocked;
        }
        if self.failing.lock().unwrap().contains(&person_id) {
            return PrivateDelivery::Failed("simulated transport failure".into());
        }
        let mut block_after = self.block_after.lock().unwrap();
        match block_after.get_mut(&person_id) {
            Some(0) => PrivateDelivery::Blocked,
            Some(remaining) => {
                *remaining -= 1;
                PrivateDelivery::Delivered
            }
            None => PrivateDelivery::Delivered,
        }
    }
}

impl ChatGateway for RecordingGateway {
    fn send_group_message(
        &self,
        chat_id: i64,
        text: String,
        action: Option<InlineAction>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        self.group.lock().unwrap().push(SentMessage {
            chat_id,
            text,
            action,
        });
        Box::pin(async { Ok(()) })
    }

    fn send_private_message(
        &self,
        person_id: i64,
        text: String,
    ) -> BoxFuture<'static, PrivateDelivery> {
        let outcome = self.classify(person_id);
        self.private.lock().unwrap().push(PrivateAttempt {
            person_id,
            text,
            outcome: outcome.clone(),
        });
        if self.hanging.lock().unwrap().contains(&person_id) {
            return Box::pin(futures::future::pending());
        }
        Box::pin(async move { outcome })
    }

    fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: String,
        action: Option<InlineAction>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        self.edits.lock().unwrap().push((
            message_id,
            SentMessage {
                chat_id,
                text,
                action,
            },
        ));
        if *self.edits_fail.lock().unwrap() {
            return Box::pin(async {
                Err(GatewayError::Request("simulated edit failure".into()))
            });
        }
        Box::pin(async { Ok(()) })
    }

    fn list_admins(&self, chat_id: i64) -> BoxFuture<'static, GatewayResult<HashSet<i64>>> {
        if *self.admin_lookup_panics.lock().unwrap() {
            panic!("simulated gateway panic");
        }
        let result = if *self.admin_lookup_fails.lock().unwrap() {
            Err(GatewayError::Request("simulated admin lookup failure".into()))
        } else {
            Ok(self
                .admins
                .lock()
                .unwrap()
                .get(&chat_id)
                .cloned()
                .unwrap_or_default())
        };
        Box::pin(async move { result })
    }
}

/// In-memory store whose `complete_game` always fails without writing anything.
#[derive(Default)]
pub struct CompletionFailingStore {
    inner: InMemoryGameStore,
}

impl GameStore for CompletionFailingStore {
    fn find_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        GameStore::find_game(&self.inner, chat_id)
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        GameStore::save_game(&self.inner, game)
    }

    fn delete_game(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        GameStore::delete_game(&self.inner, chat_id)
    }

    fn complete_game(&self, _game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async {
            Err(StorageError::unavailable(
                "transaction aborted".into(),
                std::io::Error::other("simulated write conflict"),
            ))
        })
    }

    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        GameStore::add_participant(&self.inner, participant)
    }

    fn list_participants(
        &self,
        chat_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        GameStore::list_participants(&self.inner, chat_id)
    }

    fn clear_participants(&self, chat_id: i64) -> BoxFuture<'static, StorageResult<u64>> {
        GameStore::clear_participants(&self.inner, chat_id)
    }

    fn has_delivery_record(&self, telegram_id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        GameStore::has_delivery_record(&self.inner, telegram_id)
    }

    fn insert_delivery_record(
        &self,
        record: DeliveryRecordEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        GameStore::insert_delivery_record(&self.inner, record)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        GameStore::health_check(&self.inner)
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        GameStore::try_reconnect(&self.inner)
    }
}

/// Shared state backed by an in-memory store and a recording gateway.
pub async fn test_state() -> (SharedState, Arc<RecordingGateway>) {
    test_state_with(AppConfig::default()).await
}

/// Same as [`test_state`] with a custom configuration.
pub async fn test_state_with(config: AppConfig) -> (SharedState, Arc<RecordingGateway>) {
    let gateway = Arc::new(RecordingGateway::default());
    let state = AppState::new(
        config,
        gateway.clone(),
        Some("santa_bot".into()),
    );
    state
        .install_game_store(Arc::new(InMemoryGameStore::new()))
        .await;
    (state, gateway)
}

/// Register a game in registration phase directly through the store.
pub async fn group_game(state: &SharedState, chat_id: i64) -> Game {
    let game = Game::new(
        chat_id,
        ChatKind::Group,
        Currency::parse("USD", 8).unwrap(),
        Amount::parse("20").unwrap(),
    );
    let store = state.game_store().await.unwrap();
    store.save_game(GameEntity::from(game.clone())).await.unwrap();
    game
}

pub fn sender(id: i64, username: &str) -> Sender {
    Sender {
        id,
        username: Some(username.into()),
        full_name: format!("{username} Tester"),
    }
}
