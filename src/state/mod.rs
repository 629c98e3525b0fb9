//! Application state shared by every update handler.

/// Domain types of a game.
pub mod game;
/// Game lifecycle rules.
pub mod state_machine;
/// Locked plan-then-work helper.
pub mod transitions;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, storage::StorageError},
    error::ServiceError,
    gateway::ChatGateway,
    state::game::Game,
};

/// Handle to [`AppState`] passed to every handler.
pub type SharedState = Arc<AppState>;

/// Central application state shared by every update handler.
pub struct AppState {
    config: Arc<AppConfig>,
    gateway: Arc<dyn ChatGateway>,
    bot_username: Option<String>,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    chat_gates: DashMap<i64, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        gateway: Arc<dyn ChatGateway>,
        bot_username: Option<String>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config: Arc::new(config),
            gateway,
            bot_username,
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            chat_gates: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Chat platform used for outbound messages.
    pub fn gateway(&self) -> Arc<dyn ChatGateway> {
        self.gateway.clone()
    }

    /// Username of the bot itself, used to ignore commands addressed to other bots.
    pub fn bot_username(&self) -> Option<&str> {
        self.bot_username.as_deref()
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] when none is installed or the
    /// supervisor has flagged the installed one as unhealthy.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Serialize command handling for one chat; the guard releases the chat on drop.
    pub async fn lock_chat(&self, chat_id: i64) -> ChatGuard<'_> {
        let gate = self.chat_gates.entry(chat_id).or_default().clone();
        ChatGuard {
            state: self,
            chat_id,
            guard: Some(gate.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_chats(&self) -> usize {
        self.chat_gates.len()
    }

    /// Load and decode the game registered in `chat_id`.
    pub async fn load_game(&self, chat_id: i64) -> Result<Option<Game>, ServiceError> {
        let store = self.require_game_store().await?;
        let Some(entity) = store.find_game(chat_id).await? else {
            return Ok(None);
        };
        let game = Game::try_from(entity)
            .map_err(|reason| StorageError::Corrupted { chat_id, reason })?;
        Ok(Some(game))
    }
}

/// Exclusive hold on one chat. Dropping it unlocks the chat and forgets the gate when no
/// other task is waiting on it.
pub struct ChatGuard<'a> {
    state: &'a AppState,
    chat_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ChatGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone of the gate, so it stays while anyone queues on it.
        self.state
            .chat_gates
            .remove_if(&self.chat_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        dao::game_store::memory::InMemoryGameStore,
        error::ServiceError,
        services::testing::test_state,
    };

    #[tokio::test]
    async fn degraded_flag_hides_an_installed_store() {
        let (state, _gateway) = test_state().await;
        assert!(state.require_game_store().await.is_ok());

        state.update_degraded(true);
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(state.load_game(-1).await, Err(ServiceError::Degraded)));

        state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        assert!(state.require_game_store().await.is_ok());
    }

    #[tokio::test]
    async fn chat_gates_are_forgotten_once_released() {
        let (state, _gateway) = test_state().await;

        let first = state.lock_chat(1).await;
        let second = state.lock_chat(2).await;
        assert_eq!(state.tracked_chats(), 2);
        drop(first);
        assert_eq!(state.tracked_chats(), 1);
        drop(second);
        assert_eq!(state.tracked_chats(), 0);
    }

    #[tokio::test]
    async fn gate_survives_while_another_task_waits() {
        let (state, _gateway) = test_state().await;

        let held = state.lock_chat(7).await;
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move {
                let _guard = state.lock_chat(7).await;
            })
        };
        while state.chat_gates.get(&7).map(|gate| Arc::strong_count(&gate)) != Some(3) {
            tokio::task::yield_now().await;
        }
        drop(held);
        assert_eq!(state.tracked_chats(), 1);

        waiter.await.unwrap();
        assert_eq!(state.tracked_chats(), 0);
    }
}
