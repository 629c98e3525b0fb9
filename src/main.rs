//! Secret Santa bot entrypoint wiring configuration, storage and the Telegram dispatcher.

use std::{env, sync::Arc};

use anyhow::Context;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secret_santa_bot::{
    config::AppConfig,
    dao::game_store::{GameStore, memory::InMemoryGameStore},
    state::{AppState, SharedState},
    telegram::{TelegramGateway, handlers},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let bot = Bot::from_env();
    let me = bot.get_me().await.context("fetching bot identity")?;
    let bot_username = me.user.username.clone();
    info!(username = ?bot_username, "authenticated with Telegram");

    let gateway = Arc::new(TelegramGateway::new(bot.clone(), config.join_button_label.clone()));
    let state = AppState::new(config, gateway, bot_username);
    start_storage(&state).await;

    if let Err(err) = handlers::register_commands(&bot).await {
        warn!(error = %err, "failed to register bot command menus");
    }

    info!("listening for updates");
    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Use MongoDB when `MONGO_URI` is set, the in-memory store otherwise.
async fn start_storage(state: &SharedState) {
    #[cfg(feature = "mongo-store")]
    if env::var_os("MONGO_URI").is_some() {
        info!("MONGO_URI set; supervising MongoDB game store");
        tokio::spawn(secret_santa_bot::services::storage_supervisor::run(
            state.clone(),
            mongo::connect,
        ));
        return;
    }

    #[cfg(not(feature = "mongo-store"))]
    if env::var_os("MONGO_URI").is_some() {
        warn!("MONGO_URI set but the mongo-store feature is disabled; using in-memory store");
    }
    let store: Arc<dyn GameStore> = Arc::new(InMemoryGameStore::new());
    state.install_game_store(store).await;
    info!("using in-memory game store; games are lost on restart");
}

#[cfg(feature = "mongo-store")]
mod mongo {
    use std::sync::Arc;

    use secret_santa_bot::dao::{
        game_store::{
            GameStore,
            mongodb::{MongoConfig, MongoGameStore},
        },
        storage::StorageError,
    };

    pub async fn connect() -> Result<Arc<dyn GameStore>, StorageError> {
        let config = MongoConfig::from_env().await?;
        let store = MongoGameStore::connect(config).await?;
        Ok(Arc::new(store))
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,teloxide=warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
