use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable is not set.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// URI as configured.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered the initial ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings sent before giving up.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: MongoError,
    },
    /// A health check ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a game failed.
    #[error("failed to save game for chat {chat_id}")]
    SaveGame {
        /// Chat owning the game.
        chat_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a game failed.
    #[error("failed to load game for chat {chat_id}")]
    LoadGame {
        /// Chat owning the game.
        chat_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Deleting a game failed.
    #[error("failed to delete game for chat {chat_id}")]
    DeleteGame {
        /// Chat owning the game.
        chat_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Inserting a participant failed for a reason other than a duplicate.
    #[error("failed to save participant {telegram_id} of chat {chat_id}")]
    SaveParticipant {
        /// Chat owning the game.
        chat_id: i64,
        /// Person being registered.
        telegram_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading participants failed.
    #[error("failed to list participants of chat {chat_id}")]
    ListParticipants {
        /// Chat owning the game.
        chat_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Deleting participants failed.
    #[error("failed to clear participants of chat {chat_id}")]
    ClearParticipants {
        /// Chat owning the game.
        chat_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading or writing a delivery record failed.
    #[error("failed to access delivery record of {telegram_id}")]
    DeliveryRecord {
        /// Person the record belongs to.
        telegram_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Starting or committing a multi-document transaction failed.
    #[error("transaction on chat {chat_id} failed")]
    Transaction {
        /// Chat the transaction touched.
        chat_id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
