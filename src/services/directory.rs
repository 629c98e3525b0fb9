//! Participant directory: who joined which game and who can be reached privately.

use std::time::SystemTime;

use tracing::debug;

use crate::{
    dao::models::{DeliveryRecordEntity, JoinOutcome, ParticipantEntity},
    error::ServiceError,
    state::{SharedState, game::Participant},
};

/// Add a person to the chat's game. Joining twice is reported, never an error.
pub async fn join(
    state: &SharedState,
    chat_id: i64,
    person_id: i64,
    handle: Option<String>,
) -> Result<JoinOutcome, ServiceError> {
    let store = state.require_game_store().await?;
    let outcome = store
        .add_participant(ParticipantEntity {
            game_id: chat_id,
            telegram_id: person_id,
            handle,
            joined_at: SystemTime::now(),
        })
        .await?;
    debug!(chat_id, person_id, ?outcome, "participant join");
    Ok(outcome)
}

/// Participants of the chat's game in join order.
pub async fn list(state: &SharedState, chat_id: i64) -> Result<Vec<Participant>, ServiceError> {
    let store = state.require_game_store().await?;
    let participants = store.list_participants(chat_id).await?;
    Ok(participants.into_iter().map(Into::into).collect())
}

/// Drop every participant of the chat's game. Returns how many were removed.
pub async fn remove_all(state: &SharedState, chat_id: i64) -> Result<u64, ServiceError> {
    let store = state.require_game_store().await?;
    Ok(store.clear_participants(chat_id).await?)
}

/// Whether the bot ever delivered a private message to the person.
pub async fn has_received_private_message(
    state: &SharedState,
    person_id: i64,
) -> Result<bool, ServiceError> {
    let store = state.require_game_store().await?;
    Ok(store.has_delivery_record(person_id).await?)
}

/// Remember that the person can be reached privately. Repeated calls are no-ops.
pub async fn mark_received(state: &SharedState, person_id: i64) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let inserted = store
        .insert_delivery_record(DeliveryRecordEntity {
            telegram_id: person_id,
            sent_at: SystemTime::now(),
        })
        .await?;
    if inserted {
        debug!(person_id, "recorded first private delivery");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{group_game, test_state};

    #[tokio::test]
    async fn join_is_idempotent_and_ordered() {
        let (state, _gateway) = test_state().await;
        group_game(&state, -100).await;

        assert_eq!(
            join(&state, -100, 2, Some("@bob".into())).await.unwrap(),
            JoinOutcome::Added
        );
        assert_eq!(
            join(&state, -100, 1, Some("@alice".into())).await.unwrap(),
            JoinOutcome::Added
        );
        assert_eq!(
            join(&state, -100, 2, Some("@bob".into())).await.unwrap(),
            JoinOutcome::AlreadyJoined
        );

        let handles: Vec<String> = list(&state, -100)
            .await
            .unwrap()
            .iter()
            .map(Participant::mention)
            .collect();
        assert_eq!(handles, vec!["@bob", "@alice"]);
    }

    #[tokio::test]
    async fn concurrent_duplicate_joins_add_once() {
        let (state, _gateway) = test_state().await;
        group_game(&state, -100).await;

        let attempts = (0..8).map(|_| join(&state, -100, 42, Some("@racer".into())));
        let outcomes = futures::future::join_all(attempts).await;

        let added = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Ok(JoinOutcome::Added)))
            .count();
        assert_eq!(added, 1);
        assert_eq!(list(&state, -100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_all_empties_the_game() {
        let (state, _gateway) = test_state().await;
        group_game(&state, -100).await;
        join(&state, -100, 1, None).await.unwrap();
        join(&state, -100, 2, None).await.unwrap();

        assert_eq!(remove_all(&state, -100).await.unwrap(), 2);
        assert!(list(&state, -100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_records_are_write_once() {
        let (state, _gateway) = test_state().await;

        assert!(!has_received_private_message(&state, 5).await.unwrap());
        mark_received(&state, 5).await.unwrap();
        mark_received(&state, 5).await.unwrap();
        assert!(has_received_private_message(&state, 5).await.unwrap());
    }
}
