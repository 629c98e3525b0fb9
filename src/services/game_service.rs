//! Group commands driving a game through its lifecycle.

use std::collections::HashSet;

use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{
    dao::models::{GameEntity, JoinOutcome},
    error::{Rejection, ServiceError},
    gateway::InlineAction,
    services::{
        directory, messages, outbox,
        pairing::{self, DistributionOutcome},
    },
    state::{
        SharedState,
        game::{Amount, ChatKind, Currency, Game, Sender},
        state_machine::{GameEvent, GamePhase, InvalidTransition},
        transitions::run_transition,
    },
};

/// Where a join request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSource {
    /// The `/join` text command.
    Command,
    /// The inline join button; the confirmation replaces the button's message when known.
    Button {
        /// Message carrying the pressed button.
        message_id: Option<i32>,
    },
}

/// Open, reopen or update a chat's registration (`/start <currency> <amount>`).
pub async fn start(
    state: &SharedState,
    chat_id: i64,
    chat_kind: ChatKind,
    sender: &Sender,
    args: &[String],
) -> Result<(), ServiceError> {
    ensure_admin(state, chat_id, sender.id).await?;
    let (currency, amount) = parse_terms(args, state.config().max_currency_len)?;

    run_transition(state, chat_id, GameEvent::Start, |game, plan| async move {
        let store = state.require_game_store().await?;
        match game {
            None => {
                let game = Game::new(chat_id, chat_kind, currency, amount);
                store.save_game(GameEntity::from(game.clone())).await?;
                info!(chat_id, currency = %game.currency, amount = %game.amount, "registration opened");
                outbox::send_group(
                    state,
                    chat_id,
                    messages::registration_opened(&game),
                    Some(InlineAction::JoinGame),
                )
                .await;
            }
            Some(mut game) if plan.from == Some(GamePhase::Completed) => {
                directory::remove_all(state, chat_id).await?;
                game.set_terms(currency, amount);
                game.set_phase(GamePhase::Registration);
                store.save_game(GameEntity::from(game.clone())).await?;
                info!(chat_id, "registration reopened");
                outbox::send_group(
                    state,
                    chat_id,
                    messages::registration_reopened(&game),
                    Some(InlineAction::JoinGame),
                )
                .await;
            }
            Some(mut game) => {
                if game.set_terms(currency, amount) {
                    store.save_game(GameEntity::from(game.clone())).await?;
                    info!(chat_id, currency = %game.currency, amount = %game.amount, "gift terms updated");
                }
                let participants = directory::list(state, chat_id).await?;
                outbox::send_group(
                    state,
                    chat_id,
                    messages::registration_status(&game, &participants),
                    Some(InlineAction::JoinGame),
                )
                .await;
            }
        }
        Ok(())
    })
    .await
}

/// Register the sender in the chat's open registration.
pub async fn join(
    state: &SharedState,
    chat_id: i64,
    sender: &Sender,
    source: JoinSource,
) -> Result<JoinOutcome, ServiceError> {
    run_transition(state, chat_id, GameEvent::Join, |game, _plan| async move {
        let Some(game) = game else {
            return Err(missing_game(GameEvent::Join));
        };
        let mention = sender
            .display_handle()
            .unwrap_or_else(|| format!("participant #{}", sender.id));

        let outcome = directory::join(state, chat_id, sender.id, sender.display_handle()).await?;
        if outcome == JoinOutcome::AlreadyJoined {
            outbox::send_group(state, chat_id, messages::already_joined(&mention), None).await;
            return Ok(outcome);
        }

        info!(chat_id, person_id = sender.id, "participant joined");
        let participants = directory::list(state, chat_id).await?;
        let text = messages::joined(&mention, &game, &participants);
        confirm_join(state, chat_id, source, text).await;

        let reachable = directory::has_received_private_message(state, sender.id)
            .await
            .unwrap_or_else(|err| {
                warn!(person_id = sender.id, error = %err, "delivery record lookup failed");
                false
            });
        if !reachable {
            outbox::send_group(
                state,
                chat_id,
                messages::dm_reminder(&mention, state.bot_username()),
                None,
            )
            .await;
        }
        Ok(outcome)
    })
    .await
}

/// Close registration and run the draw. The game is completed only when the draw succeeds.
///
/// A failure to persist the completion after the assignments went out is reported to the group
/// and leaves the stored game in registration.
pub async fn stop(
    state: &SharedState,
    chat_id: i64,
    sender: &Sender,
) -> Result<DistributionOutcome, ServiceError> {
    ensure_admin(state, chat_id, sender.id).await?;

    run_transition(state, chat_id, GameEvent::Stop, |game, plan| async move {
        let Some(mut game) = game else {
            return Err(missing_game(GameEvent::Stop));
        };
        let outcome = pairing::distribute(state, &game).await?;
        match &outcome {
            DistributionOutcome::InsufficientParticipants => {
                outbox::send_group(state, chat_id, messages::insufficient_participants(), None)
                    .await;
            }
            DistributionOutcome::InsufficientReachableParticipants { .. } => {
                outbox::send_group(
                    state,
                    chat_id,
                    messages::insufficient_reachable_participants(),
                    None,
                )
                .await;
            }
            DistributionOutcome::Success(_) => {
                if let Some(phase) = plan.target() {
                    game.set_phase(phase);
                }
                let saved = async {
                    let store = state.require_game_store().await?;
                    store.complete_game(GameEntity::from(game)).await?;
                    Ok::<_, ServiceError>(())
                }
                .await;
                outbox::send_group(state, chat_id, messages::all_pairs_notified(), None).await;
                match saved {
                    Ok(()) => {
                        info!(chat_id, "game completed");
                        outbox::send_group(state, chat_id, messages::game_completed(), None).await;
                    }
                    // Assignments are already out, so the draw still counts as done.
                    Err(err) => {
                        error!(chat_id, error = %err, "saving the completed game failed");
                        outbox::send_group(state, chat_id, messages::completion_not_saved(), None)
                            .await;
                    }
                }
            }
        }
        Ok(outcome)
    })
    .await
}

/// Delete the chat's game together with its participants.
pub async fn reset(state: &SharedState, chat_id: i64, sender: &Sender) -> Result<(), ServiceError> {
    ensure_admin(state, chat_id, sender.id).await?;

    run_transition(state, chat_id, GameEvent::Reset, |_game, _plan| async move {
        let store = state.require_game_store().await?;
        store.delete_game(chat_id).await?;
        info!(chat_id, "game reset");
        outbox::send_group(state, chat_id, messages::reset_done(), None).await;
        Ok(())
    })
    .await
}

/// List the participants of the chat's game.
pub async fn info(state: &SharedState, chat_id: i64) -> Result<(), ServiceError> {
    run_transition(state, chat_id, GameEvent::Info, |game, _plan| async move {
        let text = match game {
            None => messages::not_registered(),
            Some(_) => messages::participants_list(&directory::list(state, chat_id).await?),
        };
        outbox::send_group(state, chat_id, text, None).await;
        Ok(())
    })
    .await
}

async fn confirm_join(state: &SharedState, chat_id: i64, source: JoinSource, text: String) {
    if let JoinSource::Button {
        message_id: Some(message_id),
    } = source
    {
        let edit = state.gateway().edit_message(
            chat_id,
            message_id,
            text.clone(),
            Some(InlineAction::JoinGame),
        );
        match edit.await {
            Ok(()) => return,
            Err(err) => {
                warn!(chat_id, message_id, error = %err, "editing join message failed; sending a new one")
            }
        }
    }
    outbox::send_group(state, chat_id, text, Some(InlineAction::JoinGame)).await;
}

/// Admin lookups that fail count as "not an admin".
async fn ensure_admin(state: &SharedState, chat_id: i64, person_id: i64) -> Result<(), ServiceError> {
    let lookup = state.gateway().list_admins(chat_id);
    let admins = match timeout(state.config().send_timeout, lookup).await {
        Ok(Ok(admins)) => admins,
        Ok(Err(err)) => {
            warn!(chat_id, error = %err, "admin lookup failed");
            HashSet::new()
        }
        Err(_) => {
            warn!(chat_id, "admin lookup timed out");
            HashSet::new()
        }
    };
    if admins.contains(&person_id) {
        Ok(())
    } else {
        Err(Rejection::NotAdmin.into())
    }
}

fn missing_game(event: GameEvent) -> ServiceError {
    InvalidTransition { from: None, event }.into()
}

fn parse_terms(args: &[String], max_currency_len: usize) -> Result<(Currency, Amount), Rejection> {
    // Tokens after the amount are ignored.
    let [currency, amount, ..] = args else {
        return Err(Rejection::StartUsage);
    };
    let currency = Currency::parse(currency, max_currency_len).ok_or(Rejection::StartUsage)?;
    let amount = Amount::parse(amount).ok_or(Rejection::StartUsage)?;
    Ok((currency, amount))
}
