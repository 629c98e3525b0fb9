//! Runs a command's work under the chat lock against a validated plan.

use std::future::Future;

use tracing::debug;

use crate::{
    error::ServiceError,
    state::{
        SharedState,
        game::Game,
        state_machine::{GameEvent, GameStateMachine, Plan},
    },
};

/// Plan `event` against the chat's stored game and run `work` with the validated plan.
///
/// The chat stays locked for the whole call, so the phase `work` observes cannot change
/// underneath it. `work` is responsible for persisting the planned target; an invalid
/// transition is returned as a rejection without calling it.
pub async fn run_transition<F, Fut, T>(
    state: &SharedState,
    chat_id: i64,
    event: GameEvent,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(Option<Game>, Plan) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let _gate = state.lock_chat(chat_id).await;
    let game = state.load_game(chat_id).await?;
    let machine = GameStateMachine::new(game.as_ref().map(|game| game.phase));
    let plan = machine.plan(event)?;

    debug!(
        chat_id,
        event = ?plan.event,
        from = ?plan.from,
        to = ?plan.target(),
        "running planned transition"
    );
    work(game, plan).await
}
