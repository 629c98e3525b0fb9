//! Lifecycle rules: which command applies in which phase.

use thiserror::Error;

/// Stored phases of a game.
///
/// A chat without a game row has no phase at all; closing registration goes straight to
/// [`GamePhase::Completed`] once pairs have been distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Participants may join; gift terms may change.
    Registration,
    /// Pairs were distributed and the participant set was cleared.
    Completed,
}

/// Commands that act on a chat's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Admin opens or reopens registration, possibly with new terms.
    Start,
    /// A person joins the registration.
    Join,
    /// Admin closes registration and distributes pairs.
    Stop,
    /// Admin deletes the game and its participants.
    Reset,
    /// Anyone lists the current participants.
    Info,
}

/// Effect a validated event has on the stored game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The game ends up in the given phase (created when it did not exist).
    Enter(GamePhase),
    /// The phase does not change.
    Stay,
    /// The game and its participants are removed.
    Delete,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase of the chat's game, `None` when no game is registered.
    pub from: Option<GamePhase>,
    /// The rejected event.
    pub event: GameEvent,
}

/// A transition that has been validated against the current phase but not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// Phase before the event.
    pub from: Option<GamePhase>,
    /// Effect on the stored game.
    pub transition: Transition,
    /// The validated event.
    pub event: GameEvent,
}

impl Plan {
    /// Phase the game will be in once the plan is applied; `None` when it will not exist.
    pub fn target(&self) -> Option<GamePhase> {
        match self.transition {
            Transition::Enter(phase) => Some(phase),
            Transition::Stay => self.from,
            Transition::Delete => None,
        }
    }
}

/// Lifecycle rules of a single chat's game.
#[derive(Debug, Clone, Default)]
pub struct GameStateMachine {
    phase: Option<GamePhase>,
}

impl GameStateMachine {
    /// Machine positioned at the stored phase of a chat's game.
    pub fn new(phase: Option<GamePhase>) -> Self {
        Self { phase }
    }

    /// Validate `event` against the current phase.
    pub fn plan(&self, event: GameEvent) -> Result<Plan, InvalidTransition> {
        let transition = self.compute_transition(event)?;
        Ok(Plan {
            from: self.phase,
            transition,
            event,
        })
    }

    fn compute_transition(&self, event: GameEvent) -> Result<Transition, InvalidTransition> {
        use GamePhase::{Completed, Registration};

        let next = match (self.phase, event) {
            (None, GameEvent::Start) => Transition::Enter(Registration),
            (Some(Completed), GameEvent::Start) => Transition::Enter(Registration),
            (Some(Registration), GameEvent::Start) => Transition::Stay,
            (Some(Registration), GameEvent::Join) => Transition::Stay,
            (Some(Registration), GameEvent::Stop) => Transition::Enter(Completed),
            (Some(_), GameEvent::Reset) => Transition::Delete,
            (_, GameEvent::Info) => Transition::Stay,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
