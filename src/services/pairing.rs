//! Secret Santa draw: reachability probing, cycle assignment and giver notification.

use futures::future::join_all;
use rand::{Rng, seq::SliceRandom};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    gateway::PrivateDelivery,
    services::{directory, messages, outbox},
    state::{
        SharedState,
        game::{Game, Participant},
    },
};

/// One giver paired with the participant they gift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Participant buying the gift.
    pub giver: Participant,
    /// Participant receiving it.
    pub recipient: Participant,
}

/// Details of a completed draw.
#[derive(Debug, Clone, Default)]
pub struct DistributionReport {
    /// One entry per reachable participant.
    pub assignments: Vec<Assignment>,
    /// Participants left out because the bot cannot message them.
    pub unreachable: Vec<Participant>,
    /// Givers whose assignment message was not delivered.
    pub failed_givers: Vec<Participant>,
}

/// Result of [`distribute`].
#[derive(Debug, Clone)]
pub enum DistributionOutcome {
    /// Pairs were drawn; see the report for partial failures.
    Success(DistributionReport),
    /// Fewer than two participants joined; nothing was sent.
    InsufficientParticipants,
    /// Fewer than two participants can be reached privately; no pairs were drawn.
    InsufficientReachableParticipants {
        /// Participants the bot could not message.
        unreachable: Vec<Participant>,
    },
}

/// Shuffle `participants` and pair each one with the next, wrapping around.
///
/// The result is a single cycle through everyone, so nobody gifts themselves. Fewer than two
/// participants yield no assignments.
pub fn build_cycle<R: Rng + ?Sized>(
    mut participants: Vec<Participant>,
    rng: &mut R,
) -> Vec<Assignment> {
    let count = participants.len();
    if count < 2 {
        return Vec::new();
    }
    participants.shuffle(rng);
    (0..count)
        .map(|index| Assignment {
            giver: participants[index].clone(),
            recipient: participants[(index + 1) % count].clone(),
        })
        .collect()
}

/// Draw pairs among the reachable participants of `game` and notify every giver privately.
///
/// Unreachable participants and per-giver delivery failures are reported to the group and
/// never abort the draw.
pub async fn distribute(
    state: &SharedState,
    game: &Game,
) -> Result<DistributionOutcome, ServiceError> {
    let chat_id = game.chat_id;
    let participants = directory::list(state, chat_id).await?;
    if participants.len() < 2 {
        debug!(chat_id, count = participants.len(), "not enough participants to draw");
        return Ok(DistributionOutcome::InsufficientParticipants);
    }

    let probes = join_all(participants.iter().map(|p| is_reachable(state, p))).await;
    let (reachable, unreachable): (Vec<_>, Vec<_>) = participants
        .into_iter()
        .zip(probes)
        .partition(|(_, reachable)| *reachable);
    let reachable: Vec<Participant> = reachable.into_iter().map(|(p, _)| p).collect();
    let unreachable: Vec<Participant> = unreachable.into_iter().map(|(p, _)| p).collect();

    if !unreachable.is_empty() {
        for participant in &unreachable {
            warn!(chat_id, person_id = participant.telegram_id, "participant unreachable");
        }
        outbox::send_group(state, chat_id, messages::unreachable_warning(&unreachable), None)
            .await;
    }

    if reachable.len() < 2 {
        info!(
            chat_id,
            reachable = reachable.len(),
            "not enough reachable participants to draw"
        );
        return Ok(DistributionOutcome::InsufficientReachableParticipants { unreachable });
    }

    let assignments = {
        let mut rng = rand::rng();
        build_cycle(reachable, &mut rng)
    };

    let deliveries = join_all(
        assignments
            .iter()
            .map(|assignment| notify_giver(state, game, assignment)),
    )
    .await;
    let failed_givers: Vec<Participant> = assignments
        .iter()
        .zip(deliveries)
        .filter(|(_, delivered)| !delivered)
        .map(|(assignment, _)| assignment.giver.clone())
        .collect();

    for giver in &failed_givers {
        outbox::send_group(state, chat_id, messages::delivery_failed(giver), None).await;
    }

    info!(
        chat_id,
        pairs = assignments.len(),
        unreachable = unreachable.len(),
        failed = failed_givers.len(),
        "secret santa draw finished"
    );
    Ok(DistributionOutcome::Success(DistributionReport {
        assignments,
        unreachable,
        failed_givers,
    }))
}

/// Reachable when a delivery record exists, otherwise when a probe message gets through.
async fn is_reachable(state: &SharedState, participant: &Participant) -> bool {
    let person_id = participant.telegram_id;
    match directory::has_received_private_message(state, person_id).await {
        Ok(true) => return true,
        Ok(false) => {}
        Err(err) => warn!(person_id, error = %err, "delivery record lookup failed; probing"),
    }

    match outbox::send_private(state, person_id, messages::reachability_probe()).await {
        PrivateDelivery::Delivered => {
            record_delivery(state, person_id).await;
            true
        }
        PrivateDelivery::Blocked => false,
        PrivateDelivery::Failed(reason) => {
            warn!(person_id, %reason, "reachability probe failed");
            false
        }
    }
}

async fn notify_giver(state: &SharedState, game: &Game, assignment: &Assignment) -> bool {
    let person_id = assignment.giver.telegram_id;
    let text = messages::assignment(&assignment.recipient, game);
    match outbox::send_private(state, person_id, text).await {
        PrivateDelivery::Delivered => {
            record_delivery(state, person_id).await;
            true
        }
        PrivateDelivery::Blocked => {
            warn!(chat_id = game.chat_id, person_id, "giver blocked the bot");
            false
        }
        PrivateDelivery::Failed(reason) => {
            warn!(chat_id = game.chat_id, person_id, %reason, "failed to notify giver");
            false
        }
    }
}

async fn record_delivery(state: &SharedState, person_id: i64) {
    if let Err(err) = directory::mark_received(state, person_id).await {
        warn!(person_id, error = %err, "failed to record private delivery");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        time::{Duration, SystemTime},
    };

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        config::AppConfig,
        services::testing::{group_game, test_state, test_state_with},
    };

    fn participant(id: i64, handle: &str) -> Participant {
        Participant {
            telegram_id: id,
            handle: Some(handle.into()),
            joined_at: SystemTime::now(),
        }
    }

    fn assert_single_cycle(assignments: &[Assignment], expected: usize) {
        assert_eq!(assignments.len(), expected);
        let givers: HashSet<i64> = assignments.iter().map(|a| a.giver.telegram_id).collect();
        let recipients: HashSet<i64> =
            assignments.iter().map(|a| a.recipient.telegram_id).collect();
        assert_eq!(givers.len(), expected);
        assert_eq!(givers, recipients);
        assert!(
            assignments
                .iter()
                .all(|a| a.giver.telegram_id != a.recipient.telegram_id)
        );

        let start = assignments[0].giver.telegram_id;
        let mut current = start;
        for step in 1..=expected {
            current = assignments
                .iter()
                .find(|a| a.giver.telegram_id == current)
                .map(|a| a.recipient.telegram_id)
                .unwrap();
            if current == start {
                assert_eq!(step, expected, "cycle closed early");
            }
        }
        assert_eq!(current, start);
    }

    #[test]
    fn two_participants_gift_each_other() {
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignments =
                build_cycle(vec![participant(1, "@a"), participant(2, "@b")], &mut rng);
            assert_single_cycle(&assignments, 2);
        }
    }

    #[test]
    fn larger_draws_form_one_cycle_without_self_gifts() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let people = (1..=7).map(|id| participant(id, &format!("@p{id}"))).collect();
            assert_single_cycle(&build_cycle(people, &mut rng), 7);
        }
    }

    #[test]
    fn fewer_than_two_yield_nothing() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(build_cycle(Vec::new(), &mut rng).is_empty());
        assert!(build_cycle(vec![participant(1, "@solo")], &mut rng).is_empty());
    }

    #[tokio::test]
    async fn single_participant_is_insufficient_and_silent() {
        let (state, gateway) = test_state().await;
        let game = group_game(&state, -100).await;
        directory::join(&state, -100, 1, Some("@solo".into()))
            .await
            .unwrap();

        let outcome = distribute(&state, &game).await.unwrap();
        assert!(matches!(outcome, DistributionOutcome::InsufficientParticipants));
        assert!(gateway.private_attempts().is_empty());
    }

    #[tokio::test]
    async fn three_reachable_participants_are_notified_once_each() {
        let (state, gateway) = test_state().await;
        let game = group_game(&state, -100).await;
        for (id, handle) in [(1, "@alice"), (2, "@bob"), (3, "@carol")] {
            directory::join(&state, -100, id, Some(handle.into()))
                .await
                .unwrap();
            directory::mark_received(&state, id).await.unwrap();
        }

        let DistributionOutcome::Success(report) = distribute(&state, &game).await.unwrap()
        else {
            panic!("expected a successful draw");
        };
        assert_single_cycle(&report.assignments, 3);
        assert!(report.unreachable.is_empty());
        assert!(report.failed_givers.is_empty());

        for assignment in &report.assignments {
            let texts = gateway.delivered_to(assignment.giver.telegram_id);
            assert_eq!(texts.len(), 1, "no probe for known participants");
            assert!(texts[0].contains(&assignment.recipient.mention()));
            assert!(texts[0].contains("20 USD"));
        }
    }

    #[tokio::test]
    async fn probes_unknown_participants_and_records_them() {
        let (state, gateway) = test_state().await;
        let game = group_game(&state, -100).await;
        directory::join(&state, -100, 1, Some("@alice".into()))
            .await
            .unwrap();
        directory::join(&state, -100, 2, Some("@bob".into()))
            .await
            .unwrap();

        let outcome = distribute(&state, &game).await.unwrap();
        assert!(matches!(outcome, DistributionOutcome::Success(_)));
        assert_eq!(gateway.delivered_to(1).len(), 2);
        assert!(directory::has_received_private_message(&state, 1).await.unwrap());
        assert!(directory::has_received_private_message(&state, 2).await.unwrap());
    }

    #[tokio::test]
    async fn all_but_one_unreachable_aborts_after_warning() {
        let (state, gateway) = test_state().await;
        let game = group_game(&state, -100).await;
        for (id, handle) in [(1, "@alice"), (2, "@bob"), (3, "@carol")] {
            directory::join(&state, -100, id, Some(handle.into()))
                .await
                .unwrap();
        }
        gateway.block(2);
        gateway.fail(3);

        let outcome = distribute(&state, &game).await.unwrap();
        let DistributionOutcome::InsufficientReachableParticipants { unreachable } = outcome else {
            panic!("expected an aborted draw");
        };
        assert_eq!(unreachable.len(), 2);

        let warning = gateway.last_group_text(-100);
        assert!(warning.contains("@bob"));
        assert!(warning.contains("@carol"));
        assert!(!warning.contains("@alice"));
        let alice = gateway.delivered_to(1);
        assert_eq!(alice, vec![messages::reachability_probe()]);
    }

    #[tokio::test]
    async fn failed_giver_is_reported_without_aborting() {
        let (state, gateway) = test_state().await;
        let game = group_game(&state, -100).await;
        for (id, handle) in [(1, "@alice"), (2, "@bob"), (3, "@carol")] {
            directory::join(&state, -100, id, Some(handle.into()))
                .await
                .unwrap();
        }
        gateway.block_after(2, 1);

        let DistributionOutcome::Success(report) = distribute(&state, &game).await.unwrap()
        else {
            panic!("expected a successful draw");
        };
        assert_eq!(report.assignments.len(), 3);
        assert_eq!(report.failed_givers.len(), 1);
        assert_eq!(report.failed_givers[0].telegram_id, 2);
        assert_eq!(gateway.delivered_to(1).len(), 2);
        assert_eq!(gateway.delivered_to(3).len(), 2);
        assert!(
            gateway
                .group_texts(-100)
                .contains(&messages::delivery_failed(&report.failed_givers[0]))
        );
    }

    #[tokio::test]
    async fn giver_that_never_answers_times_out_as_failed() {
        let config = AppConfig {
            send_timeout: Duration::from_millis(50),
            ..AppConfig::default()
        };
        let (state, gateway) = test_state_with(config).await;
        let game = group_game(&state, -100).await;
        for (id, handle) in [(1, "@alice"), (2, "@bob"), (3, "@carol")] {
            directory::join(&state, -100, id, Some(handle.into()))
                .await
                .unwrap();
            directory::mark_received(&state, id).await.unwrap();
        }
        gateway.hang(2);

        let outcome = tokio::time::timeout(Duration::from_secs(5), distribute(&state, &game))
            .await
            .expect("a hanging send must not stall the draw")
            .unwrap();
        let DistributionOutcome::Success(report) = outcome else {
            panic!("expected a successful draw");
        };
        let failed: Vec<i64> = report.failed_givers.iter().map(|p| p.telegram_id).collect();
        assert_eq!(failed, vec![2]);
        assert_eq!(gateway.delivered_to(1).len(), 1);
        assert_eq!(gateway.delivered_to(3).len(), 1);
        assert!(gateway.delivered_to(2).is_empty());
    }
}
