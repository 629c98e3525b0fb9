//! User-facing texts sent to chats.

use crate::{
    error::Rejection,
    state::{
        game::{Game, Participant},
        state_machine::{GameEvent, GamePhase, InvalidTransition},
    },
};

/// Reply to `/start` in a private chat.
pub fn private_greeting(full_name: &str) -> String {
    let name = full_name.trim();
    let name = if name.is_empty() { "friend" } else { name };
    format!(
        "🎅 Hi, {name}! I am the Secret Santa bot! 🎁\n\n\
         Add me to a group chat and I will organize a Secret Santa exchange: \
         everyone joins, and once registration closes each participant privately \
         learns whom to surprise. 🎄"
    )
}

/// Reply to `/info` in a private chat.
pub fn private_info() -> String {
    "What can I do?\n\n\
     • Run a Secret Santa registration in a group chat.\n\
     • Randomly decide who gifts whom, and tell everyone privately. 🤫\n\n\
     Group commands:\n\
     /start <currency> <amount> - open registration (admins).\n\
     /join - join the registration.\n\
     /info - list participants.\n\
     /stop - close registration and distribute pairs (admins).\n\
     /reset - delete the game (admins).\n\n\
     Keep this private chat open so I can send you your assignment."
        .to_owned()
}

/// Unknown command in a private chat.
pub fn private_unknown() -> String {
    "❓ Unknown command. Try /start or /info.".to_owned()
}

/// Unknown command in a group.
pub fn group_unknown() -> String {
    "❓ Unknown command. Try /start, /join, /info, /stop or /reset.".to_owned()
}

/// Any command from a channel or unknown chat kind.
pub fn unsupported_chat() -> String {
    "⚠️ This bot does not support this type of chat.".to_owned()
}

/// Group command used in a private chat.
pub fn group_only() -> String {
    "⚠️ This command is only available in group chats.".to_owned()
}

/// Admin command used by a regular member.
pub fn not_admin() -> String {
    "❌ You need administrator rights to use this command.".to_owned()
}

/// Malformed `/start` arguments.
pub fn start_usage() -> String {
    "⚠️ Use the command as: /start <currency> <amount>\nExample: /start USD 20".to_owned()
}

fn terms(game: &Game) -> String {
    format!("💰 Gift amount: {} {}", game.amount, game.currency)
}

fn roster(participants: &[Participant]) -> String {
    participants
        .iter()
        .map(Participant::mention)
        .collect::<Vec<_>>()
        .join("\n")
}

/// First registration announcement of a chat.
pub fn registration_opened(game: &Game) -> String {
    format!(
        "✅ Chat registered!\n\n🎁 Registration is open!\n{}\n\nPress the button below to take part.",
        terms(game)
    )
}

/// Registration announcement after a completed game.
pub fn registration_reopened(game: &Game) -> String {
    format!(
        "✅ The previous game is over. A new registration starts now!\n{}\n\nPress the button below to take part.",
        terms(game)
    )
}

/// Answer to `/start` while registration is already open.
pub fn registration_status(game: &Game, participants: &[Participant]) -> String {
    let list = if participants.is_empty() {
        "❌ Nobody has registered yet.".to_owned()
    } else {
        format!("👥 Registered participants:\n{}", roster(participants))
    };
    format!(
        "{list}\n\n{}\n\nPress the button below to take part.",
        terms(game)
    )
}

/// Join confirmation with the current roster.
pub fn joined(mention: &str, game: &Game, participants: &[Participant]) -> String {
    format!(
        "✅ {mention}, you are registered!\n\n🎁 Game terms:\n{}\n\n👥 Participants:\n{}\n\nPress the button below to take part.",
        terms(game),
        roster(participants)
    )
}

/// Second join by the same person.
pub fn already_joined(mention: &str) -> String {
    format!("⚠️ {mention}, you are already registered.")
}

/// Asks a new participant to open a private chat with the bot.
pub fn dm_reminder(mention: &str, bot_username: Option<&str>) -> String {
    match bot_username {
        Some(bot) => format!(
            "⚠️ {mention}, please send /start to @{bot} in a private chat so I can send you your assignment!"
        ),
        None => format!(
            "⚠️ {mention}, please message me in a private chat so I can send you your assignment!"
        ),
    }
}

/// Command on a chat without a game.
pub fn not_registered() -> String {
    "⚠️ This chat has no game. Use /start <currency> <amount> first.".to_owned()
}

/// `/join` after the game completed.
pub fn registration_closed() -> String {
    "⚠️ Registration is closed. Use /start to begin a new game.".to_owned()
}

/// `/stop` after the game completed.
pub fn already_completed() -> String {
    "⚠️ The game is already over. Use /start to begin a new game.".to_owned()
}

/// `/stop` with fewer than two participants.
pub fn insufficient_participants() -> String {
    "❗ Not enough participants to distribute pairs (at least 2 are needed).".to_owned()
}

/// `/stop` with fewer than two reachable participants.
pub fn insufficient_reachable_participants() -> String {
    "❗ Not enough reachable participants to distribute pairs.".to_owned()
}

/// Lists participants left out of the draw.
pub fn unreachable_warning(participants: &[Participant]) -> String {
    let names = participants
        .iter()
        .map(Participant::mention)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "⚠️ I could not reach: {names}. Ask them to send /start to me in a private chat; they are left out of this round."
    )
}

/// A giver's assignment could not be delivered.
pub fn delivery_failed(giver: &Participant) -> String {
    format!(
        "⚠️ Could not notify {}. The bot may have been blocked.",
        giver.mention()
    )
}

/// Private message checking that a participant can be reached.
pub fn reachability_probe() -> String {
    "🎅 Checking that I can reach you for the Secret Santa draw.".to_owned()
}

/// Private message naming the giver's recipient.
pub fn assignment(recipient: &Participant, game: &Game) -> String {
    format!(
        "🎁 You are the Secret Santa of {}!\n{}",
        recipient.mention(),
        terms(game)
    )
}

/// Draw finished.
pub fn all_pairs_notified() -> String {
    "✅ All pairs are distributed and givers were notified privately!".to_owned()
}

/// Game closed after the draw.
pub fn game_completed() -> String {
    "🛑 Registration closed. Pairs are distributed and the game is complete.".to_owned()
}

/// The draw went out but the completed game could not be stored.
pub fn completion_not_saved() -> String {
    "⚠️ Pairs were sent, but I could not save that the game is over. \
     Registration still looks open; /reset clears it."
        .to_owned()
}

/// Answer to `/reset`.
pub fn reset_done() -> String {
    "🔄 Game reset. The chat and its participants were removed.".to_owned()
}

/// Answer to `/info` in a group.
pub fn participants_list(participants: &[Participant]) -> String {
    if participants.is_empty() {
        "❌ No participants found.".to_owned()
    } else {
        format!("👥 Participants:\n{}", roster(participants))
    }
}

/// Any command while the game store is down.
pub fn storage_unavailable() -> String {
    "⏳ The game storage is unavailable right now. Please try again later.".to_owned()
}

/// Unexpected failure while handling an update.
pub fn apology() -> String {
    "❌ Something went wrong. Please try again later.".to_owned()
}

/// Message explaining why a command was refused.
pub fn rejection(rejection: &Rejection) -> String {
    match rejection {
        Rejection::GroupOnly => group_only(),
        Rejection::UnsupportedChat => unsupported_chat(),
        Rejection::NotAdmin => not_admin(),
        Rejection::StartUsage => start_usage(),
        Rejection::Transition(invalid) => invalid_transition(invalid),
    }
}

fn invalid_transition(invalid: &InvalidTransition) -> String {
    match (invalid.from, invalid.event) {
        (None, _) => not_registered(),
        (Some(GamePhase::Completed), GameEvent::Join) => registration_closed(),
        (Some(GamePhase::Completed), GameEvent::Stop) => already_completed(),
        (Some(phase), event) => {
            format!("⚠️ /{} is not available while the game is {phase:?}.", command_name(event))
        }
    }
}

fn command_name(event: GameEvent) -> &'static str {
    match event {
        GameEvent::Start => "start",
        GameEvent::Join => "join",
        GameEvent::Stop => "stop",
        GameEvent::Reset => "reset",
        GameEvent::Info => "info",
    }
}
