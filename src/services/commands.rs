//! Parsing of slash commands out of inbound message text.

/// Command recognised in a message, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`; groups expect `<currency> <amount>` as arguments.
    Start {
        /// Whitespace-separated tokens after the command.
        args: Vec<String>,
    },
    /// `/join`.
    Join,
    /// `/stop`.
    Stop,
    /// `/reset`.
    Reset,
    /// `/info`.
    Info,
    /// Any other token starting with `/`, case-folded and without bot suffix.
    Unknown(String),
}

/// Extract the command from a message.
///
/// Returns `None` for plain text and for commands addressed to another bot
/// (`/start@other_bot`) when the bot's own username is known.
pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let mut tokens = text.split_whitespace();
    let head = tokens.next()?.to_lowercase();
    let name = head.strip_prefix('/')?;

    let name = match name.split_once('@') {
        Some((name, target)) => {
            if let Some(own) = bot_username {
                if !target.eq_ignore_ascii_case(own) {
                    return None;
                }
            }
            name
        }
        None => name,
    };

    let command = match name {
        "start" => Command::Start {
            args: tokens.map(str::to_owned).collect(),
        },
        "join" => Command::Join,
        "stop" => Command::Stop,
        "reset" => Command::Reset,
        "info" => Command::Info,
        other => Command::Unknown(other.to_owned()),
    };
    Some(command)
}
