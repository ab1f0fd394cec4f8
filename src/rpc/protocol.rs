//! Text control protocol.
//!
//! | Request                      | Command                          |
//! |------------------------------|----------------------------------|
//! | `frequency:<n>`              | set frequency                    |
//! | `mode:<0\|1\|manual\|auto>`  | set mode                         |
//! | `get:<attribute>`            | read one attribute               |
//! | `get:status` / `status`      | read everything + health flags   |
//! | `increase` / `decrease`      | ±1 Hz (MANUAL)                   |
//! | `reset`                      | back to 2 Hz (MANUAL)            |
//! | `toggle`                     | flip MANUAL/AUTO                 |
//!
//! Replies are one line: `ok <name>=<value>[ ...]` or `err <reason>`.

use core::fmt::Write;

use heapless::String;

use crate::app::commands::ControlCommand;
use crate::app::service::Reply;
use crate::error::{Error, ProtocolError, Result};
use crate::store::{Attribute, Mode};

/// Longest reply line, terminator included.
pub const MAX_REPLY: usize = 96;

pub type ReplyLine = String<MAX_REPLY>;

/// Parse one request line (without its terminator).
pub fn parse_command(line: &str) -> Result<ControlCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty.into());
    }

    let (verb, arg) = match line.split_once(':') {
        Some((verb, arg)) => (verb.trim(), Some(arg.trim())),
        None => (line, None),
    };

    if let Some(cmd) = parse_action(verb) {
        return match arg {
            None => Ok(cmd),
            Some(_) => Err(ProtocolError::InvalidValue.into()),
        };
    }

    if verb.eq_ignore_ascii_case("get") {
        let arg = arg.filter(|a| !a.is_empty()).ok_or(ProtocolError::MissingValue)?;
        if arg.eq_ignore_ascii_case("status") {
            return Ok(ControlCommand::Status);
        }
        return Ok(ControlCommand::Get(arg.parse()?));
    }

    let attribute: Attribute = verb
        .parse()
        .map_err(|_| Error::Protocol(ProtocolError::UnknownCommand))?;
    let arg = arg.filter(|a| !a.is_empty()).ok_or(ProtocolError::MissingValue)?;
    match attribute {
        Attribute::Frequency => {
            let value: i32 = arg.parse().map_err(|_| ProtocolError::InvalidValue)?;
            Ok(ControlCommand::SetFrequency(value))
        }
        Attribute::Mode => Ok(ControlCommand::SetMode(arg.parse::<Mode>()?)),
        Attribute::Temperature => Err(Error::AccessDenied(attribute.name())),
    }
}

fn parse_action(verb: &str) -> Option<ControlCommand> {
    const ACTIONS: [(&str, ControlCommand); 5] = [
        ("increase", ControlCommand::IncreaseFrequency),
        ("decrease", ControlCommand::DecreaseFrequency),
        ("reset", ControlCommand::ResetFrequency),
        ("toggle", ControlCommand::ToggleMode),
        ("status", ControlCommand::Status),
    ];
    ACTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(verb))
        .map(|(_, cmd)| *cmd)
}

/// Render a successful reply, newline included.
pub fn format_reply(reply: &Reply) -> ReplyLine {
    let mut out = ReplyLine::new();
    // Every variant fits in MAX_REPLY.
    let _ = match reply {
        Reply::Value(Attribute::Mode, value) => match Mode::from_value(*value) {
            Ok(mode) => writeln!(out, "ok mode={mode}"),
            Err(_) => writeln!(out, "ok mode={value}"),
        },
        Reply::Value(attribute, value) => writeln!(out, "ok {attribute}={value}"),
        Reply::Status {
            snapshot,
            health_flags,
        } => writeln!(
            out,
            "ok frequency={} mode={} temperature={} health={}",
            snapshot.frequency, snapshot.mode, snapshot.temperature, health_flags
        ),
        Reply::Ignored(mode) => writeln!(out, "err ignored in {mode} mode"),
    };
    out
}

/// Render an error reply, newline included.
pub fn format_error(error: &Error) -> ReplyLine {
    let mut out = ReplyLine::new();
    let _ = match error {
        // Drop the "protocol: " prefix on the wire.
        Error::Protocol(e) => writeln!(out, "err {e}"),
        e => writeln!(out, "err {e}"),
    };
    out
}
