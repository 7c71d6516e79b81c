//! Command surface
//!
//! The host forwards argument strings from its terminal/toolbar; this
//! module parses them into lifecycle commands.

use thiserror::Error;

/// A parsed lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start the main job task.
    Start,
    /// Stop the main job and any transition.
    Stop,
    /// Toggle: cancel a running transition, otherwise toggle the main job.
    Toggle,
    /// Run the ad-hoc transition to the Home endpoint.
    GoHome,
    /// Run the ad-hoc transition to the Work endpoint.
    GoWork,
    /// Reset the persisted job to defaults.
    Reset,
    /// Toggle path recording.
    Record,
    RecordStart,
    RecordStop,
    /// Queue a manual undock release.
    Undock,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("unknown switch for {command}: -{switch}")]
    UnknownSwitch { command: &'static str, switch: String },
}

impl Command {
    /// Parse an argument string such as `toggle -start` or `record -stop`.
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        let mut parts = input.split_whitespace();
        let head = parts.next().ok_or(CommandError::Empty)?.to_lowercase();
        let switch = parts
            .next()
            .and_then(|s| s.strip_prefix('-'))
            .map(str::to_lowercase);

        match (head.as_str(), switch.as_deref()) {
            ("start", _) => Ok(Command::Start),
            ("stop", _) => Ok(Command::Stop),
            ("toggle", None) => Ok(Command::Toggle),
            ("toggle", Some("start")) => Ok(Command::Start),
            ("toggle", Some("stop")) => Ok(Command::Stop),
            ("toggle", Some(other)) => Err(CommandError::UnknownSwitch {
                command: "toggle",
                switch: other.to_string(),
            }),
            ("go_home", _) => Ok(Command::GoHome),
            ("go_work", _) => Ok(Command::GoWork),
            ("reset", _) => Ok(Command::Reset),
            ("record", None) => Ok(Command::Record),
            ("record", Some("start")) => Ok(Command::RecordStart),
            ("record", Some("stop")) => Ok(Command::RecordStop),
            ("record", Some(other)) => Err(CommandError::UnknownSwitch {
                command: "record",
                switch: other.to_string(),
            }),
            ("undock", _) => Ok(Command::Undock),
            _ => Err(CommandError::Unknown(head)),
        }
    }
}
