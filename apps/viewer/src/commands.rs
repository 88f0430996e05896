use std::str::FromStr;

use model::{CameraMode, CameraModeError, Color, ColorError};

use crate::config::{ViewKind, ViewKindError};

/// One line typed on stdin.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Circuit(String),
    Camera(CameraMode),
    Color(Color),
    View(ViewKind),
    Play,
    Pause,
    Toggle,
    /// Read-only; answered without waiting for a frame.
    List,
    Describe,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArg(&'static str),
    #[error(transparent)]
    Camera(#[from] CameraModeError),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    View(#[from] ViewKindError),
}

impl Command {
    /// Whether this can be answered straight away from the input thread.
    pub fn is_query(&self) -> bool {
        matches!(self, Command::List | Command::Describe)
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(CommandError::Empty);
        };
        let arg = parts.next();
        let cmd = match head.to_ascii_lowercase().as_str() {
            "circuit" | "c" => Command::Circuit(arg.ok_or(CommandError::MissingArg("circuit"))?.to_string()),
            "camera" | "cam" => Command::Camera(arg.ok_or(CommandError::MissingArg("camera"))?.parse()?),
            "color" | "colour" => Command::Color(Color::from_hex(arg.ok_or(CommandError::MissingArg("color"))?)?),
            "view" => Command::View(arg.ok_or(CommandError::MissingArg("view"))?.parse()?),
            "play" => Command::Play,
            "pause" => Command::Pause,
            "toggle" | "space" => Command::Toggle,
            "list" | "ls" => Command::List,
            "describe" | "info" => Command::Describe,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(cmd)
    }
}
