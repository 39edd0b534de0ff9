//! Interactive commands read from stdin.

use session_state_sync::LifecycleSignal;
use std::str::FromStr;
use thiserror::Error;

/// One line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward a host lifecycle signal.
    Lifecycle(LifecycleSignal),
    SignIn(String),
    SignOut,
    /// Invalidate the session on the simulated backend.
    Revoke,
    Offline(bool),
    Refetch,
    State,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty input")]
    Empty,
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("`signin` needs a user id")]
    MissingUser,
}

pub const HELP: &str = "\
commands:
  resume | inactive | pause | hide | detach   lifecycle signals
  signin <user>                               sign in
  signout                                     sign out locally
  revoke                                      invalidate session on the backend
  offline | online                            toggle backend reachability
  refetch                                     refetch now
  state                                       print the current state
  quit";

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseCommandError::Empty);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "resume" | "resumed" | "fg" => Command::Lifecycle(LifecycleSignal::Resumed),
            "inactive" => Command::Lifecycle(LifecycleSignal::Inactive),
            "pause" | "paused" | "bg" => Command::Lifecycle(LifecycleSignal::Paused),
            "hide" | "hidden" => Command::Lifecycle(LifecycleSignal::Hidden),
            "detach" | "detached" => Command::Lifecycle(LifecycleSignal::Detached),
            "signin" | "login" => {
                let user = words.next().ok_or(ParseCommandError::MissingUser)?;
                Command::SignIn(user.to_string())
            }
            "signout" | "logout" => Command::SignOut,
            "revoke" => Command::Revoke,
            "offline" => Command::Offline(true),
            "online" => Command::Offline(false),
            "refetch" => Command::Refetch,
            "state" | "status" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
