//! Command-line parsing.
//!
//! ```text
//! appstore-orchestrator [run]
//! appstore-orchestrator check <app-id>
//! appstore-orchestrator messages <app-id> [--limit N] [--offset N]
//! appstore-orchestrator help
//! ```

use thiserror::Error;

/// Default page size for `messages`.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 20;

/// Error parsing CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    /// Unknown command.
    #[error("Unknown command: '{0}'. Use 'help' for available commands.")]
    UnknownCommand(String),
    /// Unknown flag.
    #[error("Unknown flag: '{0}'")]
    UnknownFlag(String),
    /// Missing value for flag or argument.
    #[error("Missing value for '{0}'")]
    MissingValue(String),
    /// Invalid value for flag.
    #[error("Invalid value '{value}' for '{flag}'")]
    InvalidValue {
        /// The flag with the invalid value.
        flag: String,
        /// The invalid value that was provided.
        value: String,
    },
}

/// Orchestrator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run periodic checks for every app until interrupted.
    Run,

    /// Run one check cycle for one app.
    Check {
        /// App to check.
        app_id: String,
    },

    /// Print an app's audit trail, newest first.
    Messages {
        /// App whose messages to list.
        app_id: String,
        /// Maximum number of messages.
        limit: u32,
        /// Messages to skip.
        offset: u32,
    },

    /// Print usage.
    Help,
}

impl Command {
    /// Parse a command from the arguments after the program name.
    ///
    /// No arguments means [`Command::Run`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandParseError`] for unknown commands or flags and for
    /// missing or non-numeric values.
    pub fn parse(args: &[String]) -> Result<Self, CommandParseError> {
        let Some(first) = args.first() else {
            return Ok(Self::Run);
        };

        let cmd = first.to_lowercase();
        match cmd.as_str() {
            "run" => match args.get(1) {
                Some(extra) => Err(CommandParseError::UnknownFlag(extra.clone())),
                None => Ok(Self::Run),
            },

            "check" => {
                let app_id = args
                    .get(1)
                    .ok_or_else(|| CommandParseError::MissingValue("app_id".into()))?;
                Ok(Self::Check {
                    app_id: app_id.clone(),
                })
            }

            "messages" | "msgs" => {
                let app_id = args
                    .get(1)
                    .filter(|a| !a.starts_with('-'))
                    .ok_or_else(|| CommandParseError::MissingValue("app_id".into()))?
                    .clone();
                let mut limit = DEFAULT_MESSAGE_LIMIT;
                let mut offset = 0;

                let mut i = 2;
                while i < args.len() {
                    match args[i].as_str() {
                        "--limit" | "-l" => {
                            i += 1;
                            limit = parse_number(args.get(i), "--limit")?;
                        }
                        "--offset" | "-o" => {
                            i += 1;
                            offset = parse_number(args.get(i), "--offset")?;
                        }
                        _ => {
                            return Err(CommandParseError::UnknownFlag(args[i].clone()));
                        }
                    }
                    i += 1;
                }

                Ok(Self::Messages {
                    app_id,
                    limit,
                    offset,
                })
            }

            "help" | "--help" | "-h" => Ok(Self::Help),

            _ => Err(CommandParseError::UnknownCommand(cmd)),
        }
    }
}

fn parse_number(value: Option<&String>, flag: &str) -> Result<u32, CommandParseError> {
    let value = value.ok_or_else(|| CommandParseError::MissingValue(flag.into()))?;
    value.parse().map_err(|_| CommandParseError::InvalidValue {
        flag: flag.into(),
        value: value.clone(),
    })
}

/// Usage text.
#[must_use]
pub const fn help_text() -> &'static str {
    r"appstore-orchestrator - health monitoring for self-hosted apps

USAGE:
    appstore-orchestrator [COMMAND]

COMMANDS:
    run                           Check every app periodically until Ctrl-C (default)
    check <app-id>                Run one check cycle for an app
    messages <app-id> [OPTIONS]   Print the app's audit trail as JSON lines
        -l, --limit <N>           Maximum messages to print (default 20)
        -o, --offset <N>          Messages to skip
    help                          Show this text

Configuration is read from the environment and an optional .env file."
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_args_runs() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Run);
        assert_eq!(Command::parse(&args(&["RUN"])).unwrap(), Command::Run);
    }

    #[test]
    fn test_parse_check() {
        assert_eq!(
            Command::parse(&args(&["check", "nextcloud"])).unwrap(),
            Command::Check {
                app_id: "nextcloud".into()
            }
        );
        assert_eq!(
            Command::parse(&args(&["check"])).unwrap_err(),
            CommandParseError::MissingValue("app_id".into())
        );
    }

    #[test]
    fn test_parse_messages_defaults() {
        assert_eq!(
            Command::parse(&args(&["messages", "nextcloud"])).unwrap(),
            Command::Messages {
                app_id: "nextcloud".into(),
                limit: DEFAULT_MESSAGE_LIMIT,
                offset: 0
            }
        );
    }

    #[test]
    fn test_parse_messages_with_options() {
        assert_eq!(
            Command::parse(&args(&["messages", "gitea", "--limit", "5", "-o", "10"])).unwrap(),
            Command::Messages {
                app_id: "gitea".into(),
                limit: 5,
                offset: 10
            }
        );
    }

    #[test]
    fn test_parse_messages_errors() {
        assert_eq!(
            Command::parse(&args(&["messages", "--limit", "5"])).unwrap_err(),
            CommandParseError::MissingValue("app_id".into())
        );
        assert_eq!(
            Command::parse(&args(&["messages", "gitea", "--limit"])).unwrap_err(),
            CommandParseError::MissingValue("--limit".into())
        );
        assert_eq!(
            Command::parse(&args(&["messages", "gitea", "--limit", "-1"])).unwrap_err(),
            CommandParseError::InvalidValue {
                flag: "--limit".into(),
                value: "-1".into()
            }
        );
        assert_eq!(
            Command::parse(&args(&["messages", "gitea", "--verbose"])).unwrap_err(),
            CommandParseError::UnknownFlag("--verbose".into())
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse(&args(&["Deploy"])).unwrap_err();
        assert_eq!(err, CommandParseError::UnknownCommand("deploy".into()));
        assert!(err.to_string().contains("help"));
    }

    #[test]
    fn test_help() {
        assert_eq!(Command::parse(&args(&["--help"])).unwrap(), Command::Help);
        assert!(help_text().contains("messages <app-id>"));
    }
}
