use crate::webex::WebexError;
use std::{fmt, io};

/// Sum type representing every possible unexceptional fail state of a run.
#[derive(Debug)]
pub enum Failure {
    Config(ConfigError),
    Webex(WebexError),
}

/// Problems with what we were asked to do, caught before talking to Webex.
#[derive(Debug)]
pub enum ConfigError {
    MissingToken,
    MissingDestination,
    ConflictingDestination,
    MissingMessage,
    InvalidMessageId(String),
    UnreadableStdin(io::Error),
    InvalidAttachment(serde_json::Error),
    InvalidProxy { raw: String, reason: String },
    InvalidAPIBase { raw: String, reason: String },
    ClientBuildFailed(reqwest::Error),
}

impl From<ConfigError> for Failure {
    fn from(e: ConfigError) -> Self {
        Failure::Config(e)
    }
}

impl From<WebexError> for Failure {
    fn from(e: WebexError) -> Self {
        Failure::Webex(e)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Config(e) => write!(f, "{}", e),
            Failure::Webex(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            ConfigError::MissingToken => "Missing Webex API token (flag -T)".into(),
            ConfigError::MissingDestination => {
                "Missing destination: supply a team and room (flags -t, -r) or a person (flag -D)"
                    .into()
            }
            ConfigError::ConflictingDestination => {
                "A person (flag -D) can't be combined with a team or room (flags -t, -r)".into()
            }
            ConfigError::MissingMessage => "Missing message text (flag -m or -i)".into(),
            ConfigError::InvalidMessageId(id) => {
                format!("Invalid message ID to delete (flag -d): >>{}<<", id)
            }
            ConfigError::UnreadableStdin(e) => format!("Cannot read message from stdin: {}", e),
            ConfigError::InvalidAttachment(e) => {
                format!("Card attachment is not valid JSON (flag -a): {}", e)
            }
            ConfigError::InvalidProxy { raw, reason } => {
                format!("Invalid proxy URL >>{}<<: {}", raw, reason)
            }
            ConfigError::InvalidAPIBase { raw, reason } => {
                format!("Invalid API base URL >>{}<<: {}", raw, reason)
            }
            ConfigError::ClientBuildFailed(e) => format!("Cannot build HTTP client: {}", e),
        };

        write!(f, "{}", x)
    }
}
