use super::room::{RoomTitle, TeamTitle};
use reqwest::StatusCode;
use std::{fmt, io, path::PathBuf};
use url::Url;

/// Sum type representing every possible unexceptional fail state when talking
/// to Webex.
#[derive(Debug)]
pub enum WebexError {
    /// Transport failure; we never got a response.
    APIRequestFailed(reqwest::Error),
    /// Webex answered with a non-2xx status.
    APIResponseError {
        status: StatusCode,
        message: String,
        tracking_id: Option<String>,
    },
    /// Webex answered with a 2xx status but a body we couldn't make sense of.
    APIResponseParseFailed(serde_json::Error),
    /// A pagination link that points away from the API.
    ForeignPageLink(Url),
    UnknownTeam(TeamTitle),
    RoomCreationFailed {
        title: RoomTitle,
        source: Box<WebexError>,
    },
    FileUnreadable {
        path: PathBuf,
        source: io::Error,
    },
}

impl From<reqwest::Error> for WebexError {
    fn from(e: reqwest::Error) -> Self {
        WebexError::APIRequestFailed(e)
    }
}

impl From<serde_json::Error> for WebexError {
    fn from(e: serde_json::Error) -> Self {
        WebexError::APIResponseParseFailed(e)
    }
}

impl fmt::Display for WebexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            WebexError::APIRequestFailed(e) => format!("Webex API request failed: {}", e),
            WebexError::APIResponseError {
                status,
                message,
                tracking_id: Some(id),
            } => format!("Webex API returned {}: {} (tracking ID {})", status, message, id),
            WebexError::APIResponseError {
                status, message, ..
            } => format!("Webex API returned {}: {}", status, message),
            WebexError::APIResponseParseFailed(e) => {
                format!("Webex API response could not be parsed: {}", e)
            }
            WebexError::ForeignPageLink(u) => {
                format!("Webex API sent a pagination link to another origin: {}", u)
            }
            WebexError::UnknownTeam(t) => format!("Cannot find team >>{}<<", t),
            WebexError::RoomCreationFailed { title, source } => {
                format!("Cannot create room >>{}<<: {}", title, source)
            }
            WebexError::FileUnreadable { path, source } => {
                format!("Cannot read file {}: {}", path.display(), source)
            }
        };

        write!(f, "{}", x)
    }
}
