//! Post markdown messages to a Webex room or person, optionally carrying a
//! card or a file, and delete them again.
//!
//! See [Draft] for what can be sent.

use super::{api::*, error::WebexError, room::*};
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::{fmt, path::Path, path::PathBuf};
use tracing::{debug, info};
use url::Url;

/// The opaque ID Webex hands out for a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        MessageId(s)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a message ends up. Messages to a person land in the direct room
/// Webex keeps between us and them, so there's nothing to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Room(RoomId),
    Person(String),
}

/// What rides along with the markdown. At most one of these is sent.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Plain,
    /// An adaptive card, passed through as given.
    Card(Value),
    File(PathBuf),
}

/// A message that hasn't been sent yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    pub markdown: String,
    pub payload: Payload,
}

/// <https://developer.webex.com/docs/api/v1/messages/get-message-details>
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(deserialize_with = "crate::de::non_empty")]
    pub id: MessageId,
    pub room_id: RoomId,
    pub room_type: RoomType,
    pub text: Option<String>,
    pub markdown: Option<String>,
    pub html: Option<String>,
    #[serde(default)]
    pub files: Vec<Url>,
    pub person_id: Option<String>,
    pub person_email: Option<String>,
    pub created: DateTime<Utc>,
}

/// <https://developer.webex.com/docs/api/v1/messages/create-a-message>
#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    room_id: Option<&'a RoomId>,
    to_person_email: Option<&'a str>,
    markdown: &'a str,
    attachments: Option<[&'a Value; 1]>,
}

impl<'a> CreateRequest<'a> {
    fn new(to: &'a Recipient, markdown: &'a str, card: Option<&'a Value>) -> Self {
        let (room_id, to_person_email) = match to {
            Recipient::Room(id) => (Some(id), None),
            Recipient::Person(email) => (None, Some(email.as_str())),
        };

        CreateRequest {
            room_id,
            to_person_email,
            markdown,
            attachments: card.map(|c| [c]),
        }
    }
}

impl WebexClient {
    /// Post a message, choosing the encoding from its payload.
    pub async fn send_message(
        &self,
        to: &Recipient,
        draft: &Draft,
    ) -> Result<Message, WebexError> {
        let req = match &draft.payload {
            Payload::Plain => {
                self.post_json("/messages", &CreateRequest::new(to, &draft.markdown, None))
            }
            Payload::Card(card) => self.post_json(
                "/messages",
                &CreateRequest::new(to, &draft.markdown, Some(card)),
            ),
            Payload::File(path) => {
                let form = build_form(to, &draft.markdown, path).await?;
                self.post("/messages").multipart(form)
            }
        };

        let msg: Message = fetch(req).await?;
        info!("Posted message {} at {}", msg.id, msg.created);

        Ok(msg)
    }

    /// Delete a message we, or anyone we moderate for, posted earlier.
    pub async fn delete_message(&self, id: &MessageId) -> Result<(), WebexError> {
        // Webex answers with an empty 204, so there's nothing to parse.
        execute(self.delete("messages", &id.0)).await?;
        info!("Deleted message {}", id);

        Ok(())
    }
}

/// Put together the multipart body for a file upload. The whole file is read
/// up front so that a missing file never costs a request.
async fn build_form(to: &Recipient, markdown: &str, path: &Path) -> Result<Form, WebexError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| WebexError::FileUnreadable {
            path: path.to_owned(),
            source,
        })?;

    let file_name = path
        .file_name()
        .map(|x| x.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_owned());
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    debug!("Attaching {} ({}, {} bytes)", file_name, mime, bytes.len());

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime.as_ref())?;

    let form = match to {
        Recipient::Room(id) => Form::new()
            .text("roomId", id.0.to_owned())
            .text("markdown", markdown.to_owned())
            .text("roomType", "group"),
        Recipient::Person(email) => Form::new()
            .text("toPersonEmail", email.to_owned())
            .text("markdown", markdown.to_owned()),
    };

    Ok(form.part("files", part))
}
