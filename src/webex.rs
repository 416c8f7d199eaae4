//! Supports posting markdown messages, cards, and files to Webex rooms, finding
//! or creating the room by title first.
//!
//! See [message::Draft] and [room].

pub mod api;
pub mod auth;
pub mod error;
pub mod message;
pub mod room;

pub use error::WebexError;
