//! Helpers around Webex's use of OAuth Bearer Authentication.

use std::fmt;

/// A newtype wrapper around Webex access tokens, whether they belong to a bot
/// or a person.
#[derive(PartialEq, Eq, Clone)]
pub struct WebexAccessToken(pub String);

/// Tokens end up in logs far too easily, so never print one.
impl fmt::Debug for WebexAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WebexAccessToken(***)")
    }
}

/// Convert a Webex access token to a `Bearer` `Authorization` header value.
///
/// ```
/// let token = WebexAccessToken("abc123".into());
/// assert_eq!(to_auth_header_val(&token), "Bearer abc123");
/// ```
pub fn to_auth_header_val(t: &WebexAccessToken) -> String {
    format!("Bearer {}", t.0)
}
