//! Type definitions and helpers for the Webex REST API.

use super::{auth::*, error::WebexError};
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, LINK};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// The base URL of the Webex API.
pub const API_BASE: &str = "https://webexapis.com/v1";

/// Webex is explicit about the charset it expects alongside JSON bodies.
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A client that holds a connection pool internally, as per
/// [reqwest::Client], along with everything needed to authenticate against
/// and reach the API. It's immutable once built.
pub struct WebexClient {
    http: reqwest::Client,
    base: Url,
    token: WebexAccessToken,
}

impl WebexClient {
    /// Build a client, optionally routing every request through a forward
    /// proxy. A proxy that can't be installed fails here rather than falling
    /// back to a direct connection.
    pub fn new(
        base: &Url,
        token: WebexAccessToken,
        proxy: Option<&Url>,
    ) -> Result<Self, ConfigError> {
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidAPIBase {
                raw: base.to_string(),
                reason: "not a hierarchical URL".into(),
            });
        }

        let mut builder = reqwest::Client::builder();

        if let Some(proxy) = proxy {
            let p = reqwest::Proxy::all(proxy.clone()).map_err(|e| ConfigError::InvalidProxy {
                raw: proxy.to_string(),
                reason: e.to_string(),
            })?;
            debug!("Routing requests via proxy {}", proxy.host_str().unwrap_or_default());
            builder = builder.proxy(p);
        }

        let http = builder.build().map_err(ConfigError::ClientBuildFailed)?;

        Ok(WebexClient {
            http,
            base: base.clone(),
            token,
        })
    }

    /// The base URL as a prefix for endpoint paths.
    fn prefix(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Create a GET request to any Webex API endpoint, handling authentication.
    pub fn get<T: ToString>(&self, path: T) -> reqwest::RequestBuilder {
        self.get_url(self.prefix().to_owned() + &path.to_string())
    }

    /// Create a GET request against an absolute URL, as handed to us in
    /// pagination links.
    pub fn get_url<U: reqwest::IntoUrl>(&self, url: U) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header(AUTHORIZATION, to_auth_header_val(&self.token))
    }

    /// Create a POST request to any Webex API endpoint, handling authentication.
    /// The body is left to the caller, see [WebexClient::post_json].
    pub fn post<T: ToString>(&self, path: T) -> reqwest::RequestBuilder {
        self.http
            .post(self.prefix().to_owned() + &path.to_string())
            .header(AUTHORIZATION, to_auth_header_val(&self.token))
    }

    /// Create a POST request carrying a JSON body.
    pub fn post_json<T: ToString, B: Serialize + ?Sized>(
        &self,
        path: T,
        body: &B,
    ) -> reqwest::RequestBuilder {
        // `json` only sets a content type when one isn't already present.
        self.post(path)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(body)
    }

    /// Create a DELETE request for a single resource. The ID always stays
    /// exactly one path segment, whatever characters it holds.
    pub fn delete(&self, collection: &str, id: &str) -> reqwest::RequestBuilder {
        self.http
            .delete(self.resource_url(collection, id))
            .header(AUTHORIZATION, to_auth_header_val(&self.token))
    }

    fn resource_url(&self, collection: &str, id: &str) -> Url {
        let mut url = self.base.clone();

        // `new` rejects bases that can't carry path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection).push(id);
        }

        url
    }

    /// Create a GET request for the next page of a listing. Links pointing
    /// anywhere but the API itself are refused, as they'd receive our token.
    pub fn follow(&self, next: Url) -> Result<reqwest::RequestBuilder, WebexError> {
        if next.origin() != self.base.origin() {
            return Err(WebexError::ForeignPageLink(next));
        }

        Ok(self.get_url(next))
    }
}

/// The URL a request will be sent to, if it can be built at all.
pub fn url_of(req: &reqwest::RequestBuilder) -> Option<Url> {
    req.try_clone()
        .and_then(|r| r.build().ok())
        .map(|r| r.url().to_owned())
}

/// Send a request, turning any non-2xx status into an error.
pub async fn execute(req: reqwest::RequestBuilder) -> Result<reqwest::Response, WebexError> {
    let res = req.send().await?;
    let status = res.status();

    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await?;
    let (message, tracking_id) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(x) => (x.message, x.tracking_id),
        Err(_) => (body, None),
    };

    Err(WebexError::APIResponseError {
        status,
        message,
        tracking_id,
    })
}

/// Decode a successful response body.
pub async fn parse_response<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, WebexError> {
    let bytes = res.bytes().await?;

    Ok(serde_json::from_slice(&bytes)?)
}

/// Send a request and decode its response in one go.
pub async fn fetch<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> Result<T, WebexError> {
    parse_response(execute(req).await?).await
}

/// Webex's list endpoints all wrap their results the same way.
///
/// ```json
/// {
///     "items": []
/// }
/// ```
#[derive(Deserialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

/// The universal response body in case of an unsuccessful request.
///
/// ```json
/// {
///     "message": "The requested resource could not be found.",
///     "errors": [{ "description": "The requested resource could not be found." }],
///     "trackingId": "ROUTER_5E3B1F1C-..."
/// }
/// ```
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    message: String,
    tracking_id: Option<String>,
}

/// Find the next page of a listing, if any. Webex paginates with RFC 5988
/// `Link` headers, e.g.:
///
/// ```text
/// Link: <https://webexapis.com/v1/rooms?max=1000&cursor=abc>; rel="next"
/// ```
pub fn next_page(headers: &HeaderMap) -> Option<Url> {
    // This unwrap is tested below.
    static NEXT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?(?:\s*[;,]|$)"#).unwrap());

    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| NEXT.captures(v))
        .and_then(|c| Url::parse(&c[1]).ok())
}
