//! # Receiver Endpoint
//!
//! The receiver serves the WebSocket on a fixed path of the same origin
//! the controller page comes from. `http` origins map to `ws`, `https`
//! origins map to `wss`, and the client id rides in the query string.

use std::fmt;

use url::Url;

use crate::error::{GamepadError, Result};

/// Fixed WebSocket path on the receiver.
pub const WS_PATH: &str = "/ws";

/// Query parameter carrying the client identifier.
pub const CLIENT_ID_PARAM: &str = "client_id";

/// Fully resolved WebSocket URL for one client.
///
/// # Examples
///
/// ```
/// use touch_gamepad::protocol::Endpoint;
///
/// let endpoint = Endpoint::from_origin("https://pad.local:3000", "abc-123")?;
/// assert_eq!(endpoint.url(), "wss://pad.local:3000/ws?client_id=abc-123");
/// # Ok::<(), touch_gamepad::error::GamepadError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Derives the endpoint from a page origin (`scheme://host[:port]`).
    ///
    /// Any credentials, path, query or fragment on the origin are discarded.
    /// The client id is opaque and percent-encoded into the query.
    ///
    /// # Errors
    ///
    /// Returns `Endpoint` if the origin does not parse, has no host or is
    /// not `http`/`https`, and `Identity` if the client id is empty.
    pub fn from_origin(origin: &str, client_id: &str) -> Result<Self> {
        let mut url = parse_origin(origin)?;
        if client_id.is_empty() {
            return Err(GamepadError::Identity("client id cannot be empty".to_string()));
        }

        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        let derived = url.set_scheme(scheme).is_ok()
            && url.set_username("").is_ok()
            && url.set_password(None).is_ok();
        if !derived {
            return Err(GamepadError::Endpoint(format!(
                "cannot derive a WebSocket URL from '{}'",
                origin
            )));
        }
        url.set_path(WS_PATH);
        url.set_query(None);
        url.set_fragment(None);
        url.query_pairs_mut().append_pair(CLIENT_ID_PARAM, client_id);

        Ok(Self { url })
    }

    /// The WebSocket URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Whether the endpoint uses TLS (`wss`).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Parses a receiver origin and checks it is an `http`/`https` URL with a host.
///
/// # Errors
///
/// Returns `Endpoint` describing what is wrong with `origin`.
pub fn parse_origin(origin: &str) -> Result<Url> {
    let origin = origin.trim();
    let url = Url::parse(origin).map_err(|e| GamepadError::Endpoint(format!("invalid origin '{}': {}", origin, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GamepadError::Endpoint(format!(
            "origin must be http:// or https://, got '{}'",
            origin
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(GamepadError::Endpoint(format!("origin '{}' has no host", origin)));
    }

    Ok(url)
}
