//! Single endpoint calls
//!
//! Builds the detection request for one endpoint, runs it through the
//! transport, and classifies the outcome into success or a failover action.

use crate::endpoint::Endpoint;
use crate::transport::{FetchRequest, Transport};
use dacloud_json::{JsonMap, JsonValue};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::form_urlencoded::byte_serialize;

/// Prefix added to every forwarded header name
pub const HEADER_PREFIX: &str = "X-DA-";

/// What the caller should do after calling an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailoverAction {
    NotRequired,
    /// The service refused the caller; no other endpoint will do better
    Stop,
    /// Try the next endpoint
    Continue,
}

impl FailoverAction {
    /// Numeric code used as the prefix of failure messages
    pub const fn code(self) -> u8 {
        match self {
            Self::NotRequired => 0,
            Self::Stop => 1,
            Self::Continue => 2,
        }
    }
}

impl fmt::Display for FailoverAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Classified result of one endpoint call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// `None` when the body had no usable `properties` object
    Success(Option<JsonMap>),
    Failed {
        action: FailoverAction,
        message: String,
    },
}

impl CallOutcome {
    pub const fn action(&self) -> FailoverAction {
        match self {
            Self::Success(_) => FailoverAction::NotRequired,
            Self::Failed { action, .. } => *action,
        }
    }
}

/// Calls endpoints on behalf of the registry and the lookup service
#[derive(Clone)]
pub struct Connector {
    transport: Arc<dyn Transport>,
    licence_key: String,
    timeout: Duration,
}

impl Connector {
    pub fn new(transport: Arc<dyn Transport>, licence_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            licence_key: licence_key.into(),
            timeout,
        }
    }

    pub fn licence_key(&self) -> &str {
        &self.licence_key
    }

    /// Request a detection from `endpoint`.
    ///
    /// `headers` are sent with [`HEADER_PREFIX`] prepended to each name.
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        user_agent: &str,
        headers: &[(String, String)],
    ) -> CallOutcome {
        let request = FetchRequest {
            url: build_url(endpoint, &self.licence_key, user_agent),
            headers: headers
                .iter()
                .map(|(name, value)| (format!("{HEADER_PREFIX}{name}"), value.clone()))
                .collect(),
            timeout: self.timeout,
        };

        match self.transport.fetch(&request).await {
            Ok(response) => match response.body {
                Some(body) if response.is_success() => CallOutcome::Success(decode_properties(&body)),
                _ => failure(endpoint, response.status, &response.message),
            },
            Err(e) => failure(endpoint, 0, &e.to_string()),
        }
    }
}

/// `<endpoint url>?licencekey=..&useragent=..`, both form-encoded
pub fn build_url(endpoint: &Endpoint, licence_key: &str, user_agent: &str) -> String {
    let licence: String = byte_serialize(licence_key.as_bytes()).collect();
    let agent: String = byte_serialize(user_agent.as_bytes()).collect();
    format!("{}?licencekey={licence}&useragent={agent}", endpoint.url())
}

/// Extract the `properties` object of a response body.
///
/// Bodies that are not an object, fail to decode, or lack the key give
/// `None`.
pub fn decode_properties(body: &str) -> Option<JsonMap> {
    let body = body.trim();
    if !(body.starts_with('{') && body.ends_with('}')) {
        return None;
    }

    match dacloud_json::decode(body) {
        Ok(mut map) => match map.shift_remove("properties") {
            Some(JsonValue::Object(properties)) => Some(properties),
            _ => None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Undecodable cloud response");
            None
        }
    }
}

fn failure(endpoint: &Endpoint, status: u16, message: &str) -> CallOutcome {
    let action = if message.to_lowercase().contains("forbidden") {
        FailoverAction::Stop
    } else {
        FailoverAction::Continue
    };

    let message = format!(
        "{action}: Error getting data from DeviceAtlas Cloud end-point \"{}\", response {status}, Reason: {}",
        endpoint.host,
        strip_tags(&message.replace(['\n', '\r'], " "))
    );
    CallOutcome::Failed { action, message }
}

/// Remove `<...>` markup from an error page
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = &rest[start..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}
