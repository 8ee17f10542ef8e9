//! Request identity and header forwarding

use std::collections::BTreeMap;

/// Headers that describe the device and are always forwarded
pub const ESSENTIAL_HEADERS: &[&str] = &[
    "x-profile",
    "x-wap-profile",
    "x-att-deviceid",
    "accept",
    "accept-language",
];

/// Headers in which proxies and transcoding browsers pass the original
/// device user agent. Their order is part of the fingerprint.
pub const USER_AGENT_HEADERS: &[&str] = &[
    "x-device-user-agent",
    "x-original-user-agent",
    "x-operamini-phone-ua",
    "x-skyfire-phone",
    "x-bolt-phone-ua",
    "device-stock-ua",
    "x-ucbrowser-ua",
    "x-ucbrowser-device-ua",
    "x-ucbrowser-device",
    "x-puffin-ua",
];

/// Client address headers, forwarded only on request
pub const EXTRA_HEADERS: &[&str] = &[
    "client-ip",
    "x-forwarded-for",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
    "proxy-client-ip",
    "wl-proxy-client-ip",
];

pub const USER_AGENT_HEADER: &str = "user-agent";
pub const REMOTE_ADDR_HEADER: &str = "remote-addr";
pub const COOKIE_HEADER: &str = "cookie";

/// Name of the cookie set by the DeviceAtlas client-side component
pub const CLIENT_COOKIE_NAME: &str = "DAPROPS";

/// Header name under which the client cookie is forwarded
pub const CLIENT_PROPERTIES_HEADER: &str = "Client-Properties";

/// Any header whose name contains this marker is forwarded
pub const OPERA_MARKER: &str = "opera";

/// Normalise header names: lowercase, `_` to `-`, no leading `http-`.
///
/// Later duplicates win.
pub fn normalise<I, K, V>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    headers
        .into_iter()
        .map(|(name, value)| (normalise_name(name.as_ref()), value.into()))
        .collect()
}

fn normalise_name(name: &str) -> String {
    let name = name.trim().to_lowercase().replace('_', "-");
    match name.strip_prefix("http-") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

/// What identifies one incoming request to the cloud service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: String,
    /// Value of the client-side `DAPROPS` cookie
    pub cookie: Option<String>,
    /// Normalised request headers
    pub headers: BTreeMap<String, String>,
}

impl RequestIdentity {
    /// Identity of a request carrying only a user agent
    pub fn from_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }

    /// Identity of a full set of request headers.
    ///
    /// The cookie is read from a `DAPROPS` header, or else from the
    /// `cookie` header, and only when `use_client_cookie` is set.
    pub fn from_headers<I, K, V>(headers: I, use_client_cookie: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = normalise(headers);
        let user_agent = headers.get(USER_AGENT_HEADER).cloned().unwrap_or_default();
        let cookie = if use_client_cookie {
            client_cookie(&headers)
        } else {
            None
        };

        Self {
            user_agent,
            cookie,
            headers,
        }
    }

    fn opera_headers(&self) -> impl Iterator<Item = (&String, &String)> {
        self.headers
            .iter()
            .filter(|(name, _)| name.contains(OPERA_MARKER))
    }

    /// md5 hex digest identifying this request in the properties cache
    pub fn fingerprint(&self) -> String {
        let mut material = self.user_agent.clone();
        for name in USER_AGENT_HEADERS {
            if let Some(value) = self.headers.get(*name) {
                material.push_str(value);
            }
        }
        for (_, value) in self.opera_headers() {
            material.push_str(value);
        }
        if let Some(cookie) = &self.cookie {
            material.push_str(cookie);
        }
        hex::encode(md5::compute(material.as_bytes()).0)
    }

    /// Headers to send to the cloud service, before prefixing
    pub fn forwarded_headers(&self, send_extra_headers: bool) -> Vec<(String, String)> {
        let mut forwarded = Vec::new();

        for name in ESSENTIAL_HEADERS.iter().chain(USER_AGENT_HEADERS) {
            if let Some(value) = self.headers.get(*name) {
                push_once(&mut forwarded, name, value);
            }
        }
        for (name, value) in self.opera_headers() {
            push_once(&mut forwarded, name, value);
        }
        if send_extra_headers {
            for name in EXTRA_HEADERS.iter().chain(&[REMOTE_ADDR_HEADER]) {
                if let Some(value) = self.headers.get(*name) {
                    push_once(&mut forwarded, name, value);
                }
            }
        }
        if let Some(cookie) = &self.cookie {
            push_once(&mut forwarded, CLIENT_PROPERTIES_HEADER, cookie);
        }

        forwarded
    }
}

fn push_once(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !headers.iter().any(|(n, _)| n == name) {
        headers.push((name.to_string(), value.to_string()));
    }
}

fn client_cookie(headers: &BTreeMap<String, String>) -> Option<String> {
    let name = CLIENT_COOKIE_NAME.to_lowercase();
    if let Some(value) = headers.get(&name) {
        return Some(value.clone());
    }

    let prefix = format!("{CLIENT_COOKIE_NAME}=");
    headers.get(COOKIE_HEADER).and_then(|cookies| {
        cookies
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix(&prefix))
            .map(str::to_string)
    })
}
