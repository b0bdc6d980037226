use std::{env, fmt, time::Duration};

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::error::{RestError, RestResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Immutable settings for one target service.
///
/// Everything here is validated once, at [`ClientConfigBuilder::build`]. A
/// built config always carries an absolute http(s) base URL without query or
/// fragment, and header name/value pairs that are legal on the wire.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: Url,
    api_key: Option<HeaderValue>,
    api_key_header: HeaderName,
    timeout: Duration,
    user_agent: Option<HeaderValue>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_header", &self.api_key_header)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: base_url.into(),
            api_key: None,
            api_key_header: None,
            timeout: None,
            user_agent: None,
        }
    }

    /// Reads `<PREFIX>_BASE_URL` (required), `<PREFIX>_API_KEY`,
    /// `<PREFIX>_API_KEY_HEADER` and `<PREFIX>_TIMEOUT_SECS`.
    pub fn from_env(prefix: &str) -> RestResult<Self> {
        let key = |suffix: &str| format!("{prefix}_{suffix}");
        let base_url = env::var(key("BASE_URL"))
            .map_err(|_| RestError::config(format!("{} is required", key("BASE_URL"))))?;

        let mut builder = Self::builder(base_url);
        if let Some(api_key) = non_empty_var(&key("API_KEY")) {
            builder = builder.api_key(api_key);
        }
        if let Some(header) = non_empty_var(&key("API_KEY_HEADER")) {
            builder = builder.api_key_header(header);
        }
        if let Some(raw) = non_empty_var(&key("TIMEOUT_SECS")) {
            let secs: u64 = raw.parse().map_err(|_| {
                RestError::config(format!("{} must be whole seconds, got {raw:?}", key("TIMEOUT_SECS")))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn api_key_header(&self) -> Option<(&HeaderName, &HeaderValue)> {
        self.api_key
            .as_ref()
            .map(|value| (&self.api_key_header, value))
    }

    pub(crate) fn user_agent(&self) -> Option<&HeaderValue> {
        self.user_agent.as_ref()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
    base_url: String,
    api_key: Option<String>,
    api_key_header: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn maybe_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = Some(header.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> RestResult<ClientConfig> {
        let base_url = parse_base_url(&self.base_url)?;

        // A blank key means anonymous, not an empty auth header.
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                let mut value = HeaderValue::from_str(&key)
                    .map_err(|_| RestError::config("api key is not a valid header value"))?;
                value.set_sensitive(true);
                Ok::<_, RestError>(value)
            })
            .transpose()?;

        let api_key_header = HeaderName::from_bytes(
            self.api_key_header
                .as_deref()
                .unwrap_or(DEFAULT_API_KEY_HEADER)
                .as_bytes(),
        )
        .map_err(|err| RestError::config(format!("invalid api key header name: {err}")))?;

        let user_agent = self
            .user_agent
            .map(|agent| {
                HeaderValue::from_str(&agent)
                    .map_err(|_| RestError::config("user agent is not a valid header value"))
            })
            .transpose()?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(RestError::config("timeout must be greater than zero"));
        }

        Ok(ClientConfig {
            base_url,
            api_key,
            api_key_header,
            timeout,
            user_agent,
        })
    }
}

fn parse_base_url(raw: &str) -> RestResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| RestError::config(format!("invalid base url {raw:?}: {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RestError::config(format!(
            "base url must use http or https, got {:?}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(RestError::config("base url must have a host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(RestError::config("base url must not carry a query or fragment"));
    }
    if url.cannot_be_a_base() {
        return Err(RestError::config("base url cannot be used as a base"));
    }

    Ok(url)
}
