use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use url::{Url, form_urlencoded};

use crate::error::{RestError, RestResult};

/// One logical API call, relative to a client's base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Appends a query parameter. Values are encoded when the URL is built.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json_body<B: Serialize>(self, payload: &B) -> RestResult<Self> {
        let body = sonic_rs::to_vec(payload)?;
        Ok(self.with_body(body))
    }

    /// Resolves this spec against `base` into the absolute request URL.
    pub fn url(&self, base: &Url) -> RestResult<String> {
        build_url(base, &self.path, &self.query)
    }
}

/// Form-urlencodes `pairs` in the order given.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

/// `base + path + ('?' + query)`, refusing anything that would leave `base`.
pub fn build_url(base: &Url, path: &str, query: &[(String, String)]) -> RestResult<String> {
    validate_path(path)?;

    let prefix = base.as_str().trim_end_matches('/');
    let mut raw = String::with_capacity(prefix.len() + path.len() + 16);
    raw.push_str(prefix);
    raw.push_str(path);
    if !query.is_empty() {
        raw.push('?');
        raw.push_str(&encode_query(query));
    }

    let url = Url::parse(&raw)
        .map_err(|err| RestError::invalid_request(format!("invalid request url {raw:?}: {err}")))?;

    let base_path = base.path().trim_end_matches('/');
    let within_base = url
        .path()
        .strip_prefix(base_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if url.origin() != base.origin() || !within_base {
        return Err(RestError::invalid_request(format!(
            "path {path:?} escapes the base url"
        )));
    }

    Ok(url.into())
}

fn validate_path(path: &str) -> RestResult<()> {
    if !path.starts_with('/') {
        return Err(RestError::invalid_request(format!(
            "path {path:?} must start with '/'"
        )));
    }
    // The url parser silently drops tab and newline, which could rejoin a
    // split dot segment after validation.
    if path.chars().any(|c| c.is_ascii_control()) {
        return Err(RestError::invalid_request(format!(
            "path {path:?} must not contain control characters"
        )));
    }
    if path.contains(['?', '#', '\\']) {
        return Err(RestError::invalid_request(format!(
            "path {path:?} must not contain '?', '#' or '\\'"
        )));
    }
    if path.split('/').any(is_dot_segment) {
        return Err(RestError::invalid_request(format!(
            "path {path:?} must not contain dot segments"
        )));
    }
    Ok(())
}

fn is_dot_segment(segment: &str) -> bool {
    let lowered = segment.to_ascii_lowercase();
    let decoded = lowered.replace("%2e", ".");
    decoded == "." || decoded == ".."
}
