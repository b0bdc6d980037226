use reqwest::Method;
use url::form_urlencoded;

use crate::error::{RestError, RestResult};
use crate::request::RequestSpec;

/// A logical REST operation: a path template plus the query parameters it
/// understands. Placeholders in `path_template` are written `{name}` and
/// must be listed in `path_params`. Query parameters also listed in
/// `optional_query` are filters that are left out when empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub method: EndpointMethod,
    pub path_template: &'static str,
    pub path_params: &'static [&'static str],
    pub query_params: &'static [&'static str],
    pub optional_query: &'static [&'static str],
}

/// `reqwest::Method` is not const-constructible for table entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointMethod {
    Get,
    Post,
}

impl From<EndpointMethod> for Method {
    fn from(method: EndpointMethod) -> Self {
        match method {
            EndpointMethod::Get => Method::GET,
            EndpointMethod::Post => Method::POST,
        }
    }
}

impl EndpointDescriptor {
    pub const fn get(name: &'static str, path_template: &'static str) -> Self {
        Self {
            name,
            method: EndpointMethod::Get,
            path_template,
            path_params: &[],
            query_params: &[],
            optional_query: &[],
        }
    }

    pub const fn post(name: &'static str, path_template: &'static str) -> Self {
        Self {
            name,
            method: EndpointMethod::Post,
            path_template,
            path_params: &[],
            query_params: &[],
            optional_query: &[],
        }
    }

    pub const fn with_path_params(mut self, params: &'static [&'static str]) -> Self {
        self.path_params = params;
        self
    }

    pub const fn with_query_params(mut self, params: &'static [&'static str]) -> Self {
        self.query_params = params;
        self
    }

    /// Marks query parameters that are dropped when given an empty value.
    /// Each must also appear in `query_params`.
    pub const fn with_optional_query(mut self, params: &'static [&'static str]) -> Self {
        self.optional_query = params;
        self
    }

    /// Fills the template and query string.
    ///
    /// Query arguments come out in descriptor order and arguments not passed
    /// are omitted. An empty value is sent as `key=` unless the parameter is
    /// in `optional_query`, so optional filters can be passed as `""`.
    pub fn build(
        &self,
        path_args: &[(&str, &str)],
        query_args: &[(&str, &str)],
    ) -> RestResult<RequestSpec> {
        let path = self.render_path(path_args)?;

        for (key, _) in query_args {
            if !self.query_params.iter().any(|param| param == key) {
                return Err(RestError::invalid_request(format!(
                    "endpoint {} has no query parameter {key:?}",
                    self.name
                )));
            }
        }

        let query = self.query_params.iter().filter_map(|param| {
            let (key, value) = query_args.iter().find(|(key, _)| key == param)?;
            if value.is_empty() && self.optional_query.iter().any(|optional| optional == key) {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        });

        Ok(RequestSpec::new(self.method.into(), path).with_query_pairs(query))
    }

    fn render_path(&self, path_args: &[(&str, &str)]) -> RestResult<String> {
        for (key, _) in path_args {
            if !self.path_params.iter().any(|param| param == key) {
                return Err(RestError::invalid_request(format!(
                    "endpoint {} has no path parameter {key:?}",
                    self.name
                )));
            }
        }

        let mut path = self.path_template.to_string();
        for param in self.path_params {
            let value = path_args
                .iter()
                .find(|(key, _)| key == param)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    RestError::invalid_request(format!(
                        "endpoint {} requires path parameter {param:?}",
                        self.name
                    ))
                })?;
            if value.is_empty() || value == "." || value == ".." {
                return Err(RestError::invalid_request(format!(
                    "endpoint {} got unusable value {value:?} for {param:?}",
                    self.name
                )));
            }
            path = path.replace(&format!("{{{param}}}"), &encode_path_segment(value));
        }
        Ok(path)
    }
}

/// Percent-encodes one path segment. `byte_serialize` writes spaces as `+`
/// and literal plus signs as `%2B`, so every `+` in its output is a space.
pub fn encode_path_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
