use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::adapter::{RestBytes, RestFuture, RestRequest, RestResponse, RestTransport};
use crate::error::{RestError, RestResult, TransportErrorKind};

/// What the mock does with one request before any queued response is used.
#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    /// Waits before answering. A delay past the request timeout becomes a
    /// timeout error, the same way the reqwest transport reports it.
    Delay(Duration),
    Fail(TransportErrorKind, String),
    /// The response never arrives.
    Drop,
}

impl MockBehavior {
    pub fn delay(ms: u64) -> Self {
        Self::Delay(Duration::from_millis(ms))
    }

    pub fn connect_error(reason: impl Into<String>) -> Self {
        Self::Fail(TransportErrorKind::Connect, reason.into())
    }

    pub fn send_error(reason: impl Into<String>) -> Self {
        Self::Fail(TransportErrorKind::Send, reason.into())
    }

    pub fn receive_error(reason: impl Into<String>) -> Self {
        Self::Fail(TransportErrorKind::Receive, reason.into())
    }

    pub fn timeout_error(reason: impl Into<String>) -> Self {
        Self::Fail(TransportErrorKind::Timeout, reason.into())
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::Fail(TransportErrorKind::Internal, reason.into())
    }

    pub fn drop_response() -> Self {
        Self::Drop
    }
}

/// Behaviors consumed one per request, in order. Once empty every request
/// passes.
#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    steps: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.steps.push_back(behavior);
        self
    }
}

/// A canned answer.
#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: RestBytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<RestBytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }

    /// Adds a response header. Fails if either half is not legal on the wire.
    pub fn with_header(mut self, name: &str, value: &str) -> RestResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| RestError::invalid_request(format!("mock header name {name:?}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| RestError::invalid_request(format!("mock header value: {err}")))?;
        self.headers.append(name, value);
        Ok(self)
    }
}

type RouteKey = (Method, String);

#[derive(Debug, Default)]
struct MockState {
    plan: MockBehaviorPlan,
    fallback: VecDeque<MockResponse>,
    routes: HashMap<RouteKey, VecDeque<MockResponse>>,
    outbound: Vec<RestRequest>,
    last_error: Option<String>,
}

impl MockState {
    fn take_response(&mut self, request: &RestRequest) -> MockResponse {
        let key = (request.method.clone(), request.url.clone());
        self.routes
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.fallback.pop_front())
            .unwrap_or_else(|| MockResponse::new(200, Bytes::new()))
    }
}

/// In-memory transport for deterministic tests.
///
/// Responses are served from a per-route queue (exact method and URL,
/// including the query string) before falling back to a shared queue. With
/// both queues empty the mock answers `200` with an empty body. Every request
/// is logged so tests can inspect the URL, headers and body that went out.
#[derive(Clone, Debug, Default)]
pub struct MockRestAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockRestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior_plan(plan: MockBehaviorPlan) -> Self {
        let adapter = Self::default();
        adapter.lock().plan = plan;
        adapter
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_behavior(&self, behavior: MockBehavior) {
        self.lock().plan.push(behavior);
    }

    /// Served to any request without a route-specific response.
    pub fn queue_response(&self, response: MockResponse) {
        self.lock().fallback.push_back(response);
    }

    pub fn queue_get_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_route(Method::GET, url.into(), response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_route(Method::POST, url.into(), response);
    }

    fn queue_route(&self, method: Method, url: String, response: MockResponse) {
        self.lock()
            .routes
            .entry((method, url))
            .or_default()
            .push_back(response);
    }

    /// Requests seen so far, oldest first.
    pub fn outbound_requests(&self) -> Vec<RestRequest> {
        self.lock().outbound.clone()
    }

    pub fn last_request(&self) -> Option<RestRequest> {
        self.lock().outbound.last().cloned()
    }

    pub fn outbound_count(&self) -> usize {
        self.lock().outbound.len()
    }

    /// Message of the most recent injected failure, cleared by each new
    /// request.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    fn fail(&self, kind: TransportErrorKind, message: String) -> RestError {
        self.lock().last_error = Some(message.clone());
        RestError::transport(kind, message)
    }
}

impl RestTransport for MockRestAdapter {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let adapter = self.clone();
        Box::pin(async move {
            let start = Instant::now();
            let behavior = {
                let mut state = adapter.lock();
                state.outbound.push(request.clone());
                state.last_error = None;
                state.plan.steps.pop_front().unwrap_or_default()
            };

            match behavior {
                MockBehavior::Pass => {}
                MockBehavior::Delay(delay) => match request.timeout {
                    Some(timeout) if delay > timeout => {
                        tokio::time::sleep(timeout).await;
                        return Err(adapter.fail(
                            TransportErrorKind::Timeout,
                            format!("mock response delayed past {timeout:?}"),
                        ));
                    }
                    _ => tokio::time::sleep(delay).await,
                },
                MockBehavior::Fail(kind, reason) => return Err(adapter.fail(kind, reason)),
                MockBehavior::Drop => {
                    return Err(adapter.fail(
                        TransportErrorKind::Timeout,
                        "mock transport dropped the response".to_string(),
                    ));
                }
            }

            let response = adapter.lock().take_response(&request);
            Ok(RestResponse {
                status: response.status,
                headers: response.headers,
                body: response.body,
                elapsed: start.elapsed(),
            })
        })
    }
}
