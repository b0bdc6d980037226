use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use base64::Engine;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::time::sleep;
use typed_restapi::news::NewsResponse;
use typed_restapi::{
    ClientConfig, NewsClient, RequestSpec, RestClient, StaticTokenSigner, TransportErrorKind,
};

const PAYMENT_REQUIRED: &str = r#"{"x402Version":1,"accepts":[{"scheme":"exact","network":"base-sepolia","maxAmountRequired":"1000","payTo":"0x1","asset":"0x2"}]}"#;

#[derive(Clone, Default)]
struct AppState {
    premium_hits: Arc<AtomicUsize>,
}

#[derive(serde::Serialize)]
struct SearchArticle {
    title: String,
    source: String,
}

#[derive(serde::Serialize)]
struct SearchBody {
    articles: Vec<SearchArticle>,
    total: u64,
}

#[derive(Debug, serde::Deserialize)]
struct Premium {
    ok: bool,
}

#[tokio::test]
async fn e2e_news_query_and_api_key_reach_the_server() {
    let server = TestServer::start().await;
    let config = ClientConfig::builder(&server.base_url)
        .api_key("cda_e2e")
        .build()
        .expect("valid config");
    let client = NewsClient::from_rest(RestClient::from_config(config));

    let news = client
        .search_news("bitcoin etf & more", 5)
        .await
        .expect("search should succeed");

    assert_eq!(news.total, 1);
    assert_eq!(news.articles[0].title, "cda_e2e");
    assert_eq!(news.articles[0].source, "q=bitcoin+etf+%26+more&limit=5");
}

#[tokio::test]
async fn e2e_anonymous_request_has_no_key() {
    let server = TestServer::start().await;
    let client = RestClient::new(&server.base_url, None, None).expect("valid config");

    let news: NewsResponse = client
        .request(RequestSpec::get("/api/search"))
        .await
        .expect("search should succeed");

    assert_eq!(news.articles[0].title, "anonymous");
}

#[tokio::test]
async fn e2e_error_status_is_mapped() {
    let server = TestServer::start().await;
    let client = RestClient::new(&server.base_url, None, None).expect("valid config");

    let err = client
        .request::<NewsResponse>(RequestSpec::get("/api/down"))
        .await
        .expect_err("503 should fail");

    assert_eq!(err.status_code(), 503);
    assert_eq!(
        err.api_error().map(|e| e.message.as_str()),
        Some("service unavailable")
    );
}

#[tokio::test]
async fn e2e_configured_timeout_is_a_transport_failure() {
    let server = TestServer::start().await;
    let client = RestClient::new(&server.base_url, None, Some(Duration::from_millis(200)))
        .expect("valid config");

    let err = client
        .request::<NewsResponse>(RequestSpec::get("/api/slow"))
        .await
        .expect_err("timeout should trigger");

    assert_eq!(err.transport_kind(), Some(TransportErrorKind::Timeout));
    assert_eq!(err.status_code(), 0);
}

#[tokio::test]
async fn e2e_refused_connection_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let client = RestClient::new(format!("http://{addr}"), None, Some(Duration::from_secs(2)))
        .expect("valid config");

    let err = client
        .request::<NewsResponse>(RequestSpec::get("/api/news"))
        .await
        .expect_err("nothing is listening");

    assert!(err.is_transport(), "{err}");
    assert_eq!(err.status_code(), 0);
}

#[tokio::test]
async fn e2e_payment_required_is_paid_once() {
    let server = TestServer::start().await;
    let client = RestClient::new(&server.base_url, None, None)
        .expect("valid config")
        .with_payment_signer(StaticTokenSigner::new("signed-token"));

    let paid = client
        .request_with_receipt::<Premium>(RequestSpec::get("/api/premium"))
        .await
        .expect("paid request should succeed");

    assert!(paid.value.ok);
    assert_eq!(
        paid.receipt.and_then(|r| r.transaction).as_deref(),
        Some("0xfeed")
    );
    assert_eq!(server.state.premium_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn e2e_rejected_payment_is_not_retried_again() {
    let server = TestServer::start().await;
    let client = RestClient::new(&server.base_url, None, None)
        .expect("valid config")
        .with_payment_signer(StaticTokenSigner::new("wrong-token"));

    let err = client
        .request::<Premium>(RequestSpec::get("/api/premium"))
        .await
        .expect_err("server refuses the token");

    assert_eq!(err.status_code(), 402);
    assert_eq!(server.state.premium_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn e2e_post_json_round_trip() {
    let server = TestServer::start().await;
    let client = RestClient::new(&server.base_url, None, None).expect("valid config");

    let echoed: sonic_rs::Value = client
        .post_json("/api/echo", &sonic_rs::json!({"q": "why"}))
        .await
        .expect("echo should succeed");

    assert_eq!(echoed, sonic_rs::json!({"q": "why"}));
}

struct TestServer {
    base_url: String,
    state: AppState,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let state = AppState::default();
        let app = Router::new()
            .route("/api/search", get(search_handler))
            .route("/api/down", get(down_handler))
            .route("/api/slow", get(slow_handler))
            .route("/api/premium", get(premium_handler))
            .route("/api/echo", post(echo_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url,
            state,
            task,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn search_handler(headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");
    let body = SearchBody {
        articles: vec![SearchArticle {
            title: key.to_string(),
            source: query.unwrap_or_default(),
        }],
        total: 1,
    };
    match sonic_rs::to_string(&body) {
        Ok(json) => (StatusCode::OK, json).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn down_handler() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "service unavailable")
}

async fn slow_handler() -> (StatusCode, &'static str) {
    sleep(Duration::from_millis(2500)).await;
    (StatusCode::OK, r#"{"articles":[],"total":0}"#)
}

async fn premium_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.premium_hits.fetch_add(1, Ordering::SeqCst);
    let paid = headers
        .get("x-payment")
        .is_some_and(|v| v.as_bytes() == b"signed-token");
    if !paid {
        return (StatusCode::PAYMENT_REQUIRED, PAYMENT_REQUIRED).into_response();
    }

    let receipt = base64::engine::general_purpose::STANDARD
        .encode(r#"{"success":true,"transaction":"0xfeed","network":"base-sepolia"}"#);
    (
        StatusCode::OK,
        [("x-payment-response", receipt)],
        r#"{"ok":true}"#,
    )
        .into_response()
}

async fn echo_handler(body: Bytes) -> (StatusCode, Bytes) {
    (StatusCode::OK, body)
}
