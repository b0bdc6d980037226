use typed_restapi::{
    ClientConfig, MockResponse, MockRestAdapter, RequestSpec, RestClient, RestError, build_url,
    encode_query,
};
use url::Url;

fn base(raw: &str) -> Url {
    Url::parse(raw).expect("valid base url")
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn builds_base_plus_path_plus_query() {
    let url = build_url(
        &base("https://api.example.test"),
        "/api/news",
        &pairs(&[("limit", "5")]),
    )
    .expect("valid url");
    assert_eq!(url, "https://api.example.test/api/news?limit=5");
}

#[test]
fn empty_query_adds_no_question_mark() {
    let url = build_url(&base("https://api.example.test"), "/api/breaking", &[])
        .expect("valid url");
    assert_eq!(url, "https://api.example.test/api/breaking");
}

#[test]
fn query_keeps_insertion_order() {
    let spec = RequestSpec::get("/api/orderbook")
        .with_query("symbol", "BTCUSDT")
        .with_query("exchange", "binance")
        .with_query("depth", "20");
    let url = spec
        .url(&base("https://api.example.test"))
        .expect("valid url");
    assert_eq!(
        url,
        "https://api.example.test/api/orderbook?symbol=BTCUSDT&exchange=binance&depth=20"
    );
}

#[test]
fn query_values_are_encoded_and_round_trip() {
    let params = pairs(&[
        ("q", "Ethereum ETF & more"),
        ("filter", "a=b;c"),
        ("path", "../../etc/passwd"),
        ("lang", "日本語"),
        ("plus", "1+1"),
    ]);
    let url = build_url(&base("https://api.example.test"), "/api/search", &params)
        .expect("valid url");

    let parsed = Url::parse(&url).expect("built url parses");
    assert_eq!(parsed.host_str(), Some("api.example.test"));
    assert_eq!(parsed.path(), "/api/search");
    let recovered: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(recovered, params);
    assert!(!url.contains(' '));
    assert!(!url.contains("../"));
}

#[test]
fn encode_query_is_form_urlencoded() {
    let encoded = encode_query(&pairs(&[("coins", "bitcoin,ethereum"), ("q", "a b")]));
    assert_eq!(encoded, "coins=bitcoin%2Cethereum&q=a+b");
}

#[test]
fn base_path_prefix_is_kept() {
    for raw in ["https://api.example.test/v1", "https://api.example.test/v1/"] {
        let url = build_url(&base(raw), "/news", &[]).expect("valid url");
        assert_eq!(url, "https://api.example.test/v1/news");
    }
}

#[test]
fn double_slash_path_stays_on_the_base_host() {
    let url = build_url(&base("https://api.example.test"), "//evil.test/steal", &[])
        .expect("path is still relative to the base");
    let parsed = Url::parse(&url).expect("built url parses");
    assert_eq!(parsed.host_str(), Some("api.example.test"));
}

#[test]
fn paths_that_could_escape_the_base_are_rejected() {
    let base = base("https://api.example.test/v1");
    for path in [
        "api/news",
        "/../admin",
        "/api/../../admin",
        "/api/%2e%2e/admin",
        "/api/%2E%2E",
        "/api/./news",
        "/api\\..\\admin",
        "/api/news?limit=5",
        "/api/news#frag",
        "/.\t./v1admin",
        "/.\n./admin",
        "/api/\r/news",
        "/api/\u{7f}",
    ] {
        let err = build_url(&base, path, &[]).expect_err(path);
        assert!(matches!(err, RestError::InvalidRequest(_)), "{path}: {err}");
    }
}

#[tokio::test]
async fn api_key_header_is_sent_with_the_exact_value() {
    let adapter = MockRestAdapter::new();
    adapter.queue_response(MockResponse::text(200, "{}"));
    let config = ClientConfig::builder("https://api.example.test")
        .api_key("cda_secret-123")
        .build()
        .expect("valid config");
    let client = RestClient::with_transport(config, adapter.clone());

    let _: sonic_rs::Value = client
        .get("/api/news", &[("limit", "1")])
        .await
        .expect("request should succeed");

    let request = adapter.last_request().expect("request logged");
    assert_eq!(request.header("X-API-Key"), Some(b"cda_secret-123".as_slice()));
    assert_eq!(request.header("accept"), Some(b"application/json".as_slice()));
    assert!(request.header("content-type").is_none());
}

#[tokio::test]
async fn anonymous_client_sends_no_auth_header() {
    let adapter = MockRestAdapter::new();
    adapter.queue_response(MockResponse::text(200, "{}"));
    let client = RestClient::with_transport(
        ClientConfig::builder("https://api.example.test")
            .build()
            .expect("valid config"),
        adapter.clone(),
    );

    let _: sonic_rs::Value = client
        .get("/api/news", &[])
        .await
        .expect("request should succeed");

    let request = adapter.last_request().expect("request logged");
    assert!(request.header("x-api-key").is_none());
    assert!(request.header("authorization").is_none());
    assert_eq!(request.headers.len(), 1, "only Accept is sent");
}

#[tokio::test]
async fn custom_auth_header_name_and_user_agent_are_used() {
    let adapter = MockRestAdapter::new();
    adapter.queue_response(MockResponse::text(200, "{}"));
    let config = ClientConfig::builder("https://api.example.test")
        .api_key("k")
        .api_key_header("X-Custom-Key")
        .user_agent("typed-restapi-tests/1")
        .build()
        .expect("valid config");
    let client = RestClient::with_transport(config, adapter.clone());

    let _: sonic_rs::Value = client
        .get("/api/news", &[])
        .await
        .expect("request should succeed");

    let request = adapter.last_request().expect("request logged");
    assert_eq!(request.header("x-custom-key"), Some(b"k".as_slice()));
    assert!(request.header("x-api-key").is_none());
    assert_eq!(
        request.header("user-agent"),
        Some(b"typed-restapi-tests/1".as_slice())
    );
}

#[tokio::test]
async fn post_json_sends_body_and_content_type() {
    #[derive(serde::Serialize)]
    struct Question<'a> {
        q: &'a str,
    }

    let adapter = MockRestAdapter::new();
    adapter.queue_post_response(
        "https://api.example.test/api/ask",
        MockResponse::text(200, r#"{"answer":"42"}"#),
    );
    let client = RestClient::with_transport(
        ClientConfig::builder("https://api.example.test")
            .build()
            .expect("valid config"),
        adapter.clone(),
    );

    let answer: sonic_rs::Value = client
        .post_json("/api/ask", &Question { q: "meaning" })
        .await
        .expect("post should succeed");
    assert_eq!(answer, sonic_rs::json!({"answer": "42"}));

    let request = adapter.last_request().expect("request logged");
    assert_eq!(request.method, reqwest::Method::POST);
    assert_eq!(request.header("content-type"), Some(b"application/json".as_slice()));
    assert_eq!(request.body.as_deref(), Some(br#"{"q":"meaning"}"#.as_slice()));
}
