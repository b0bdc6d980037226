//! Client for the Free Crypto News REST API.
//!
//! Every endpoint is a row in [`endpoints`]; the typed methods on
//! [`NewsClient`] only pick a row, fill in arguments and name the result
//! type. Endpoints without a typed record are reachable through
//! [`NewsClient::call`].

use serde::{Deserialize, Serialize};

use crate::client::RestClient;
use crate::config::ClientConfig;
use crate::endpoint::EndpointDescriptor;
use crate::error::RestResult;

pub const DEFAULT_BASE_URL: &str = "https://cryptocurrency.cv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default, rename = "price_change_percentage_24h")]
    pub price_change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedIndex {
    pub value: i64,
    pub classification: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResult {
    #[serde(default)]
    pub asset: String,
    pub score: f64,
    pub label: String,
    #[serde(default)]
    pub positive: u64,
    #[serde(default)]
    pub negative: u64,
    #[serde(default)]
    pub neutral: u64,
    #[serde(default)]
    pub updated_at: String,
}

/// One candle as `[timestamp, open, high, low, close]`.
pub type Ohlc = Vec<f64>;

pub mod endpoints {
    use crate::endpoint::EndpointDescriptor as E;

    pub const NEWS: E = E::get("news", "/api/news")
        .with_query_params(&["limit", "category", "source"])
        .with_optional_query(&["category", "source"]);
    pub const BITCOIN: E = E::get("bitcoin", "/api/bitcoin").with_query_params(&["limit"]);
    pub const DEFI: E = E::get("defi", "/api/defi").with_query_params(&["limit"]);
    pub const BREAKING: E = E::get("breaking", "/api/breaking");
    pub const SEARCH: E = E::get("search", "/api/search").with_query_params(&["q", "limit"]);
    pub const TRENDING: E = E::get("trending", "/api/trending").with_query_params(&["limit"]);
    pub const INTERNATIONAL: E = E::get("international", "/api/news/international")
        .with_query_params(&["lang", "translate"])
        .with_optional_query(&["lang"]);

    pub const SENTIMENT: E = E::get("sentiment", "/api/sentiment")
        .with_query_params(&["asset", "limit"])
        .with_optional_query(&["asset"]);
    pub const ASK: E = E::get("ask", "/api/ask").with_query_params(&["q"]);
    pub const AI_BRIEF: E = E::get("ai_brief", "/api/ai/brief");
    pub const NARRATIVES: E = E::get("narratives", "/api/narratives").with_query_params(&["limit"]);

    pub const MARKET_COINS: E = E::get("market_coins", "/api/market/coins")
        .with_query_params(&["limit", "order"])
        .with_optional_query(&["order"]);
    pub const OHLC: E = E::get("ohlc", "/api/market/ohlc/{coin_id}")
        .with_path_params(&["coin_id"])
        .with_query_params(&["days"]);
    pub const FEAR_GREED: E = E::get("fear_greed", "/api/fear-greed");
    pub const COMPARE: E = E::get("compare", "/api/market/compare").with_query_params(&["coins"]);
    pub const DEFI_MARKET: E = E::get("defi_market", "/api/market/defi");

    pub const ARBITRAGE: E = E::get("arbitrage", "/api/arbitrage").with_query_params(&["min_spread", "limit"]);
    pub const SIGNALS: E = E::get("signals", "/api/signals")
        .with_query_params(&["asset", "timeframe"])
        .with_optional_query(&["asset"]);
    pub const FUNDING: E = E::get("funding", "/api/funding")
        .with_query_params(&["exchange"])
        .with_optional_query(&["exchange"]);
    pub const WHALE_ALERTS: E =
        E::get("whale_alerts", "/api/whale-alerts").with_query_params(&["min_value", "limit"]);
    pub const ORDERBOOK: E =
        E::get("orderbook", "/api/orderbook").with_query_params(&["symbol", "exchange", "depth"]);

    pub const REGULATORY: E = E::get("regulatory", "/api/regulatory")
        .with_query_params(&["region", "limit"])
        .with_optional_query(&["region"]);
    pub const ETF: E = E::get("etf", "/api/regulatory/etf")
        .with_query_params(&["type"])
        .with_optional_query(&["type"]);

    pub const NFT: E = E::get("nft", "/api/nft").with_query_params(&["limit"]);
    pub const GAS: E = E::get("gas", "/api/onchain/gas").with_query_params(&["chain"]);
    pub const ONCHAIN_DEFI: E = E::get("onchain_defi", "/api/onchain/defi")
        .with_query_params(&["protocol"])
        .with_optional_query(&["protocol"]);

    pub const RSS: E = E::get("rss", "/api/rss.json")
        .with_query_params(&["category", "limit"])
        .with_optional_query(&["category"]);

    pub const ALL: &[E] = &[
        NEWS,
        BITCOIN,
        DEFI,
        BREAKING,
        SEARCH,
        TRENDING,
        INTERNATIONAL,
        SENTIMENT,
        ASK,
        AI_BRIEF,
        NARRATIVES,
        MARKET_COINS,
        OHLC,
        FEAR_GREED,
        COMPARE,
        DEFI_MARKET,
        ARBITRAGE,
        SIGNALS,
        FUNDING,
        WHALE_ALERTS,
        ORDERBOOK,
        REGULATORY,
        ETF,
        NFT,
        GAS,
        ONCHAIN_DEFI,
        RSS,
    ];

    /// Looks an endpoint up by its descriptor name.
    pub fn by_name(name: &str) -> Option<&'static E> {
        ALL.iter().find(|endpoint| endpoint.name == name)
    }
}

/// Typed facade over [`RestClient`] for the news API.
#[derive(Clone, Debug)]
pub struct NewsClient {
    rest: RestClient,
}

impl NewsClient {
    /// Client for the public deployment, optionally authenticated.
    pub fn new(api_key: Option<String>) -> RestResult<Self> {
        let config = ClientConfig::builder(DEFAULT_BASE_URL)
            .maybe_api_key(api_key)
            .build()?;
        Ok(Self::from_rest(RestClient::from_config(config)))
    }

    pub fn from_rest(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Calls any descriptor and returns the untyped JSON.
    pub async fn call(
        &self,
        endpoint: &EndpointDescriptor,
        path_args: &[(&str, &str)],
        query_args: &[(&str, &str)],
    ) -> RestResult<sonic_rs::Value> {
        self.typed(endpoint, path_args, query_args).await
    }

    async fn typed<T>(
        &self,
        endpoint: &EndpointDescriptor,
        path_args: &[(&str, &str)],
        query_args: &[(&str, &str)],
    ) -> RestResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let spec = endpoint.build(path_args, query_args)?;
        self.rest.request(spec).await
    }

    pub async fn news(&self, limit: u32, category: &str, source: &str) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(
            &endpoints::NEWS,
            &[],
            &[("limit", limit.as_str()), ("category", category), ("source", source)],
        )
        .await
    }

    pub async fn bitcoin_news(&self, limit: u32) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(&endpoints::BITCOIN, &[], &[("limit", limit.as_str())]).await
    }

    pub async fn defi_news(&self, limit: u32) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(&endpoints::DEFI, &[], &[("limit", limit.as_str())]).await
    }

    pub async fn breaking_news(&self) -> RestResult<NewsResponse> {
        self.typed(&endpoints::BREAKING, &[], &[]).await
    }

    pub async fn search_news(&self, query: &str, limit: u32) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(&endpoints::SEARCH, &[], &[("q", query), ("limit", limit.as_str())])
            .await
    }

    pub async fn international_news(&self, lang: &str, translate: bool) -> RestResult<NewsResponse> {
        let translate = translate.to_string();
        self.typed(
            &endpoints::INTERNATIONAL,
            &[],
            &[("lang", lang), ("translate", translate.as_str())],
        )
        .await
    }

    pub async fn sentiment(&self, asset: &str, limit: u32) -> RestResult<SentimentResult> {
        let limit = limit.to_string();
        self.typed(&endpoints::SENTIMENT, &[], &[("asset", asset), ("limit", limit.as_str())])
            .await
    }

    pub async fn coins(&self, limit: u32, order: &str) -> RestResult<Vec<Coin>> {
        let limit = limit.to_string();
        self.typed(&endpoints::MARKET_COINS, &[], &[("limit", limit.as_str()), ("order", order)])
            .await
    }

    pub async fn ohlc(&self, coin_id: &str, days: u32) -> RestResult<Vec<Ohlc>> {
        let days = days.to_string();
        self.typed(&endpoints::OHLC, &[("coin_id", coin_id)], &[("days", days.as_str())])
            .await
    }

    pub async fn fear_greed(&self) -> RestResult<FearGreedIndex> {
        self.typed(&endpoints::FEAR_GREED, &[], &[]).await
    }

    pub async fn compare_coins(&self, coins: &[&str]) -> RestResult<sonic_rs::Value> {
        let coins = coins.join(",");
        self.call(&endpoints::COMPARE, &[], &[("coins", coins.as_str())]).await
    }

    /// One JSON object per opportunity.
    pub async fn arbitrage(&self, min_spread: f64, limit: u32) -> RestResult<Vec<sonic_rs::Value>> {
        let min_spread = format!("{min_spread:.2}");
        let limit = limit.to_string();
        self.typed(
            &endpoints::ARBITRAGE,
            &[],
            &[("min_spread", min_spread.as_str()), ("limit", limit.as_str())],
        )
        .await
    }

    pub async fn whale_alerts(&self, min_value: u64, limit: u32) -> RestResult<Vec<sonic_rs::Value>> {
        let min_value = min_value.to_string();
        let limit = limit.to_string();
        self.typed(
            &endpoints::WHALE_ALERTS,
            &[],
            &[("min_value", min_value.as_str()), ("limit", limit.as_str())],
        )
        .await
    }

    pub async fn regulatory_news(&self, region: &str, limit: u32) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(&endpoints::REGULATORY, &[], &[("region", region), ("limit", limit.as_str())])
            .await
    }

    pub async fn etf_news(&self, etf_type: &str) -> RestResult<NewsResponse> {
        self.typed(&endpoints::ETF, &[], &[("type", etf_type)]).await
    }

    pub async fn nft_news(&self, limit: u32) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(&endpoints::NFT, &[], &[("limit", limit.as_str())]).await
    }

    pub async fn rss_feed(&self, category: &str, limit: u32) -> RestResult<NewsResponse> {
        let limit = limit.to_string();
        self.typed(&endpoints::RSS, &[], &[("category", category), ("limit", limit.as_str())])
            .await
    }
}
