//! Walks a handful of news API endpoints and prints a short summary of each.
//!
//! Configuration comes from the environment (or a `.env` file):
//! `CRYPTO_NEWS_BASE_URL`, `CRYPTO_NEWS_API_KEY`, `CRYPTO_NEWS_TIMEOUT_SECS`.
//! Without a base URL the public deployment is used.

use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use typed_restapi::news::{Article, DEFAULT_BASE_URL};
use typed_restapi::{ClientConfig, NewsClient, RestClient, RestResult};

const ENV_PREFIX: &str = "CRYPTO_NEWS";

fn load_config() -> RestResult<ClientConfig> {
    if env::var(format!("{ENV_PREFIX}_BASE_URL")).is_ok() {
        return ClientConfig::from_env(ENV_PREFIX);
    }
    ClientConfig::builder(DEFAULT_BASE_URL)
        .maybe_api_key(env::var(format!("{ENV_PREFIX}_API_KEY")).ok())
        .build()
}

fn print_titles(articles: &[Article], max: usize) {
    for (index, article) in articles.iter().take(max).enumerate() {
        let title: String = article.title.chars().take(60).collect();
        let ellipsis = if article.title.chars().count() > 60 { "..." } else { "" };
        println!("   {}. {title}{ellipsis}", index + 1);
    }
}

#[tokio::main]
async fn main() -> RestResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    tracing::info!(?config, "starting news demo");
    let client = NewsClient::from_rest(RestClient::from_config(config));

    println!("Latest news");
    match client.news(5, "", "").await {
        Ok(news) => print_titles(&news.articles, 5),
        Err(err) => println!("   error: {err}"),
    }

    println!("Bitcoin news");
    match client.bitcoin_news(3).await {
        Ok(news) => print_titles(&news.articles, 3),
        Err(err) => println!("   error: {err}"),
    }

    println!("Search 'Ethereum ETF'");
    match client.search_news("Ethereum ETF", 3).await {
        Ok(news) => print_titles(&news.articles, 3),
        Err(err) => println!("   error: {err}"),
    }

    println!("BTC sentiment");
    match client.sentiment("BTC", 20).await {
        Ok(sentiment) => println!("   score: {:.2} ({})", sentiment.score, sentiment.label),
        Err(err) => println!("   error: {err}"),
    }

    println!("Fear & Greed index");
    match client.fear_greed().await {
        Ok(index) => println!("   value: {} ({})", index.value, index.classification),
        Err(err) => println!("   error: {err}"),
    }

    println!("Top coins");
    match client.coins(5, "market_cap_desc").await {
        Ok(coins) => {
            for coin in coins {
                println!("   {}: ${:.2}", coin.name, coin.current_price);
            }
        }
        Err(err) => println!("   error: {err}"),
    }

    println!("Arbitrage opportunities");
    match client.arbitrage(0.5, 5).await {
        Ok(opportunities) => println!("   found {} opportunities", opportunities.len()),
        Err(err) => println!("   error: {err}"),
    }

    println!("Whale alerts");
    match client.whale_alerts(5_000_000, 5).await {
        Ok(alerts) => println!("   found {} whale transactions", alerts.len()),
        Err(err) => println!("   error: {err}"),
    }

    Ok(())
}
