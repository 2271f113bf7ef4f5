use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::news::{NewsItem, NEUTRAL_SENTIMENT};
use super::backend_proxy::{backend_error_message, lenient_number};
use super::traits::NewsSource;

const PROVIDER: &str = "Portfolio news";

/// Client for the backend's news digest, `POST /api/portfolio/news` with
/// `{"symbols": "AAPL, MSFT"}`.
///
/// The backend answers `{"message": "..."}` where the message is model
/// output that should contain a JSON array of stories, possibly wrapped in
/// a markdown fence or surrounded by prose.
pub struct BackendNewsClient {
    client: Client,
    base_url: String,
}

impl BackendNewsClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_secs;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl NewsSource for BackendNewsClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<NewsItem>, CoreError> {
        let joined = symbols.join(", ");
        tracing::info!(symbols = %joined, "requesting portfolio news");

        let url = format!("{}/api/portfolio/news", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "symbols": joined }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: backend_error_message(status.as_u16(), &body),
            });
        }
        parse_news_response(&body, chrono::Utc::now().date_naive())
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Parse the backend's `{"message": "..."}` envelope.
pub fn parse_news_response(body: &str, today: NaiveDate) -> Result<Vec<NewsItem>, CoreError> {
    let resp: NewsResponse = serde_json::from_str(body)?;
    let message = resp.message.ok_or_else(|| CoreError::Api {
        provider: PROVIDER.into(),
        message: "News response had no message".into(),
    })?;
    parse_news_message(&message, today)
}

/// Pull the story list out of model text and normalize every story.
///
/// Missing fields get placeholders (`date` defaults to `today`) and
/// sentiment is clamped to `[0, 1]`. Entries that aren't objects are
/// skipped. No stories at all is an error.
pub fn parse_news_message(message: &str, today: NaiveDate) -> Result<Vec<NewsItem>, CoreError> {
    let json = extract_json_array(message);
    let entries: Vec<Value> = serde_json::from_str(json)?;

    let today = today.format("%Y-%m-%d").to_string();
    let items: Vec<NewsItem> = entries
        .iter()
        .filter_map(|entry| match entry.as_object() {
            Some(obj) => Some(normalize(obj, &today)),
            None => {
                tracing::warn!(entry = %entry, "skipping news entry that is not an object");
                None
            }
        })
        .collect();

    if items.is_empty() {
        return Err(CoreError::Deserialization("Invalid news data format".into()));
    }
    Ok(items)
}

fn extract_json_array(text: &str) -> &str {
    let text = text.trim();
    for fence in ["```json", "```"] {
        if let Some((_, rest)) = text.split_once(fence) {
            return rest.split("```").next().unwrap_or(rest).trim();
        }
    }
    if text.starts_with('[') && text.ends_with(']') {
        return text;
    }
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn normalize(obj: &Map<String, Value>, today: &str) -> NewsItem {
    let text = |keys: [&str; 2], default: &str| {
        keys.iter()
            .filter_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    let sentiment = ["sentiment", "Sentiment"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(lenient_number))
        .unwrap_or(NEUTRAL_SENTIMENT)
        .clamp(0.0, 1.0);

    NewsItem {
        title: text(["title", "Title"], "Untitled"),
        source: text(["source", "Source"], "Unknown Source"),
        date: text(["date", "Date"], today),
        url: text(["url", "URL"], ""),
        summary: text(["summary", "Summary"], "No summary available"),
        sentiment,
    }
}
