use std::env;
use std::fmt;

use async_trait::async_trait;
use eyre::{Result, eyre};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};
use url::Url;

const DEFAULT_ASK_URL: &str = "https://unachatbot.onrender.com/ask_questions/";
const DEFAULT_NEWS_URL: &str = "https://news-llm-generator.onrender.com/llm/ask_una/";

/// Which of the two remote APIs a turn is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `ask_questions` — prose answers and similar-question suggestions.
    Questions,
    /// `ask_una` — structured news items.
    News,
}

/// Failure of a single turn's request. The chat layer collapses every
/// variant into the same fallback bubble; the distinction exists for logs.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(StatusCode),
}

/// Opaque identifier the backend attaches to each suggested question.
/// The current deployment sends integers, but nothing here assumes that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(Value);

impl SuggestionId {
    /// Parse an id as typed by the user: numeric when it looks numeric,
    /// otherwise the raw string.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<u64>() {
            Ok(n) => SuggestionId(Value::from(n)),
            Err(_) => SuggestionId(Value::from(raw)),
        }
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<u64> for SuggestionId {
    fn from(n: u64) -> Self {
        SuggestionId(Value::from(n))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarQuestion {
    pub id: SuggestionId,
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub link: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub search_url: Option<String>,
}

/// The `answer` field differs between the two APIs: the questions API
/// returns prose (possibly HTML), the news API a list of structured items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    News(Vec<NewsItem>),
}

/// Response body shared by both APIs. Absent fields decode to their
/// defaults so either endpoint can be read through the same type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: Option<Answer>,
    #[serde(default)]
    pub similar_questions: Vec<SimilarQuestion>,
}

/// Seam between the chat loop and the network, so turn handling can be
/// exercised against a scripted service.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, endpoint: Endpoint, question: &str) -> Result<AskResponse, QaError>;
}

pub struct QaClient {
    client: reqwest::Client,
    ask_url: Url,
    news_url: Url,
}

impl QaClient {
    pub fn new() -> Result<Self> {
        let ask_url = url_from_env("UNA_ASK_URL", DEFAULT_ASK_URL)?;
        let news_url = url_from_env("UNA_NEWS_URL", DEFAULT_NEWS_URL)?;

        Ok(Self {
            client: reqwest::Client::new(),
            ask_url,
            news_url,
        })
    }
}

fn url_from_env(var: &str, default: &str) -> Result<Url> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| eyre!("{} is not a valid URL ({}): {}", var, raw, e))
}

#[async_trait]
impl AnswerService for QaClient {
    async fn ask(&self, endpoint: Endpoint, question: &str) -> Result<AskResponse, QaError> {
        let url = match endpoint {
            Endpoint::Questions => &self.ask_url,
            Endpoint::News => &self.news_url,
        };

        debug!("POST {} question={:?}", url, question);

        let response = self
            .client
            .post(url.clone())
            .json(&json!({ "question": question }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("request to {} failed with {}: {}", url, status, body);
            return Err(QaError::Status(status));
        }

        let decoded: AskResponse = response.json().await?;
        debug!(
            "answer present: {}, similar questions: {}",
            decoded.answer.is_some(),
            decoded.similar_questions.len()
        );

        Ok(decoded)
    }
}
