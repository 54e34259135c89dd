//! AI summarization backend: provider abstraction over the DeepSeek chat API,
//! plus disabled and mock clients so the enricher is testable offline.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetch::FetchError;

/// Input sent to the backend is bounded; anything longer adds cost, not signal.
const PROMPT_CONTENT_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    Zh,
    En,
}

/// Summarization backend seam. `is_configured` lets the enricher skip the
/// network path entirely and go straight to the extractive fallback.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    fn is_configured(&self) -> bool;
    async fn summarize(&self, text: &str, locale: Locale) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Factory honoring the same env switches the rest of the app uses:
/// * `AI_TEST_MODE=mock` → deterministic mock client
/// * `DEEPSEEK_API_KEY` unset/empty → disabled client (fallback-only)
pub fn build_summarizer() -> DynSummarizer {
    if std::env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        return Arc::new(MockSummarizer {
            fixed: "Mock summary.".to_string(),
        });
    }
    match std::env::var("DEEPSEEK_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(DeepSeekClient::new(key, None)),
        _ => {
            tracing::warn!("DEEPSEEK_API_KEY not configured; summaries use the extractive fallback");
            Arc::new(DisabledSummarizer)
        }
    }
}

// ------------------------------------------------------------
// DeepSeek provider
// ------------------------------------------------------------

pub struct DeepSeekClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl DeepSeekClient {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("deepseek-chat").to_string(),
        }
    }

    fn prompt(text: &str, locale: Locale) -> String {
        let bounded = crate::fetch::truncate_chars(text, PROMPT_CONTENT_CAP);
        match locale {
            Locale::Zh => format!(
                "请将以下技术新闻内容总结成简洁的中文摘要，控制在80字以内：\n\n{bounded}"
            ),
            Locale::En => format!(
                "Please summarize the following technical news content into a concise English summary within 80 words:\n\n{bounded}"
            ),
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for DeepSeekClient {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn summarize(&self, text: &str, locale: Locale) -> Result<String, FetchError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            max_tokens: u32,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let prompt = Self::prompt(text, locale);
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
            max_tokens: 150,
            temperature: 0.1,
        };

        let resp = self
            .http
            .post("https://api.deepseek.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(FetchError::Parse("empty completion".into()));
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "deepseek"
    }
}

// ------------------------------------------------------------
// Disabled / mock clients
// ------------------------------------------------------------

/// Used when no API key is configured; the enricher never calls it.
pub struct DisabledSummarizer;

#[async_trait::async_trait]
impl Summarizer for DisabledSummarizer {
    fn is_configured(&self) -> bool {
        false
    }

    async fn summarize(&self, _text: &str, _locale: Locale) -> Result<String, FetchError> {
        Err(FetchError::Parse("summarizer disabled".into()))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic client for tests and local runs.
#[derive(Clone)]
pub struct MockSummarizer {
    pub fixed: String,
}

#[async_trait::async_trait]
impl Summarizer for MockSummarizer {
    fn is_configured(&self) -> bool {
        true
    }

    async fn summarize(&self, _text: &str, locale: Locale) -> Result<String, FetchError> {
        Ok(match locale {
            Locale::Zh => format!("[zh] {}", self.fixed),
            Locale::En => format!("[en] {}", self.fixed),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
