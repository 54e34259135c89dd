// src/enrich/mod.rs
// Converts raw feed items into summarized news. AI enrichment is time-boxed
// and best-effort; the extractive fallback guarantees both summaries exist.

pub mod ai;

use std::time::Duration;

use metrics::counter;
use tokio::time::timeout;

use crate::enrich::ai::{DynSummarizer, Locale};
use crate::fetch::{truncate_chars, with_retry, RetryPolicy};
use crate::types::{NewsItem, RawNewsItem};

/// Items with less text than this go straight to the extractive fallback;
/// there is nothing for the model to add.
const MIN_AI_TEXT_CHARS: usize = 200;
/// Fallback summaries are clipped to this many chars (plus the ellipsis).
const FALLBACK_MAX_CHARS: usize = 150;
/// A candidate first sentence must be longer than this to stand alone.
const MIN_SENTENCE_CHARS: usize = 10;

pub struct NewsEnricher {
    summarizer: DynSummarizer,
    policy: RetryPolicy,
    batch_timeout: Duration,
    inter_request_delay: Duration,
    inter_item_delay: Duration,
}

impl NewsEnricher {
    pub fn new(summarizer: DynSummarizer, batch_timeout: Duration) -> Self {
        Self {
            summarizer,
            policy: RetryPolicy::default(),
            batch_timeout,
            inter_request_delay: Duration::from_secs(1),
            inter_item_delay: Duration::from_millis(500),
        }
    }

    /// Test hook: drop the pacing delays so batch tests run instantly.
    pub fn without_delays(mut self) -> Self {
        self.inter_request_delay = Duration::ZERO;
        self.inter_item_delay = Duration::ZERO;
        self.policy.backoff = Duration::ZERO;
        self
    }

    /// Enrich a batch under the batch deadline. If the deadline fires, every
    /// item resolves to its extractive fallback instead; this method never
    /// fails and never drops an item.
    pub async fn enrich(&self, items: Vec<RawNewsItem>) -> Vec<NewsItem> {
        match timeout(self.batch_timeout, self.enrich_all(&items)).await {
            Ok(done) => done,
            Err(_) => {
                tracing::warn!(
                    items = items.len(),
                    "news enrichment hit the batch deadline; serving extractive summaries"
                );
                counter!("enrich_fallback_total").increment(items.len() as u64);
                items.into_iter().map(|raw| fallback_item(&raw)).collect()
            }
        }
    }

    async fn enrich_all(&self, items: &[RawNewsItem]) -> Vec<NewsItem> {
        let mut out = Vec::with_capacity(items.len());
        for (i, raw) in items.iter().enumerate() {
            out.push(self.enrich_one(raw).await);
            if i + 1 < items.len() && !self.inter_item_delay.is_zero() {
                tokio::time::sleep(self.inter_item_delay).await;
            }
        }
        out
    }

    /// One item, isolated: any backend failure resolves to the fallback and
    /// the batch moves on.
    async fn enrich_one(&self, raw: &RawNewsItem) -> NewsItem {
        let text = if raw.raw_text.is_empty() {
            raw.title.as_str()
        } else {
            raw.raw_text.as_str()
        };

        let use_ai =
            self.summarizer.is_configured() && text.chars().count() > MIN_AI_TEXT_CHARS;
        if !use_ai {
            return fallback_item(raw);
        }

        let summary_zh = self.summarize_or_fallback(text, Locale::Zh, raw).await;
        if !self.inter_request_delay.is_zero() {
            tokio::time::sleep(self.inter_request_delay).await;
        }
        let summary_en = self.summarize_or_fallback(text, Locale::En, raw).await;

        NewsItem {
            title: raw.title.clone(),
            url: raw.url.clone(),
            raw_text: raw.raw_text.clone(),
            summary_zh,
            summary_en,
            published_at: raw.published_at,
            source: raw.source.clone(),
        }
    }

    async fn summarize_or_fallback(&self, text: &str, locale: Locale, raw: &RawNewsItem) -> String {
        match with_retry(&self.policy, || self.summarizer.summarize(text, locale)).await {
            Ok(s) if !s.trim().is_empty() => s,
            Ok(_) => {
                counter!("enrich_fallback_total").increment(1);
                fallback_summary_for(raw)
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.summarizer.name(),
                    url = %raw.url,
                    error = %e,
                    "summary request exhausted retries; using fallback"
                );
                counter!("enrich_fallback_total").increment(1);
                fallback_summary_for(raw)
            }
        }
    }
}

/// Build a fully fallback-summarized item.
pub fn fallback_item(raw: &RawNewsItem) -> NewsItem {
    let summary = fallback_summary_for(raw);
    NewsItem {
        title: raw.title.clone(),
        url: raw.url.clone(),
        raw_text: raw.raw_text.clone(),
        summary_zh: summary.clone(),
        summary_en: summary,
        published_at: raw.published_at,
        source: raw.source.clone(),
    }
}

fn fallback_summary_for(raw: &RawNewsItem) -> String {
    let text = if raw.raw_text.is_empty() {
        raw.title.as_str()
    } else {
        raw.raw_text.as_str()
    };
    let summary = fallback_summary(text);
    if summary.is_empty() {
        truncate_chars(&raw.title, FALLBACK_MAX_CHARS)
    } else {
        summary
    }
}

/// Extractive summary: the first real sentence of the text, clipped.
/// Sentence terminators cover both Latin and CJK punctuation. For any
/// non-empty input this returns a non-empty string of at most
/// `FALLBACK_MAX_CHARS` chars plus an ellipsis marker when clipped.
pub fn fallback_summary(content: &str) -> String {
    let first_sentence = content
        .split(['.', '!', '?', '。', '！', '？'])
        .map(str::trim)
        .find(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_chars(content.trim(), 100));

    if first_sentence.chars().count() > FALLBACK_MAX_CHARS {
        format!("{}...", truncate_chars(&first_sentence, FALLBACK_MAX_CHARS))
    } else {
        first_sentence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_takes_first_qualifying_sentence() {
        let s = fallback_summary("Short. This sentence is long enough to qualify. Another one.");
        assert_eq!(s, "This sentence is long enough to qualify");
    }

    #[test]
    fn fallback_handles_cjk_terminators() {
        let s = fallback_summary("这是一条足够长的中文新闻摘要测试句子。后续内容。");
        assert_eq!(s, "这是一条足够长的中文新闻摘要测试句子");
    }

    #[test]
    fn fallback_without_punctuation_clips_to_100() {
        let long = "word ".repeat(60);
        let s = fallback_summary(&long);
        assert!(!s.is_empty());
        assert!(s.chars().count() <= 100);
    }

    #[test]
    fn fallback_clips_long_sentences_with_ellipsis() {
        let sentence = format!("{}.", "a".repeat(400));
        let s = fallback_summary(&sentence);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), FALLBACK_MAX_CHARS + 3);
    }

    #[test]
    fn fallback_never_empty_for_non_empty_input() {
        for input in ["x", "hi", "标题", "a b c d e f", "........"] {
            let raw = RawNewsItem {
                title: "A reasonable headline".into(),
                url: "https://example.com/a".into(),
                raw_text: input.to_string(),
                published_at: chrono::Utc::now(),
                source: "t".into(),
            };
            let item = fallback_item(&raw);
            assert!(!item.summary_zh.is_empty(), "input {input:?}");
            assert!(!item.summary_en.is_empty(), "input {input:?}");
        }
    }
}
