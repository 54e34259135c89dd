// src/fetch/providers/mod.rs
pub mod github_search;
pub mod github_trending;
pub mod news_rss;
