// src/notify/email.rs
// Daily digest delivery over SMTP. Invoked only from the scheduled
// aggregation path; failures are reported to the caller, never propagated
// into the aggregation result.

use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::types::ContentSnapshot;

const DIGEST_TRENDING_LIMIT: usize = 10;
const DIGEST_NEWS_LIMIT: usize = 10;

pub struct DigestMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl DigestMailer {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("DIGEST_FROM").context("DIGEST_FROM missing")?;
        let to_addr = std::env::var("DIGEST_TO").context("DIGEST_TO missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid DIGEST_FROM")?;
        let to = to_addr.parse().context("invalid DIGEST_TO")?;

        Ok(Self { mailer, from, to })
    }

    pub async fn send_digest(&self, snapshot: &ContentSnapshot) -> Result<()> {
        let subject = format!(
            "Daily digest: {} trending repos, {} news items",
            snapshot.trending.len(),
            snapshot.news.len()
        );

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(render_digest(snapshot))
            .context("build digest email")?;

        self.mailer.send(msg).await.context("send digest email")?;
        Ok(())
    }
}

/// Plain-text digest body: top trending repos plus the latest summaries.
pub fn render_digest(snapshot: &ContentSnapshot) -> String {
    let mut body = String::new();
    body.push_str("== Trending repositories ==\n");
    for item in snapshot.trending.iter().take(DIGEST_TRENDING_LIMIT) {
        body.push_str(&format!(
            "* {} ({} stars{})\n  {}\n  {}\n",
            item.title,
            item.stars,
            item.language
                .as_deref()
                .map(|l| format!(", {l}"))
                .unwrap_or_default(),
            item.description,
            item.repo_url
        ));
    }

    body.push_str("\n== AI news ==\n");
    for item in snapshot.news.iter().take(DIGEST_NEWS_LIMIT) {
        body.push_str(&format!(
            "* {} [{}]\n  {}\n  {}\n",
            item.title, item.source, item.summary_en, item.url
        ));
    }

    body.push_str(&format!("\nGenerated at {}\n", snapshot.last_updated.to_rfc3339()));
    body
}
