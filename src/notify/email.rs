// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::DigestNotifier;
use crate::digest::RenderedDigest;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    cc: Vec<Mailbox>,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Comma-separated addresses; blanks are ignored.
pub fn parse_cc_list(raw: &str) -> Result<Vec<Mailbox>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Mailbox>()
                .with_context(|| format!("invalid NOTIFY_EMAIL_CC address: {s}"))
        })
        .collect()
}

impl EmailNotifier {
    /// `Ok(None)` when any required variable is missing; `Err` when one is
    /// present but invalid.
    pub fn from_env() -> Result<Option<Self>> {
        let (Some(host), Some(user), Some(pass), Some(from_addr), Some(to_addr)) = (
            env_nonempty("SMTP_HOST"),
            env_nonempty("SMTP_USER"),
            env_nonempty("SMTP_PASS"),
            env_nonempty("NOTIFY_EMAIL_FROM"),
            env_nonempty("NOTIFY_EMAIL_TO"),
        ) else {
            return Ok(None);
        };

        let creds = Credentials::new(user, pass);
        // relay(): implicit TLS on 465
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host.trim())
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.trim().parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.trim().parse().context("invalid NOTIFY_EMAIL_TO")?;
        let cc = match env_nonempty("NOTIFY_EMAIL_CC") {
            Some(raw) => parse_cc_list(&raw)?,
            None => Vec::new(),
        };

        Ok(Some(Self {
            mailer,
            from,
            to,
            cc,
        }))
    }

    pub fn build_message(&self, digest: &RenderedDigest) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(digest.subject.clone())
            .header(header::ContentType::TEXT_HTML);
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }
        builder.body(digest.html.clone()).context("build email")
    }
}

#[async_trait::async_trait]
impl DigestNotifier for EmailNotifier {
    async fn deliver(&self, digest: &RenderedDigest) -> Result<()> {
        let msg = self.build_message(digest)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
