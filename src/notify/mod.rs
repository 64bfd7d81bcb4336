// src/notify/mod.rs
pub mod archive;
pub mod email;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::digest::RenderedDigest;

pub use archive::HtmlArchiveNotifier;
pub use email::EmailNotifier;

#[async_trait::async_trait]
pub trait DigestNotifier: Send + Sync {
    async fn deliver(&self, digest: &RenderedDigest) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans a digest out to every configured channel. A failing channel is logged
/// and skipped; the others still run.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn DigestNotifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, n: Arc<dyn DigestNotifier>) -> Self {
        self.channels.push(n);
        self
    }

    /// Email when the SMTP env is complete, plus the HTML archive when a dir is set.
    pub fn from_env(archive_dir: Option<PathBuf>) -> Result<Self> {
        let mut mux = Self::new();
        match EmailNotifier::from_env()? {
            Some(email) => mux = mux.with(Arc::new(email)),
            None => tracing::info!(target: "notify", "email disabled (SMTP env incomplete)"),
        }
        if let Some(dir) = archive_dir {
            mux = mux.with(Arc::new(HtmlArchiveNotifier::new(dir)));
        }
        Ok(mux)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Returns how many channels accepted the digest.
    pub async fn deliver(&self, digest: &RenderedDigest) -> usize {
        let mut ok = 0;
        for ch in &self.channels {
            match ch.deliver(digest).await {
                Ok(()) => {
                    ok += 1;
                    tracing::info!(
                        target: "notify",
                        channel = ch.name(),
                        articles = digest.article_count,
                        "digest delivered"
                    );
                }
                Err(e) => {
                    metrics::counter!("notify_errors_total", "channel" => ch.name()).increment(1);
                    tracing::warn!(target: "notify", channel = ch.name(), error = ?e, "digest delivery failed");
                }
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>, bool);

    #[async_trait::async_trait]
    impl DigestNotifier for Counting {
        async fn deliver(&self, _d: &RenderedDigest) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 {
                Ok(())
            } else {
                anyhow::bail!("down")
            }
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mux = NotifierMux::new()
            .with(Arc::new(Counting(calls.clone(), false)))
            .with(Arc::new(Counting(calls.clone(), true)));
        let d = RenderedDigest {
            subject: "s".into(),
            html: "<p/>".into(),
            generated_at: Utc::now(),
            article_count: 0,
        };
        assert_eq!(mux.deliver(&d).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
