//! Digest delivery with per-recipient fault isolation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::Report;
use crate::error::Result;
use crate::persistence::Subscriber;

/// Outbound message capability; implemented by the Telegram adapter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str, disable_preview: bool) -> Result<()>;
}

/// Outcome of one broadcast cycle
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<(String, String)>,
}

pub struct Broadcaster {
    sink: Arc<dyn MessageSink>,
}

impl Broadcaster {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// Deliver a report to the optional broadcast channel and then every
    /// subscriber. Each attempt is independent; there is no retry within a
    /// cycle (at-most-once, best-effort).
    pub async fn broadcast(
        &self,
        report: &Report,
        subscribers: &[Subscriber],
        channel: Option<&str>,
    ) -> DeliveryReport {
        let text = report.render_html();
        let mut outcome = DeliveryReport::default();

        if let Some(chat_id) = channel {
            self.deliver(&mut outcome, chat_id, &text).await;
        }

        for subscriber in subscribers {
            self.deliver(&mut outcome, &subscriber.id, &text).await;
        }

        info!(
            "digest broadcast complete: {} delivered, {} failed",
            outcome.delivered,
            outcome.failed.len()
        );
        outcome
    }

    async fn deliver(&self, outcome: &mut DeliveryReport, chat_id: &str, text: &str) {
        match self.sink.send(chat_id, text, true).await {
            Ok(()) => outcome.delivered += 1,
            Err(e) => {
                warn!("delivery to {} failed: {}", chat_id, e);
                outcome.failed.push((chat_id.to_string(), e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Section;
    use crate::error::HeraldError;

    fn report() -> Report {
        Report {
            sections: vec![Section::new("TEST", vec!["line".into()])],
        }
    }

    fn subscribers(ids: &[&str]) -> Vec<Subscriber> {
        ids.iter()
            .map(|id| Subscriber {
                id: id.to_string(),
                name: String::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_rest() {
        let mut sink = MockMessageSink::new();
        sink.expect_send()
            .returning(|chat_id, _text, _disable_preview| {
                if chat_id == "2" {
                    Err(HeraldError::Delivery("blocked by recipient".into()))
                } else {
                    Ok(())
                }
            });

        let broadcaster = Broadcaster::new(Arc::new(sink));
        let outcome = broadcaster
            .broadcast(&report(), &subscribers(&["1", "2", "3"]), None)
            .await;

        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "2");
    }

    #[tokio::test]
    async fn test_channel_counts_toward_delivery() {
        let mut sink = MockMessageSink::new();
        sink.expect_send().returning(|_, _, _| Ok(()));

        let broadcaster = Broadcaster::new(Arc::new(sink));
        let outcome = broadcaster
            .broadcast(&report(), &subscribers(&["1"]), Some("-100123"))
            .await;

        assert_eq!(outcome.delivered, 2);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_is_a_quiet_cycle() {
        let sink = MockMessageSink::new();
        let broadcaster = Broadcaster::new(Arc::new(sink));
        let outcome = broadcaster.broadcast(&report(), &[], None).await;

        assert_eq!(outcome.delivered, 0);
        assert!(outcome.failed.is_empty());
    }
}
