pub mod format;
pub mod telegram;

use async_trait::async_trait;
use chrono::Local;
use tracing::{error, info, warn};

use crate::error::DeliveryError;
use crate::model::{DeliveryOutcome, Listing, Recipient};

/// Delivers one formatted message to one recipient.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, recipient: &str, html: &str) -> Result<(), DeliveryError>;
}

/// Fans one message out to every recipient. A failed recipient never stops
/// the others; the send counts as successful once anyone got it.
pub struct Notifier<T> {
    transport: T,
    recipients: Vec<Recipient>,
    area: String,
    link: String,
}

impl<T: Transport> Notifier<T> {
    pub fn new(transport: T, recipients: Vec<Recipient>, area: String, link: String) -> Self {
        Self {
            transport,
            recipients,
            area,
            link,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn render(&self, listings: &[Listing]) -> String {
        format::listings_message(listings, &self.area, &self.link, Local::now())
    }

    pub async fn notify(&self, listings: &[Listing]) -> DeliveryOutcome {
        let message = self.render(listings);
        self.broadcast(&message).await
    }

    pub async fn broadcast(&self, html: &str) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome {
            total: self.recipients.len(),
            ..Default::default()
        };

        for recipient in &self.recipients {
            match self.transport.deliver(recipient, html).await {
                Ok(()) => {
                    info!(recipient = %recipient, "Telegram notification sent");
                    outcome.success_count += 1;
                }
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Failed to send Telegram message");
                    outcome.failures.push((recipient.clone(), e.to_string()));
                }
            }
        }

        if outcome.is_success() {
            info!("Message sent to {}/{} recipients", outcome.success_count, outcome.total);
        } else {
            error!("Failed to send message to any recipient");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listing, FakeTransport};

    fn notifier(transport: FakeTransport, recipients: &[&str]) -> Notifier<FakeTransport> {
        Notifier::new(
            transport,
            recipients.iter().map(|r| r.to_string()).collect(),
            "Rennes".to_string(),
            "https://example.org/search".to_string(),
        )
    }

    #[tokio::test]
    async fn partial_failure_is_success() {
        let transport = FakeTransport::failing(&["222"]);
        let n = notifier(transport.clone(), &["111", "222", "333"]);
        let outcome = n.notify(&[listing("350_1")]).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "222");
        // the failing recipient did not stop the one after it
        assert_eq!(transport.recipients_reached(), ["111", "333"]);
    }

    #[tokio::test]
    async fn all_failing_is_failure() {
        let transport = FakeTransport::failing(&["111", "222"]);
        let n = notifier(transport.clone(), &["111", "222"]);
        let outcome = n.notify(&[listing("350_1")]).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.success_count, 0);
        assert_eq!(outcome.failures.len(), 2);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn every_recipient_gets_the_same_message() {
        let transport = FakeTransport::default();
        let n = notifier(transport.clone(), &["111", "222"]);
        n.notify(&[listing("350_1"), listing("420_2")]).await;
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, sent[1].1);
        assert!(sent[0].1.contains("2 Rooms Available!"));
    }
}
