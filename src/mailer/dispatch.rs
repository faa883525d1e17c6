/// Background mail delivery
///
/// Submission is an acknowledgment that the message was queued, not
/// that it was delivered. A single worker drains the queue and retries
/// transient delivery failures with exponential backoff before giving
/// up on a message.
use super::{MailTransport, OutboundMail};
use crate::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const QUEUE_CAPACITY: usize = 256;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_SECS: u64 = 2;

/// Handle for queueing outbound mail
#[derive(Clone)]
pub struct MailDispatcher {
    tx: mpsc::Sender<OutboundMail>,
}

impl MailDispatcher {
    /// Spawn the delivery worker and return the submission handle
    pub fn start(transport: Arc<dyn MailTransport>) -> Self {
        let (tx, mut rx) = mpsc::channel::<OutboundMail>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            info!("Mail dispatch worker started");

            while let Some(mail) = rx.recv().await {
                deliver_with_retry(transport.as_ref(), &mail).await;
            }

            info!("Mail dispatch worker stopped");
        });

        Self { tx }
    }

    /// Queue a message for delivery
    ///
    /// Returns true when the message was accepted. A full queue drops
    /// the message rather than blocking the caller.
    pub fn submit(&self, mail: OutboundMail) -> bool {
        match self.tx.try_send(mail) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(mail)) => {
                warn!("Mail queue full, dropping message to {}", mail.to);
                metrics::record_mail_dispatch("dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(mail)) => {
                error!("Mail queue closed, dropping message to {}", mail.to);
                metrics::record_mail_dispatch("dropped");
                false
            }
        }
    }
}

async fn deliver_with_retry(transport: &dyn MailTransport, mail: &OutboundMail) {
    for attempt in 1..=MAX_ATTEMPTS {
        match transport.deliver(mail).await {
            Ok(()) => {
                metrics::record_mail_dispatch("delivered");
                return;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                let backoff = Duration::from_secs(BACKOFF_BASE_SECS.pow(attempt));
                warn!(
                    "Mail delivery to {} failed (attempt {}/{}), retrying in {:?}: {}",
                    mail.to, attempt, MAX_ATTEMPTS, backoff, e
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                error!(
                    "Mail delivery to {} failed after {} attempts, giving up: {}",
                    mail.to, MAX_ATTEMPTS, e
                );
                metrics::record_mail_dispatch("failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibrisError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct FlakyTransport {
        failures: usize,
        attempts: AtomicUsize,
        settled: Notify,
    }

    impl FlakyTransport {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures,
                attempts: AtomicUsize::new(0),
                settled: Notify::new(),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MailTransport for FlakyTransport {
        async fn deliver(&self, _mail: &OutboundMail) -> crate::error::LibrisResult<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                if attempt == MAX_ATTEMPTS as usize {
                    self.settled.notify_one();
                }
                Err(LibrisError::Internal("smtp unavailable".to_string()))
            } else {
                self.settled.notify_one();
                Ok(())
            }
        }
    }

    fn test_mail() -> OutboundMail {
        OutboundMail {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Hi".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_delivers() {
        let transport = FlakyTransport::new(0);
        let dispatcher = MailDispatcher::start(transport.clone());

        assert!(dispatcher.submit(test_mail()));
        transport.settled.notified().await;

        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let transport = FlakyTransport::new(2);
        let dispatcher = MailDispatcher::start(transport.clone());

        assert!(dispatcher.submit(test_mail()));
        transport.settled.notified().await;

        // Two failures, then the third attempt succeeds
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let transport = FlakyTransport::new(MAX_ATTEMPTS as usize);
        let dispatcher = MailDispatcher::start(transport.clone());

        assert!(dispatcher.submit(test_mail()));
        transport.settled.notified().await;

        assert_eq!(transport.attempts(), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_sequential_submissions() {
        let transport = FlakyTransport::new(0);
        let dispatcher = MailDispatcher::start(transport.clone());

        assert!(dispatcher.submit(test_mail()));
        transport.settled.notified().await;
        assert!(dispatcher.submit(test_mail()));
        transport.settled.notified().await;

        assert_eq!(transport.attempts(), 2);
    }
}
