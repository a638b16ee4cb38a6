//! Batch sending.
//!
//! [`send_campaign`] composes and delivers one message per recipient on
//! tokio tasks, with at most `concurrency` deliveries in flight. A failed
//! delivery is recorded in the [`SendReport`] and the batch carries on.

mod compose;
mod report;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use mailforge_render::Document;

use crate::campaign::CampaignDetails;
use crate::mailer::{DeliveryError, Mailer};
use crate::recipients::Recipient;
use crate::{Error, Result};

pub use compose::{TEST_SUBJECT_PREFIX, compose, compose_test, plain_text, render_html};
pub use report::{DeliveryOutcome, SendReport};

/// Sends a campaign to every recipient.
///
/// Outcomes come back in `recipients` order regardless of completion order.
/// A `concurrency` of zero is treated as one.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the campaign details are incomplete;
/// nothing is sent in that case. Delivery failures are not errors.
pub async fn send_campaign<M>(
    mailer: Arc<M>,
    details: &CampaignDetails,
    document: &Document,
    recipients: Vec<Recipient>,
    concurrency: usize,
) -> Result<SendReport>
where
    M: Mailer + 'static,
{
    details.validate().map_err(Error::Validation)?;

    let total = recipients.len();
    let concurrency = concurrency.max(1);
    info!(campaign = %details.name, total, concurrency, "sending campaign");

    let addresses: Vec<String> = recipients.iter().map(|r| r.email.clone()).collect();
    let mut outcomes: Vec<Option<DeliveryOutcome>> = vec![None; total];

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let details = Arc::new(details.clone());
    let document = Arc::new(document.clone());
    let mut tasks = JoinSet::new();

    for (index, recipient) in recipients.into_iter().enumerate() {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let mailer = Arc::clone(&mailer);
        let details = Arc::clone(&details);
        let document = Arc::clone(&document);

        tasks.spawn(async move {
            let _permit = permit;
            let email = compose(&details, &document, &recipient);
            (index, mailer.send(&email).await)
        });

        while let Some(joined) = tasks.try_join_next() {
            record(joined, &addresses, &mut outcomes);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        record(joined, &addresses, &mut outcomes);
    }

    let report = SendReport::new(
        addresses
            .into_iter()
            .zip(outcomes)
            .map(|(to, outcome)| {
                let outcome = outcome
                    .unwrap_or_else(|| DeliveryOutcome::Failed("delivery task did not finish".to_string()));
                (to, outcome)
            })
            .collect(),
    );

    info!(
        campaign = %details.name,
        sent = report.sent(),
        failed = report.failed(),
        "campaign finished"
    );
    Ok(report)
}

type Joined = std::result::Result<(usize, std::result::Result<(), DeliveryError>), tokio::task::JoinError>;

fn record(joined: Joined, addresses: &[String], outcomes: &mut [Option<DeliveryOutcome>]) {
    match joined {
        Ok((index, Ok(()))) => {
            debug!(to = %addresses[index], "delivered");
            outcomes[index] = Some(DeliveryOutcome::Sent);
        }
        Ok((index, Err(e))) => {
            warn!(to = %addresses[index], transient = e.is_transient(), "delivery failed: {e}");
            outcomes[index] = Some(DeliveryOutcome::Failed(e.to_string()));
        }
        Err(e) => warn!("delivery task failed: {e}"),
    }
}

/// Sends a single test message of the campaign to `to`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for incomplete details, or
/// [`Error::Delivery`] if the message was not accepted.
pub async fn send_test<M: Mailer>(
    mailer: &M,
    details: &CampaignDetails,
    document: &Document,
    to: &Recipient,
) -> Result<()> {
    details.validate().map_err(Error::Validation)?;
    let email = compose_test(details, document, to);
    info!(to = %to.email, "sending test message");
    mailer.send(&email).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use mailforge_render::{Block, BlockId};
    use mailforge_smtp::Error as SmtpError;

    use crate::mailer::OutgoingEmail;
    use crate::validation::ValidationError;

    /// Records every message; addresses at `bounce.test` are refused.
    #[derive(Default)]
    struct MockMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Mailer for MockMailer {
        async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), DeliveryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if email.to.ends_with("@bounce.test") {
                return Err(SmtpError::rejected(550, "No such user").into());
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn details() -> CampaignDetails {
        CampaignDetails {
            name: "Launch".into(),
            subject: "Hi {{name}}".into(),
            from_name: "Acme".into(),
            from_email: "news@acme.test".into(),
            ..CampaignDetails::default()
        }
    }

    fn document() -> Document {
        let mut document = Document::new();
        document
            .insert(BlockId::ROOT, Block::email_layout::<&str>([]))
            .unwrap();
        document
            .append_child(BlockId::ROOT, "body", Block::text("Hello {{name}}"))
            .unwrap();
        document
    }

    fn recipients(addresses: &[&str]) -> Vec<Recipient> {
        addresses
            .iter()
            .map(|a| Recipient::new(*a, a.split('@').next().map(str::to_string)))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_batch() {
        let mailer = Arc::new(MockMailer::default());
        let list = recipients(&["ada@example.com", "gone@bounce.test", "grace@example.com"]);

        let report = send_campaign(Arc::clone(&mailer), &details(), &document(), list, 2)
            .await
            .unwrap();

        let order: Vec<&str> = report.outcomes().iter().map(|(to, _)| to.as_str()).collect();
        assert_eq!(order, ["ada@example.com", "gone@bounce.test", "grace@example.com"]);
        assert!(report.outcomes()[0].1.is_sent());
        assert_eq!(
            report.outcomes()[1].1,
            DeliveryOutcome::Failed("SMTP error 550: No such user".into())
        );
        assert_eq!((report.sent(), report.failed()), (2, 1));

        let sent = mailer.sent.lock().unwrap();
        let grace = sent.iter().find(|e| e.to == "grace@example.com").unwrap();
        assert_eq!(grace.subject, "Hi grace");
        assert!(grace.html.contains("Hello grace"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let mailer = Arc::new(MockMailer::default());
        let addresses: Vec<String> = (0..12).map(|i| format!("user{i}@example.com")).collect();
        let list = recipients(&addresses.iter().map(String::as_str).collect::<Vec<_>>());

        let report = send_campaign(Arc::clone(&mailer), &details(), &document(), list, 3)
            .await
            .unwrap();

        assert_eq!(report.sent(), 12);
        let peak = mailer.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {peak}");
        assert!(peak >= 2, "deliveries never overlapped");
    }

    #[tokio::test]
    async fn test_invalid_details_send_nothing() {
        let mailer = Arc::new(MockMailer::default());
        let mut details = details();
        details.from_email = "nobody".into();

        let err = send_campaign(
            Arc::clone(&mailer),
            &details,
            &document(),
            recipients(&["ada@example.com"]),
            4,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Validation(ref v) if v == &[ValidationError::InvalidFromEmail]));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recipient_list() {
        let mailer = Arc::new(MockMailer::default());
        let report = send_campaign(mailer, &details(), &document(), Vec::new(), 0)
            .await
            .unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_test_message() {
        let mailer = MockMailer::default();
        let me = Recipient::new("me@acme.test", Some("Me".into()));

        send_test(&mailer, &details(), &document(), &me).await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "[Test] Hi Me");
        drop(sent);

        let bounce = Recipient::new("me@bounce.test", None);
        let err = send_test(&mailer, &details(), &document(), &bounce)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery(DeliveryError::Smtp(_))));
    }
}
