//! Batch send results.

use serde::Serialize;

/// What happened to one recipient's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    /// Accepted by the mail server.
    Sent,
    /// Not delivered, with the reason.
    Failed(String),
}

impl DeliveryOutcome {
    /// Whether the message was accepted.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Per-recipient outcomes of a batch send, in recipient order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    outcomes: Vec<(String, DeliveryOutcome)>,
}

impl SendReport {
    /// Creates a report from `(address, outcome)` pairs.
    #[must_use]
    pub const fn new(outcomes: Vec<(String, DeliveryOutcome)>) -> Self {
        Self { outcomes }
    }

    /// All outcomes in recipient order.
    #[must_use]
    pub fn outcomes(&self) -> &[(String, DeliveryOutcome)] {
        &self.outcomes
    }

    /// Addresses that failed, with reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(to, outcome)| match outcome {
            DeliveryOutcome::Failed(reason) => Some((to.as_str(), reason.as_str())),
            DeliveryOutcome::Sent => None,
        })
    }

    /// Number of accepted messages.
    #[must_use]
    pub fn sent(&self) -> u32 {
        count(self.outcomes.iter().filter(|(_, o)| o.is_sent()))
    }

    /// Number of failed messages.
    #[must_use]
    pub fn failed(&self) -> u32 {
        count(self.outcomes.iter().filter(|(_, o)| !o.is_sent()))
    }

    /// Number of recipients attempted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether nothing was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

fn count<I: Iterator>(iter: I) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_failures() {
        let report = SendReport::new(vec![
            ("a@example.com".into(), DeliveryOutcome::Sent),
            ("b@example.com".into(), DeliveryOutcome::Failed("550 No such user".into())),
            ("c@example.com".into(), DeliveryOutcome::Sent),
        ]);

        assert_eq!((report.sent(), report.failed(), report.len()), (2, 1, 3));
        assert_eq!(
            report.failures().collect::<Vec<_>>(),
            vec![("b@example.com", "550 No such user")]
        );
    }

    #[test]
    fn test_outcome_json() {
        let json = serde_json::to_value(DeliveryOutcome::Failed("refused".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "reason": "refused"}));
        let json = serde_json::to_value(DeliveryOutcome::Sent).unwrap();
        assert_eq!(json, serde_json::json!({"status": "sent"}));
    }
}
