//! Campaign storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, info};

use super::model::{Campaign, CampaignDetails, CampaignId, CampaignStatus};
use crate::send::SendReport;
use crate::template::TemplateId;
use crate::template::repository::parse_timestamp;
use crate::{Error, Result};

/// Repository for campaign storage and retrieval.
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS campaigns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                details TEXT NOT NULL,
                template_id INTEGER,
                status TEXT NOT NULL DEFAULT 'draft',
                sent_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                sent_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Save a campaign (insert or update).
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign to update no longer exists or the
    /// query fails.
    pub async fn save(&self, campaign: &mut Campaign) -> Result<()> {
        let details = serde_json::to_string(&campaign.details)?;
        campaign.updated_at = Utc::now();

        if let Some(id) = campaign.id {
            let result = sqlx::query(
                r"
                UPDATE campaigns SET
                    details = ?, template_id = ?, status = ?,
                    sent_count = ?, failed_count = ?,
                    updated_at = ?, sent_at = ?
                WHERE id = ?
                ",
            )
            .bind(&details)
            .bind(campaign.template_id.map(|t| t.0))
            .bind(campaign.status.as_str())
            .bind(i64::from(campaign.sent_count))
            .bind(i64::from(campaign.failed_count))
            .bind(campaign.updated_at.to_rfc3339())
            .bind(campaign.sent_at.map(|t| t.to_rfc3339()))
            .bind(id.0)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(Error::CampaignNotFound(id.0));
            }
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO campaigns (
                    details, template_id, status, sent_count, failed_count,
                    created_at, updated_at, sent_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&details)
            .bind(campaign.template_id.map(|t| t.0))
            .bind(campaign.status.as_str())
            .bind(i64::from(campaign.sent_count))
            .bind(i64::from(campaign.failed_count))
            .bind(campaign.created_at.to_rfc3339())
            .bind(campaign.updated_at.to_rfc3339())
            .bind(campaign.sent_at.map(|t| t.to_rfc3339()))
            .execute(&self.pool)
            .await?;

            campaign.id = Some(CampaignId::new(result.last_insert_rowid()));
        }

        debug!(id = ?campaign.id, status = %campaign.status, "campaign saved");
        Ok(())
    }

    /// Get a campaign by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or stored details are malformed.
    pub async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_campaign).transpose()
    }

    /// List campaigns, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or stored details are malformed.
    pub async fn list(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM campaigns WHERE status = ? ORDER BY created_at DESC, id DESC")
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM campaigns ORDER BY created_at DESC, id DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(row_to_campaign).collect()
    }

    /// Delete a campaign. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: CampaignId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a campaign as sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CampaignNotFound`] if there is no such campaign.
    pub async fn mark_sending(&self, id: CampaignId) -> Result<()> {
        let result = sqlx::query("UPDATE campaigns SET status = ?, updated_at = ? WHERE id = ?")
            .bind(CampaignStatus::Sending.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::CampaignNotFound(id.0));
        }
        Ok(())
    }

    /// Records the outcome of a batch send.
    ///
    /// Counters accumulate across sends. The campaign is `sent` when anything
    /// was delivered so far and `failed` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CampaignNotFound`] if there is no such campaign.
    pub async fn record_send(&self, id: CampaignId, report: &SendReport) -> Result<Campaign> {
        let mut campaign = self.get(id).await?.ok_or(Error::CampaignNotFound(id.0))?;

        campaign.sent_count = campaign.sent_count.saturating_add(report.sent());
        campaign.failed_count = campaign.failed_count.saturating_add(report.failed());
        campaign.status = if campaign.sent_count > 0 {
            CampaignStatus::Sent
        } else {
            CampaignStatus::Failed
        };
        campaign.sent_at = Some(Utc::now());
        self.save(&mut campaign).await?;

        info!(
            id = id.0,
            sent = report.sent(),
            failed = report.failed(),
            status = %campaign.status,
            "campaign send recorded"
        );
        Ok(campaign)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_campaign(row: &SqliteRow) -> Result<Campaign> {
    let details: String = row.get("details");
    let details: CampaignDetails = serde_json::from_str(&details)?;
    let sent_at: Option<String> = row.get("sent_at");

    Ok(Campaign {
        id: Some(CampaignId::new(row.get("id"))),
        details,
        template_id: row.get::<Option<i64>, _>("template_id").map(TemplateId::new),
        status: CampaignStatus::parse(row.get("status")),
        sent_count: row.get::<i64, _>("sent_count") as u32,
        failed_count: row.get::<i64, _>("failed_count") as u32,
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
        sent_at: sent_at.as_deref().map(parse_timestamp),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::campaign::CampaignType;
    use crate::send::DeliveryOutcome;

    fn draft() -> Campaign {
        Campaign::new(CampaignDetails {
            name: "Spring sale".into(),
            subject: "20% off, {{name}}".into(),
            from_name: "Acme".into(),
            from_email: "news@acme.test".into(),
            campaign_type: CampaignType::Marketing,
            ..CampaignDetails::default()
        })
    }

    #[tokio::test]
    async fn test_create_and_retrieve() {
        let repo = CampaignRepository::in_memory().await.unwrap();

        let mut campaign = draft().with_template(TemplateId::new(7));
        repo.save(&mut campaign).await.unwrap();
        let id = campaign.id.unwrap();

        let loaded = repo.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.details, campaign.details);
        assert_eq!(loaded.template_id, Some(TemplateId::new(7)));
        assert_eq!(loaded.status, CampaignStatus::Draft);
        assert!(loaded.sent_at.is_none());
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let repo = CampaignRepository::in_memory().await.unwrap();

        let mut first = draft();
        repo.save(&mut first).await.unwrap();
        let mut second = draft();
        repo.save(&mut second).await.unwrap();
        repo.mark_sending(second.id.unwrap()).await.unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 2);
        let sending = repo.list(Some(CampaignStatus::Sending)).await.unwrap();
        assert_eq!(sending.len(), 1);
        assert_eq!(sending[0].id, second.id);
    }

    #[tokio::test]
    async fn test_record_send() {
        let repo = CampaignRepository::in_memory().await.unwrap();

        let mut campaign = draft();
        repo.save(&mut campaign).await.unwrap();
        let id = campaign.id.unwrap();

        let all_failed = SendReport::new(vec![
            ("a@example.com".into(), DeliveryOutcome::Failed("refused".into())),
        ]);
        let updated = repo.record_send(id, &all_failed).await.unwrap();
        assert_eq!(updated.status, CampaignStatus::Failed);
        assert_eq!(updated.failed_count, 1);

        let retry = SendReport::new(vec![("a@example.com".into(), DeliveryOutcome::Sent)]);
        let updated = repo.record_send(id, &retry).await.unwrap();
        assert_eq!(updated.status, CampaignStatus::Sent);
        assert_eq!((updated.sent_count, updated.failed_count), (1, 1));
        assert!(updated.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_campaign() {
        let repo = CampaignRepository::in_memory().await.unwrap();
        let id = CampaignId::new(99);

        assert!(repo.get(id).await.unwrap().is_none());
        assert!(!repo.delete(id).await.unwrap());
        assert!(matches!(
            repo.mark_sending(id).await.unwrap_err(),
            Error::CampaignNotFound(99)
        ));
    }
}
