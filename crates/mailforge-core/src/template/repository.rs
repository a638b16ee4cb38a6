//! Template storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, warn};

use mailforge_render::{BlockId, Document};

use super::model::{Template, TemplateId};
use crate::{Error, Result};

/// Repository for template storage and retrieval.
///
/// Documents are stored as their JSON interchange form, so a load returns
/// exactly what was saved.
pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
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
            CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Save a template (insert or update).
    ///
    /// Assigns an id to new templates and refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized, the template
    /// to update no longer exists, or the query fails.
    pub async fn save(&self, template: &mut Template) -> Result<()> {
        let document = template.document.to_json()?;
        template.updated_at = Utc::now();

        if let Some(id) = template.id {
            let result = sqlx::query(
                r"
                UPDATE templates SET name = ?, document = ?, updated_at = ?
                WHERE id = ?
                ",
            )
            .bind(&template.name)
            .bind(&document)
            .bind(template.updated_at.to_rfc3339())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(Error::TemplateNotFound(id.0));
            }
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO templates (name, document, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ",
            )
            .bind(&template.name)
            .bind(&document)
            .bind(template.created_at.to_rfc3339())
            .bind(template.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

            template.id = Some(TemplateId::new(result.last_insert_rowid()));
        }

        debug!(id = ?template.id, name = %template.name, "template saved");
        Ok(())
    }

    /// Get a template by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored document is malformed.
    pub async fn get(&self, id: TemplateId) -> Result<Option<Template>> {
        let row = sqlx::query(
            "SELECT id, name, document, created_at, updated_at FROM templates WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_template).transpose()
    }

    /// List all templates, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored document is malformed.
    pub async fn list(&self) -> Result<Vec<Template>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, document, created_at, updated_at
            FROM templates
            ORDER BY updated_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_template).collect()
    }

    /// Delete a template. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: TemplateId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load a template's document, checking that it has a root block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateNotFound`] if there is no such template, or a
    /// document error if the stored JSON has no root.
    pub async fn load_document(&self, id: TemplateId) -> Result<Document> {
        let json: Option<String> = sqlx::query_scalar("SELECT document FROM templates WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let json = json.ok_or(Error::TemplateNotFound(id.0))?;
        Ok(Document::load(&json, BlockId::ROOT)?)
    }

    /// Insert the starter template if there are no templates yet.
    ///
    /// Returns the starter's id when it was inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn seed_starter(&self) -> Result<Option<TemplateId>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM templates")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(None);
        }

        let mut starter = Template::starter();
        self.save(&mut starter).await?;
        Ok(starter.id)
    }
}

fn row_to_template(row: &SqliteRow) -> Result<Template> {
    let id = TemplateId::new(row.get("id"));
    let json: String = row.get("document");
    let document = Document::from_json(&json)?;

    Ok(Template {
        id: Some(id),
        name: row.get("name"),
        document,
        created_at: parse_timestamp(row.get("created_at")),
        updated_at: parse_timestamp(row.get("updated_at")),
    })
}

/// Parses a stored RFC 3339 timestamp; unreadable values become the epoch.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |e| {
            warn!("Unreadable timestamp {value:?}: {e}");
            DateTime::UNIX_EPOCH
        },
        |t| t.with_timezone(&Utc),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailforge_render::{Block, emit};

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = TemplateRepository::in_memory().await.unwrap();

        let mut template = Template::starter();
        repo.save(&mut template).await.unwrap();
        let id = template.id.unwrap();

        let loaded = repo.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Starter");
        assert_eq!(loaded.document, Document::starter());
        assert_eq!(
            emit(&loaded.document, BlockId::ROOT),
            emit(&Document::starter(), BlockId::ROOT)
        );
    }

    #[tokio::test]
    async fn test_update_existing() {
        let repo = TemplateRepository::in_memory().await.unwrap();

        let mut template = Template::starter();
        repo.save(&mut template).await.unwrap();
        let id = template.id.unwrap();

        template.name = "Welcome".to_string();
        template
            .document
            .append_child(BlockId::ROOT, "divider", Block::divider())
            .unwrap();
        repo.save(&mut template).await.unwrap();
        assert_eq!(template.id, Some(id));

        let loaded = repo.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Welcome");
        assert!(loaded.document.contains("divider"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_template() {
        let repo = TemplateRepository::in_memory().await.unwrap();
        let mut template = Template::starter();
        template.id = Some(TemplateId::new(42));

        let err = repo.save(&mut template).await.unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(42)));
    }

    #[tokio::test]
    async fn test_delete_and_load_document() {
        let repo = TemplateRepository::in_memory().await.unwrap();

        let mut template = Template::starter();
        repo.save(&mut template).await.unwrap();
        let id = template.id.unwrap();

        let document = repo.load_document(id).await.unwrap();
        assert!(document.contains(BlockId::ROOT));

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(matches!(
            repo.load_document(id).await.unwrap_err(),
            Error::TemplateNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_load_document_without_root() {
        let repo = TemplateRepository::in_memory().await.unwrap();

        let mut template = Template::new("Headless", Document::new());
        repo.save(&mut template).await.unwrap();

        let err = repo.load_document(template.id.unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[tokio::test]
    async fn test_seed_starter_once() {
        let repo = TemplateRepository::in_memory().await.unwrap();

        assert!(repo.seed_starter().await.unwrap().is_some());
        assert!(repo.seed_starter().await.unwrap().is_none());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_timestamp() {
        let t = parse_timestamp("2024-03-01T09:30:00+00:00");
        assert_eq!(t.to_rfc3339(), "2024-03-01T09:30:00+00:00");
        assert_eq!(parse_timestamp("yesterday"), DateTime::UNIX_EPOCH);
    }
}
