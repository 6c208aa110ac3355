/// SQLite persistence for saved workflow documents
///
/// Documents are stored whole as JSON, keyed by their generated workflow key.
/// Name, status and timestamps are kept in their own columns for listing.

use crate::document::WorkflowDocument;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::Path;

/// Document store backing the save and open actions
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    pool: SqlitePool,
}

impl WorkflowStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) `workflows.db` under the data directory and prepare the schema
    pub async fn connect(data_dir: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))?;
        let db_path = Path::new(data_dir).join("workflows.db");

        tracing::info!("🗄️ Opening workflow database: {}", db_path.display());
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Throwaway in-memory store; a single connection keeps the database alive
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Safe to call repeatedly
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                key TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                definition TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_workflows_name ON workflows(name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a document or replace the one stored under the same key
    pub async fn save_document(&self, document: &WorkflowDocument) -> Result<()> {
        if document.key.is_empty() {
            anyhow::bail!("Workflow '{}' has no key; set a name or key fields before saving", document.name);
        }
        let definition = serde_json::to_string(document)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO workflows (key, name, status, definition, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                definition = excluded.definition,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&document.key)
        .bind(&document.name)
        .bind(&document.status)
        .bind(&definition)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::debug!("💾 Stored workflow {}", document.key);
        Ok(())
    }

    pub async fn get_document(&self, key: &str) -> Result<Option<WorkflowDocument>> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition: String = row.get("definition");
                Ok(Some(serde_json::from_str(&definition)?))
            }
            None => Ok(None),
        }
    }

    /// Most recently updated first
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let rows = sqlx::query(
            "SELECT key, name, status, created_at, updated_at FROM workflows ORDER BY updated_at DESC, key ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| WorkflowSummary {
                key: row.get("key"),
                name: row.get("name"),
                status: row.get("status"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    pub async fn delete_workflow(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Listing entry for a stored workflow
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub key: String,
    pub name: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeCatalog;
    use crate::document::{KeyField, SaveRequest, WorkflowKey};

    fn document(name: &str, market: &str) -> WorkflowDocument {
        let mut key_fields = WorkflowKey::default();
        key_fields.set(KeyField::Market, market);
        WorkflowDocument::from_request(
            &NodeCatalog::builtin(),
            SaveRequest {
                workflow_name: name.to_string(),
                description: String::new(),
                key_fields,
                nodes: Vec::new(),
                edges: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_save_and_get_document() {
        let storage = WorkflowStorage::in_memory().await.unwrap();
        let doc = document("Orders", "uk");
        storage.save_document(&doc).await.unwrap();

        let loaded = storage.get_document("ORDERS_UK").await.unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(storage.get_document("MISSING").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_upserts_by_key() {
        let storage = WorkflowStorage::in_memory().await.unwrap();
        storage.save_document(&document("Orders", "uk")).await.unwrap();
        let mut updated = document("Orders", "uk");
        updated.description = "changed".to_string();
        storage.save_document(&updated).await.unwrap();

        let listed = storage.list_workflows().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, "pending");
        let loaded = storage.get_document("ORDERS_UK").await.unwrap().unwrap();
        assert_eq!(loaded.description, "changed");
    }

    #[tokio::test]
    async fn test_delete_workflow() {
        let storage = WorkflowStorage::in_memory().await.unwrap();
        storage.save_document(&document("Orders", "de")).await.unwrap();

        assert!(storage.delete_workflow("ORDERS_DE").await.unwrap());
        assert!(!storage.delete_workflow("ORDERS_DE").await.unwrap());
        assert!(storage.list_workflows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_without_key_is_rejected() {
        let storage = WorkflowStorage::in_memory().await.unwrap();
        assert!(storage.save_document(&document("", "")).await.is_err());
    }
}
