use crate::db::SqlitePool;
use crate::error::AtlasError;
use crate::types::design::GeneratedImage;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Generated cross-section images, per user. Lives in the financial store's
/// database; its table is created by `FinanceStorage::init_schema`.
#[derive(Clone)]
pub struct ImageStorage {
    pool: SqlitePool,
}

impl ImageStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: i64,
        image_url: &str,
        prompt: &str,
        theme: &str,
        sections_data: &Value,
    ) -> Result<GeneratedImage, AtlasError> {
        let created_at = Utc::now();
        let id = sqlx::query(
            r#"INSERT INTO generated_images
               (user_id, image_url, prompt, theme, sections_data, is_saved, created_at)
               VALUES (?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(user_id)
        .bind(image_url)
        .bind(prompt)
        .bind(theme)
        .bind(serde_json::to_string(sections_data)?)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(GeneratedImage {
            id,
            user_id,
            image_url: image_url.to_string(),
            prompt: prompt.to_string(),
            theme: theme.to_string(),
            sections_data: sections_data.clone(),
            is_saved: false,
            created_at,
        })
    }

    /// A user's images, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<GeneratedImage>, AtlasError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, image_url, prompt, theme, sections_data, is_saved, created_at
               FROM generated_images WHERE user_id = ? ORDER BY created_at DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_model).collect()
    }

    /// Mark an image saved. `false` when the user owns no such image.
    pub async fn mark_saved(&self, user_id: i64, id: i64) -> Result<bool, AtlasError> {
        let affected = sqlx::query("UPDATE generated_images SET is_saved = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    fn row_to_model(row: SqliteRow) -> Result<GeneratedImage, AtlasError> {
        let sections: String = row.try_get("sections_data")?;
        let created_at: String = row.try_get("created_at")?;
        let is_saved: i64 = row.try_get("is_saved")?;
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);
        Ok(GeneratedImage {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            image_url: row.try_get("image_url")?,
            prompt: row.try_get("prompt")?,
            theme: row.try_get("theme")?,
            sections_data: serde_json::from_str(&sections)?,
            is_saved: is_saved != 0,
            created_at,
        })
    }
}
