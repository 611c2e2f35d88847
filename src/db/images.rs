//! Image generation records

use uuid::Uuid;

use super::models::ImageGeneration;
use super::pool::{DbError, DbPool};
use crate::domain::{Page, PageRequest};

/// Row written after the image provider returned a URL
#[derive(Debug, Clone)]
pub struct NewImageGeneration {
    pub user_id: Uuid,
    pub prompt: String,
    pub settings: serde_json::Value,
    pub image_url: String,
    pub revised_prompt: Option<String>,
}

pub struct ImageRepository {
    pool: DbPool,
}

impl ImageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, image: &NewImageGeneration) -> Result<Uuid, DbError> {
        let client = self.pool.get().await?;
        let row = client.query_one(
            r#"
            INSERT INTO image_generations (user_id, prompt, settings, image_url, revised_prompt)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
            &[
                &image.user_id,
                &image.prompt,
                &image.settings,
                &image.image_url,
                &image.revised_prompt,
            ]
        ).await?;
        Ok(row.get("id"))
    }

    /// A user's image generations, newest first
    pub async fn list(&self, user_id: Uuid, page: PageRequest) -> Result<Page<ImageGeneration>, DbError> {
        let client = self.pool.get().await?;

        let total: i64 = client.query_one(
            "SELECT COUNT(*) AS total FROM image_generations WHERE user_id = $1",
            &[&user_id]
        ).await?.get("total");

        let sql = format!(
            r#"
            SELECT {} FROM image_generations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            ImageGeneration::COLUMNS
        );
        let rows = client.query(&sql, &[&user_id, &page.limit, &page.offset()]).await?;

        Ok(Page::new(rows.iter().map(ImageGeneration::from_row).collect(), total, page))
    }
}
