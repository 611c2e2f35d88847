//! Tone and content template queries

use tracing::info;
use uuid::Uuid;

use super::models::{ContentTemplate, ToneTemplate};
use super::pool::{DbError, DbPool};

/// Fields for a user-created tone template
#[derive(Debug, Clone)]
pub struct NewToneTemplate {
    pub name: String,
    pub description: Option<String>,
    pub settings: serde_json::Value,
}

/// Fields for a user-created content template
#[derive(Debug, Clone)]
pub struct NewContentTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub prompt_template: String,
    pub settings: Option<serde_json::Value>,
}

/// Repository for template operations.
///
/// Users see system templates plus their own; they can only create and
/// delete their own.
pub struct TemplateRepository {
    pool: DbPool,
}

impl TemplateRepository {
    pub fn new(pool: DbPool) -> Self {
        TemplateRepository { pool }
    }

    pub async fn list_tone_templates(&self, user_id: Uuid) -> Result<Vec<ToneTemplate>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            SELECT {} FROM tone_templates
            WHERE is_system = true OR user_id = $1
            ORDER BY name
            "#,
            ToneTemplate::COLUMNS
        );
        let rows = client.query(&sql, &[&user_id]).await?;
        Ok(rows.iter().map(ToneTemplate::from_row).collect())
    }

    pub async fn create_tone_template(
        &self,
        user_id: Uuid,
        template: NewToneTemplate,
    ) -> Result<ToneTemplate, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            INSERT INTO tone_templates (name, description, settings, is_system, user_id)
            VALUES ($1, $2, $3, false, $4)
            RETURNING {}
            "#,
            ToneTemplate::COLUMNS
        );
        let row = client.query_one(
            &sql,
            &[&template.name, &template.description, &template.settings, &user_id]
        ).await?;

        let created = ToneTemplate::from_row(&row);
        info!(template_id = %created.id, user_id = %user_id, "Created tone template");
        Ok(created)
    }

    /// Delete a tone template owned by the user; system templates are never deleted
    pub async fn delete_tone_template(&self, user_id: Uuid, id: Uuid) -> Result<bool, DbError> {
        let client = self.pool.get().await?;
        let deleted = client.execute(
            "DELETE FROM tone_templates WHERE id = $1 AND user_id = $2 AND is_system = false",
            &[&id, &user_id]
        ).await?;
        Ok(deleted > 0)
    }

    /// Content templates visible to the user, optionally limited to one category
    pub async fn list_content_templates(
        &self,
        user_id: Uuid,
        category: Option<&str>,
    ) -> Result<Vec<ContentTemplate>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            SELECT {} FROM content_templates
            WHERE (is_system = true OR user_id = $1)
              AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY name
            "#,
            ContentTemplate::COLUMNS
        );
        let rows = client.query(&sql, &[&user_id, &category]).await?;
        Ok(rows.iter().map(ContentTemplate::from_row).collect())
    }

    /// Distinct categories across visible content templates, sorted
    pub async fn list_categories(&self, user_id: Uuid) -> Result<Vec<String>, DbError> {
        let client = self.pool.get().await?;
        let rows = client.query(
            r#"
            SELECT DISTINCT category FROM content_templates
            WHERE is_system = true OR user_id = $1
            ORDER BY category
            "#,
            &[&user_id]
        ).await?;
        Ok(rows.iter().map(|row| row.get("category")).collect())
    }

    pub async fn create_content_template(
        &self,
        user_id: Uuid,
        template: NewContentTemplate,
    ) -> Result<ContentTemplate, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            r#"
            INSERT INTO content_templates (
                name, description, category, prompt_template, settings, is_system, user_id
            ) VALUES ($1, $2, $3, $4, $5, false, $6)
            RETURNING {}
            "#,
            ContentTemplate::COLUMNS
        );
        let row = client.query_one(
            &sql,
            &[
                &template.name,
                &template.description,
                &template.category,
                &template.prompt_template,
                &template.settings,
                &user_id,
            ]
        ).await?;

        let created = ContentTemplate::from_row(&row);
        info!(
            template_id = %created.id,
            category = %created.category,
            user_id = %user_id,
            "Created content template"
        );
        Ok(created)
    }
}
