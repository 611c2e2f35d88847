//! Saved content queries

use tokio_postgres::types::ToSql;
use uuid::Uuid;

use super::models::{ContentStatus, ContentUpdate, UserContent};
use super::pool::{DbError, DbPool};
use crate::domain::{Page, PageRequest};

/// Filters for listing a user's content
#[derive(Debug, Default, Clone)]
pub struct ContentFilter {
    pub status: Option<ContentStatus>,
    pub category: Option<String>,
    /// Case-insensitive match against title or body
    pub search: Option<String>,
}

impl ContentFilter {
    /// Escape LIKE wildcards so user input matches literally
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

/// Repository for user content
pub struct ContentRepository {
    pool: DbPool,
}

impl ContentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List a user's content, newest first, with an exact total count
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<UserContent>, DbError> {
        let client = self.pool.get().await?;

        let status = filter.status.map(|s| s.as_str());
        let pattern = filter.search_pattern();
        let where_clause = r#"
            WHERE user_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR category = $3)
              AND ($4::TEXT IS NULL OR title ILIKE $4 OR content ILIKE $4)
        "#;
        let params: [&(dyn ToSql + Sync); 4] = [&user_id, &status, &filter.category, &pattern];

        let count_sql = format!("SELECT COUNT(*) AS total FROM user_content {}", where_clause);
        let total: i64 = client.query_one(&count_sql, &params).await?.get("total");

        let list_sql = format!(
            "SELECT {} FROM user_content {} ORDER BY created_at DESC LIMIT $5 OFFSET $6",
            UserContent::COLUMNS,
            where_clause
        );
        let offset = page.offset();
        let rows = client.query(
            &list_sql,
            &[params[0], params[1], params[2], params[3], &page.limit, &offset]
        ).await?;

        let items = rows.iter().map(UserContent::from_row).collect();
        Ok(Page::new(items, total, page))
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<UserContent>, DbError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT {} FROM user_content WHERE id = $1 AND user_id = $2",
            UserContent::COLUMNS
        );
        let row = client.query_opt(&sql, &[&id, &user_id]).await?;
        Ok(row.as_ref().map(UserContent::from_row))
    }

    /// Apply a partial update; `updated_at` always moves forward
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: &ContentUpdate,
    ) -> Result<Option<UserContent>, DbError> {
        let client = self.pool.get().await?;

        let sql = format!(
            r#"
            UPDATE user_content SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                status = COALESCE($5, status),
                category = COALESCE($6, category),
                template = COALESCE($7, template),
                settings = COALESCE($8, settings),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            UserContent::COLUMNS
        );

        let status = update.status.map(|s| s.as_str());
        let row = client.query_opt(
            &sql,
            &[
                &id,
                &user_id,
                &update.title,
                &update.content,
                &status,
                &update.category,
                &update.template,
                &update.settings,
            ]
        ).await?;

        Ok(row.as_ref().map(UserContent::from_row))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, DbError> {
        let client = self.pool.get().await?;
        let deleted = client.execute(
            "DELETE FROM user_content WHERE id = $1 AND user_id = $2",
            &[&id, &user_id]
        ).await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ContentFilter {
            search: Some(" 100%_off ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%100\\%\\_off%"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ContentFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.search_pattern().is_none());
    }
}
