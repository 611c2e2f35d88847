//! API key database operations

use super::models::SubscriptionTier;
use super::pool::{DbPool, DbError};
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Sha256, Digest};
use tokio_postgres::Row;
use tracing::{info, warn};
use uuid::Uuid;

/// Every key starts with this marker
pub const KEY_MARKER: &str = "vv_";
/// Random characters after the marker
pub const KEY_BODY_LEN: usize = 32;
/// Marker plus the first 8 random characters, stored in clear for lookup
pub const KEY_PREFIX_LEN: usize = 11;

/// Database model for API key, joined with its owner's tier
#[derive(Debug, Clone)]
pub struct DbApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub key_prefix: String,
    pub name: String,
    pub tier: SubscriptionTier,
    pub rate_limit_per_minute: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DbApiKey {
    /// Check if the API key is valid (active and not expired)
    pub fn is_valid(&self) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(expires) = self.expires_at {
            if expires < Utc::now() {
                return false;
            }
        }
        true
    }

    fn from_row(row: &Row) -> Self {
        DbApiKey {
            id: row.get("id"),
            user_id: row.get("user_id"),
            key_prefix: row.get("key_prefix"),
            name: row.get("name"),
            tier: SubscriptionTier::from_str(row.get("subscription_tier")),
            rate_limit_per_minute: row.get("rate_limit_per_minute"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            last_used_at: row.get("last_used_at"),
            expires_at: row.get("expires_at"),
        }
    }
}

const KEY_COLUMNS: &str = "k.id, k.user_id, k.key_prefix, k.name, p.subscription_tier, \
    k.rate_limit_per_minute, k.is_active, k.created_at, k.last_used_at, k.expires_at";

/// Request to create a new API key
#[derive(Debug)]
pub struct CreateApiKeyRequest {
    pub user_id: Uuid,
    pub name: String,
    pub tier: SubscriptionTier,
    pub rate_limit_per_minute: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response containing the new API key (only returned once!)
#[derive(Debug)]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub api_key: String,
    pub key_prefix: String,
    pub name: String,
    pub rate_limit_per_minute: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Repository for API key operations
pub struct ApiKeyRepository {
    pub pool: DbPool,
}

impl ApiKeyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Generate a new API key
    /// Format: vv_<32 random alphanumeric chars>
    pub fn generate_api_key() -> String {
        const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
        let mut rng = rand::thread_rng();

        let key_body: String = (0..KEY_BODY_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect();

        format!("{}{}", KEY_MARKER, key_body)
    }

    /// Hash an API key using SHA-256
    pub fn hash_api_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether a presented key has the shape of one we issue
    pub fn is_well_formed(key: &str) -> bool {
        key.len() == KEY_MARKER.len() + KEY_BODY_LEN
            && key.starts_with(KEY_MARKER)
            && key[KEY_MARKER.len()..].bytes().all(|b| b.is_ascii_alphanumeric())
    }

    /// Create a new API key
    pub async fn create(&self, request: CreateApiKeyRequest) -> Result<CreateApiKeyResponse, DbError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let created = insert_api_key(&tx, request).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Validate an API key and return its details
    pub async fn validate(&self, api_key: &str) -> Result<Option<DbApiKey>, DbError> {
        if !Self::is_well_formed(api_key) {
            return Ok(None);
        }
        let client = self.pool.get().await?;

        let key_prefix = &api_key[..KEY_PREFIX_LEN];
        let key_hash = Self::hash_api_key(api_key);

        let sql = format!(
            r#"
            SELECT {}
            FROM api_keys k
            JOIN profiles p ON p.id = k.user_id
            WHERE k.key_prefix = $1 AND k.key_hash = $2
            "#,
            KEY_COLUMNS
        );
        let row = client.query_opt(&sql, &[&key_prefix, &key_hash]).await?;

        Ok(row.as_ref().map(DbApiKey::from_row))
    }

    /// Update last_used_at timestamp
    pub async fn touch(&self, key_id: Uuid) -> Result<(), DbError> {
        let client = self.pool.get().await?;

        client.execute(
            "UPDATE api_keys SET last_used_at = NOW() WHERE id = $1",
            &[&key_id]
        ).await?;

        Ok(())
    }

    /// List all API keys of a user
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DbApiKey>, DbError> {
        let client = self.pool.get().await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM api_keys k
            JOIN profiles p ON p.id = k.user_id
            WHERE k.user_id = $1
            ORDER BY k.created_at DESC
            "#,
            KEY_COLUMNS
        );
        let rows = client.query(&sql, &[&user_id]).await?;

        Ok(rows.iter().map(DbApiKey::from_row).collect())
    }

    /// Revoke (deactivate) one of the user's API keys
    pub async fn revoke(&self, user_id: Uuid, id: Uuid) -> Result<bool, DbError> {
        let client = self.pool.get().await?;

        let result = client.execute(
            "UPDATE api_keys SET is_active = false WHERE id = $1 AND user_id = $2",
            &[&id, &user_id]
        ).await?;

        if result > 0 {
            warn!(key_id = %id, user_id = %user_id, "API key revoked");
        }

        Ok(result > 0)
    }
}

/// Insert a freshly generated key inside `tx`
pub(crate) async fn insert_api_key(
    tx: &deadpool_postgres::Transaction<'_>,
    request: CreateApiKeyRequest,
) -> Result<CreateApiKeyResponse, DbError> {
    let api_key = ApiKeyRepository::generate_api_key();
    let key_prefix = api_key[..KEY_PREFIX_LEN].to_string();
    let key_hash = ApiKeyRepository::hash_api_key(&api_key);

    let rate_limit = request.rate_limit_per_minute
        .unwrap_or_else(|| request.tier.default_rate_limit());

    let row = tx.query_one(
        r#"
        INSERT INTO api_keys (
            user_id, key_prefix, key_hash, name, rate_limit_per_minute, expires_at
        ) VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
        &[
            &request.user_id,
            &key_prefix,
            &key_hash,
            &request.name,
            &rate_limit,
            &request.expires_at,
        ]
    ).await?;

    let id: Uuid = row.get("id");

    info!(
        key_id = %id,
        key_prefix = %key_prefix,
        user_id = %request.user_id,
        "Created new API key"
    );

    Ok(CreateApiKeyResponse {
        id,
        api_key,
        key_prefix,
        name: request.name,
        rate_limit_per_minute: rate_limit,
        expires_at: request.expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = ApiKeyRepository::generate_api_key();
        assert!(key.starts_with("vv_"));
        assert_eq!(key.len(), 35);
        assert!(ApiKeyRepository::is_well_formed(&key));
    }

    #[test]
    fn test_malformed_keys_rejected() {
        assert!(!ApiKeyRepository::is_well_formed("vv_short"));
        assert!(!ApiKeyRepository::is_well_formed(&format!("sk_{}", "a".repeat(33))));
        assert!(!ApiKeyRepository::is_well_formed(&format!("vv_{}", "ă".repeat(16))));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let a = ApiKeyRepository::hash_api_key("vv_abc");
        let b = ApiKeyRepository::hash_api_key("vv_abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, ApiKeyRepository::hash_api_key("vv_abd"));
    }
}
