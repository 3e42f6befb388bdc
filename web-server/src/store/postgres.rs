// web-server/src/store/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::DatabaseConfig;
use common::models::profile::{NewProfile, Profile};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use super::{ProfileStore, Result, StoreError};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i32,
    wallet_address: String,
    chain_id: i64,
    username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            wallet_address: row.wallet_address,
            chain_id: row.chain_id,
            username: row.username,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Postgres-backed profile store
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(max_connections = config.max_connections, "Connecting to database");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        info!("Database connection pool established");
        Ok(Self { pool })
    }

    /// Run embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_by_wallet(&self, wallet_address: &str, chain_id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT * FROM users
            WHERE wallet_address = $1 AND chain_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(wallet_address)
        .bind(chain_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM users WHERE username = $1 AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn create(&self, profile: NewProfile) -> Result<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO users (wallet_address, chain_id, username)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&profile.wallet_address)
        .bind(profile.chain_id)
        .bind(&profile.username)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_username(&self, id: i32, username: &str) -> Result<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            UPDATE users SET username = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Profile::from).ok_or(StoreError::NotFound)
    }

    async fn soft_delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
