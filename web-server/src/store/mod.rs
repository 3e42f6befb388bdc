// web-server/src/store/mod.rs
//! Profile persistence.
mod memory;
mod postgres;

pub use memory::MemoryProfileStore;
pub use postgres::PgProfileStore;

use async_trait::async_trait;
use common::models::profile::{NewProfile, Profile};
use thiserror::Error;

pub(crate) const WALLET_CONSTRAINT: &str = "users_wallet_chain_key";
pub(crate) const USERNAME_CONSTRAINT: &str = "users_username_key";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Wallet already registered")]
    WalletTaken,
    #[error("Profile not found")]
    NotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some(WALLET_CONSTRAINT) => StoreError::WalletTaken,
                    Some(USERNAME_CONSTRAINT) => StoreError::UsernameTaken,
                    _ => StoreError::Database(err.to_string()),
                };
            }
        }
        if let sqlx::Error::RowNotFound = err {
            return StoreError::NotFound;
        }
        StoreError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage for wallet profiles. Every lookup ignores soft-deleted rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Profile>>;

    async fn find_by_wallet(&self, wallet_address: &str, chain_id: i64) -> Result<Option<Profile>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>>;

    /// Fails with `WalletTaken` or `UsernameTaken` on conflicts
    async fn create(&self, profile: NewProfile) -> Result<Profile>;

    /// Fails with `UsernameTaken` on conflict, `NotFound` if the profile is gone
    async fn update_username(&self, id: i32, username: &str) -> Result<Profile>;

    /// Returns false when there was no live profile to delete
    async fn soft_delete(&self, id: i32) -> Result<bool>;
}
