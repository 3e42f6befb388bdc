// common/src/models/profile.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A wallet-backed user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i32,
    /// EIP-55 checksummed address
    pub wallet_address: String,
    pub chain_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields supplied when registering a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub wallet_address: String,
    pub chain_id: i64,
    pub username: String,
}

/// Public view of a profile returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub wallet_address: String,
    pub short_address: String,
    pub chain_id: i64,
    pub chain_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            display_name: format!("@{}", profile.username),
            wallet_address: profile.wallet_address.clone(),
            short_address: crate::utils::shorten_address(&profile.wallet_address),
            chain_id: profile.chain_id,
            chain_name: crate::utils::chain_name(profile.chain_id).to_string(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
