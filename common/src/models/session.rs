// common/src/models/session.rs
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::profile::Profile;

/// User identity carried inside a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub wallet_address: String,
    pub chain_id: i64,
}

impl From<&Profile> for SessionUser {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            wallet_address: profile.wallet_address.clone(),
            chain_id: profile.chain_id,
        }
    }
}

/// JWT claims for an authenticated session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,       // profile id
    pub jti: String,       // session id, used for revocation
    pub exp: i64,          // expiration time
    pub iat: i64,          // issued at time
    pub user: SessionUser,
}

impl SessionClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Session payload returned to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}

impl From<&SessionClaims> for SessionData {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            user: claims.user.clone(),
            expires: claims.expires_at(),
        }
    }
}
