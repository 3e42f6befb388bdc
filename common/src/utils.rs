// common/src/utils.rs
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};
use chrono::Utc;
use uuid::Uuid;

use crate::models::profile::Profile;
use crate::models::session::{SessionClaims, SessionUser};

const SEPOLIA_CHAIN_ID: i64 = 11155111;
const MAINNET_CHAIN_ID: i64 = 1;

/// Setup tracing for consistent logging
pub fn setup_tracing(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already installed");
    }
}

/// Sign a session token for a profile, valid for `ttl_secs`
pub fn generate_session_token(
    profile: &Profile,
    secret: &[u8],
    ttl_secs: i64,
) -> Result<(String, SessionClaims), jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();

    let claims = SessionClaims {
        sub: profile.id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl_secs,
        user: SessionUser::from(profile),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret)
    )?;

    Ok((token, claims))
}

/// Validate a session token and return its claims
pub fn validate_session_token(token: &str, secret: &[u8]) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation
    )?;

    // sub and the embedded user must agree
    if token_data.claims.sub != token_data.claims.user.id.to_string() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    Ok(token_data.claims)
}

/// Human readable chain name
pub fn chain_name(chain_id: i64) -> &'static str {
    match chain_id {
        SEPOLIA_CHAIN_ID => "Sepolia",
        MAINNET_CHAIN_ID => "Ethereum",
        _ => "Unknown",
    }
}

/// Shorten a wallet address to `0x1234...abcd`. Anything that is not a
/// 40 digit hex address is returned unchanged.
pub fn shorten_address(address: &str) -> String {
    let well_formed = address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit());

    if !well_formed {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
