// web-server/src/api/auth.rs
use actix::Addr;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use common::models::profile::{NewProfile, Profile};
use common::models::session::SessionData;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::users::validate_username;
use crate::error::ApiError;
use crate::secure_session::ChallengeSession;
use crate::session::{current_session, current_user, revoke, AuthSettings};
use crate::session_registry::{ConsumeNonce, SessionRegistryActor};
use crate::siwe::{verify_signature, SiweMessage};
use crate::store::ProfileStore;
use crate::utils::token::generate_nonce;

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String,
}

/// What the client should do after a successful verify
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerifyResponse {
    Signup,
    Signin,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthRedirect {
    pub redirect: String,
    pub session: SessionData,
}

// Start a challenge: fresh nonce in the encrypted cookie
#[post("/nonce")]
pub async fn nonce(settings: web::Data<AuthSettings>) -> Result<HttpResponse, ApiError> {
    let nonce = generate_nonce();
    let challenge = settings.challenges.new_challenge(nonce.clone());
    let cookie = settings.challenges.save(&challenge)?;

    tracing::debug!("Issued SIWE nonce");

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(NonceResponse { nonce }))
}

// Check a signed SIWE message against the pending challenge
#[post("/verify")]
pub async fn verify(
    req: HttpRequest,
    body: web::Json<VerifyRequest>,
    settings: web::Data<AuthSettings>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    store: web::Data<dyn ProfileStore>,
) -> Result<HttpResponse, ApiError> {
    let mut challenge = settings.challenges.load(&req);
    let expected_nonce = challenge.nonce.clone().ok_or(ApiError::InvalidNonce)?;

    let message = SiweMessage::parse(&body.message)?;
    verify_signature(&body.message, &body.signature, message.address)?;

    if message.nonce != expected_nonce {
        tracing::warn!("Nonce mismatch for {}", message.address);
        return Err(ApiError::InvalidNonce);
    }

    message.validate_time(Utc::now())?;
    if let Some(domain) = &settings.siwe_domain {
        message.validate_domain(domain)?;
    }
    if !settings.allowed_chain_ids.contains(&message.chain_id) {
        return Err(ApiError::UnsupportedChain(message.chain_id));
    }
    let chain_id = i64::try_from(message.chain_id)
        .map_err(|_| ApiError::UnsupportedChain(message.chain_id))?;

    if !registry.send(ConsumeNonce { nonce: expected_nonce }).await? {
        return Err(ApiError::InvalidNonce);
    }

    let wallet_address = message.address.to_checksum(None);
    challenge.nonce = None;
    challenge.wallet_address = Some(wallet_address.clone());
    challenge.chain_id = Some(chain_id);
    let cookie = settings.challenges.save(&challenge)?;

    let existing = store.find_by_wallet(&wallet_address, chain_id).await?;
    let response = if existing.is_some() {
        VerifyResponse::Signin
    } else {
        VerifyResponse::Signup
    };

    tracing::info!("Verified wallet {} on chain {}: {:?}", wallet_address, chain_id, response);

    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

fn verified_wallet(challenge: &ChallengeSession) -> Option<(String, i64)> {
    challenge
        .verified_wallet()
        .map(|(wallet, chain_id)| (wallet.to_string(), chain_id))
}

/// Issue the session cookie, drop the challenge and point the client on
fn signed_in(settings: &AuthSettings, profile: &Profile) -> Result<HttpResponse, ApiError> {
    let (cookie, claims) = settings.sessions.issue(profile)?;

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .cookie(settings.challenges.destroy())
        .json(AuthRedirect {
            redirect: settings.post_login_redirect.clone(),
            session: SessionData::from(&claims),
        }))
}

// Create a profile for a verified wallet
#[post("/register")]
pub async fn register(
    req: HttpRequest,
    body: web::Json<RegisterRequest>,
    settings: web::Data<AuthSettings>,
    store: web::Data<dyn ProfileStore>,
) -> Result<HttpResponse, ApiError> {
    let challenge = settings.challenges.load(&req);
    let (wallet_address, chain_id) =
        verified_wallet(&challenge).ok_or(ApiError::NoRegistrationSession)?;

    let username = validate_username(&body.username)?;

    if store.find_by_wallet(&wallet_address, chain_id).await?.is_some() {
        return Err(ApiError::NoRegistrationSession);
    }
    if store.find_by_username(username).await?.is_some() {
        return Err(ApiError::UsernameTaken);
    }

    let profile = store
        .create(NewProfile {
            wallet_address,
            chain_id,
            username: username.to_string(),
        })
        .await?;

    tracing::info!("Registered profile {} (@{})", profile.id, profile.username);

    signed_in(&settings, &profile)
}

// Sign in a verified wallet that already has a profile
#[post("/login")]
pub async fn login(
    req: HttpRequest,
    settings: web::Data<AuthSettings>,
    store: web::Data<dyn ProfileStore>,
) -> Result<HttpResponse, ApiError> {
    let challenge = settings.challenges.load(&req);
    let (wallet_address, chain_id) = verified_wallet(&challenge).ok_or(ApiError::NotVerified)?;

    let Some(profile) = store.find_by_wallet(&wallet_address, chain_id).await? else {
        return Ok(HttpResponse::Ok().json(json!({ "new": true })));
    };

    tracing::info!("Signed in profile {} (@{})", profile.id, profile.username);

    signed_in(&settings, &profile)
}

// Sign out; succeeds without a session too
#[post("/logout")]
pub async fn logout(
    req: HttpRequest,
    settings: web::Data<AuthSettings>,
    registry: web::Data<Addr<SessionRegistryActor>>,
) -> Result<HttpResponse, ApiError> {
    if let Some(claims) = current_session(&req, &settings, &registry).await? {
        revoke(&registry, &claims).await?;
        tracing::info!("Signed out profile {}", claims.user.id);
    }

    Ok(HttpResponse::Ok()
        .cookie(settings.sessions.removal())
        .cookie(settings.challenges.destroy())
        .json(json!({ "status": "success" })))
}

// Current session, or null
#[get("/session")]
pub async fn session(
    req: HttpRequest,
    settings: web::Data<AuthSettings>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    store: web::Data<dyn ProfileStore>,
) -> Result<HttpResponse, ApiError> {
    let session = current_user(&req, &settings, &registry, &**store)
        .await?
        .map(|user| user.session_data());

    Ok(HttpResponse::Ok().json(session))
}
