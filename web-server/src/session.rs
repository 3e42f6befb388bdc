// web-server/src/session.rs
use actix::Addr;
use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use common::models::profile::Profile;
use common::models::session::{SessionClaims, SessionData, SessionUser};
use common::{generate_session_token, validate_session_token, Config};
use futures_util::future::LocalBoxFuture;

use crate::error::ApiError;
use crate::secure_session::ChallengeCookies;
use crate::session_registry::{IsSessionRevoked, RevokeSession, SessionRegistryActor};
use crate::store::ProfileStore;

/// Issues and reads the session cookie
#[derive(Clone)]
pub struct SessionCookies {
    secret: Vec<u8>,
    name: String,
    ttl_secs: i64,
    secure: bool,
}

impl SessionCookies {
    pub fn new(secret: &[u8], name: impl Into<String>, ttl_secs: i64, secure: bool) -> Self {
        Self {
            secret: secret.to_vec(),
            name: name.into(),
            ttl_secs,
            secure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sign a session for `profile` and wrap it in a cookie
    pub fn issue(&self, profile: &Profile) -> Result<(Cookie<'static>, SessionClaims), ApiError> {
        let (token, claims) = generate_session_token(profile, &self.secret, self.ttl_secs)?;

        let mut cookie = Cookie::build(self.name.clone(), token)
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.ttl_secs))
            .finish();
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(claims.exp) {
            cookie.set_expires(expires);
        }

        Ok((cookie, claims))
    }

    /// Decode the session cookie, if any. Signature and expiry are checked,
    /// revocation is not.
    pub fn read(&self, req: &HttpRequest) -> Option<SessionClaims> {
        let cookie = req.cookie(&self.name)?;
        if cookie.value().is_empty() {
            return None;
        }

        match validate_session_token(cookie.value(), &self.secret) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("Invalid session: {}", e);
                None
            }
        }
    }

    /// Cookie that clears the session
    pub fn removal(&self) -> Cookie<'static> {
        Cookie::build(self.name.clone(), "")
            .path("/")
            .max_age(CookieDuration::seconds(0))
            .finish()
    }
}

/// Everything the auth handlers need from configuration
#[derive(Clone)]
pub struct AuthSettings {
    pub sessions: SessionCookies,
    pub challenges: ChallengeCookies,
    pub allowed_chain_ids: Vec<u64>,
    pub siwe_domain: Option<String>,
    pub protected_routes: Vec<String>,
    pub post_login_redirect: String,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        let secret = config.auth.secret.as_bytes();
        let secure = !config.is_development();

        Self {
            sessions: SessionCookies::new(
                secret,
                config.auth.session_cookie_name.clone(),
                config.auth.session_ttl_secs,
                secure,
            ),
            challenges: ChallengeCookies::new(
                secret,
                config.auth.challenge_cookie_name.clone(),
                config.auth.challenge_ttl_secs,
                secure,
            ),
            allowed_chain_ids: config.auth.allowed_chain_ids.clone(),
            siwe_domain: config.auth.siwe_domain.clone(),
            protected_routes: config.auth.protected_routes.clone(),
            post_login_redirect: config.auth.post_login_redirect.clone(),
        }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_routes.iter().any(|route| path.starts_with(route.as_str()))
    }
}

/// Valid, unrevoked session claims from the request
pub async fn current_session(
    req: &HttpRequest,
    settings: &AuthSettings,
    registry: &Addr<SessionRegistryActor>,
) -> Result<Option<SessionClaims>, ApiError> {
    let Some(claims) = settings.sessions.read(req) else {
        return Ok(None);
    };

    let revoked = registry
        .send(IsSessionRevoked { session_id: claims.jti.clone() })
        .await?;
    if revoked {
        tracing::debug!("Rejected revoked session {}", claims.jti);
        return Ok(None);
    }

    Ok(Some(claims))
}

/// Revoke the session so the token cannot be replayed after logout
pub async fn revoke(
    registry: &Addr<SessionRegistryActor>,
    claims: &SessionClaims,
) -> Result<(), ApiError> {
    registry
        .send(RevokeSession {
            session_id: claims.jti.clone(),
            expires_at: claims.expires_at(),
        })
        .await?;
    Ok(())
}

/// Extractor for handlers that require a logged-in, still existing profile.
/// Use `Option<AuthenticatedUser>` for handlers that merely look.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: SessionClaims,
    pub profile: Profile,
}

impl AuthenticatedUser {
    /// Session payload built from the stored profile, not the token snapshot
    pub fn session_data(&self) -> SessionData {
        SessionData {
            user: SessionUser::from(&self.profile),
            expires: self.claims.expires_at(),
        }
    }
}

/// Valid, unrevoked session whose profile still exists
pub async fn current_user(
    req: &HttpRequest,
    settings: &AuthSettings,
    registry: &Addr<SessionRegistryActor>,
    store: &dyn ProfileStore,
) -> Result<Option<AuthenticatedUser>, ApiError> {
    let Some(claims) = current_session(req, settings, registry).await? else {
        return Ok(None);
    };

    match store.find_by_id(claims.user.id).await? {
        Some(profile) => Ok(Some(AuthenticatedUser { claims, profile })),
        None => {
            tracing::info!("Session {} for missing profile {}", claims.jti, claims.user.id);
            Ok(None)
        }
    }
}

fn app_data<T: ?Sized + 'static>(req: &HttpRequest) -> Result<web::Data<T>, ApiError> {
    req.app_data::<web::Data<T>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal(format!("missing app data: {}", std::any::type_name::<T>())))
}

async fn authenticate(req: HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let settings = app_data::<AuthSettings>(&req)?;
    let registry = app_data::<Addr<SessionRegistryActor>>(&req)?;
    let store = app_data::<dyn ProfileStore>(&req)?;

    current_user(&req, &settings, &registry, &**store)
        .await?
        .ok_or(ApiError::Unauthorized)
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        Box::pin(authenticate(req.clone()))
    }
}
