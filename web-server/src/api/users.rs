// web-server/src/api/users.rs
use actix::Addr;
use actix_web::{delete, get, patch, web, HttpResponse};
use common::models::profile::ProfileResponse;
use serde::Deserialize;

use crate::error::ApiError;
use crate::session::{revoke, AuthSettings, AuthenticatedUser};
use crate::session_registry::SessionRegistryActor;
use crate::store::ProfileStore;

const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub username: String,
}

/// Usernames are trimmed and must keep at least 3 characters
pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let username = username.trim();
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    Ok(username)
}

#[get("/me")]
pub async fn get_me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(ProfileResponse::from(&user.profile))
}

// Rename the current profile and refresh the session so it carries the new name
#[patch("/me")]
pub async fn update_me(
    user: AuthenticatedUser,
    body: web::Json<UpdateMeRequest>,
    settings: web::Data<AuthSettings>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    store: web::Data<dyn ProfileStore>,
) -> Result<HttpResponse, ApiError> {
    let username = validate_username(&body.username)?;

    if store.find_by_username(username).await?.is_some() {
        return Err(ApiError::UsernameTaken);
    }

    let profile = store.update_username(user.profile.id, username).await?;
    if profile.username != username {
        return Err(ApiError::InvalidInput("User not updated!".to_string()));
    }

    revoke(&registry, &user.claims).await?;
    let (cookie, _) = settings.sessions.issue(&profile)?;

    tracing::info!("Profile {} renamed to @{}", profile.id, profile.username);

    Ok(HttpResponse::Ok().cookie(cookie).json(true))
}

// Delete the current profile and end the session
#[delete("/me")]
pub async fn delete_me(
    user: AuthenticatedUser,
    settings: web::Data<AuthSettings>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    store: web::Data<dyn ProfileStore>,
) -> Result<HttpResponse, ApiError> {
    if !store.soft_delete(user.profile.id).await? {
        return Err(ApiError::NotFound);
    }
    revoke(&registry, &user.claims).await?;

    tracing::info!("Deleted profile {}", user.profile.id);

    Ok(HttpResponse::Ok()
        .cookie(settings.sessions.removal())
        .json(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("alice_01").unwrap(), "alice_01");
        assert_eq!(validate_username("alice.eth").unwrap(), "alice.eth");
        assert_eq!(validate_username("  jean-luc ").unwrap(), "jean-luc");
        assert_eq!(validate_username("älice").unwrap(), "älice");
        assert!(validate_username("al").is_err());
        assert!(validate_username("  al  ").is_err());
        assert!(validate_username("").is_err());
    }
}
