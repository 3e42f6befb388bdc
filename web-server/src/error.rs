// web-server/src/error.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::siwe::SiweError;
use crate::store::StoreError;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    description: &'a str,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid nonce")]
    InvalidNonce,
    #[error("Invalid SIWE message: {0}")]
    InvalidMessage(SiweError),
    #[error("Chain {0} is not supported")]
    UnsupportedChain(u64),
    #[error("No registration session")]
    NoRegistrationSession,
    #[error("Wallet not verified")]
    NotVerified,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Not authenticated")]
    Unauthorized,
    #[error("User not found")]
    NotFound,
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Session registry unavailable: {0}")]
    Registry(#[from] actix::MailboxError),
    #[error("Error while encoding JSON: {0}")]
    SerDe(#[from] serde_json::Error),
    #[error("{0}")]
    Internal(String),
}

impl From<SiweError> for ApiError {
    fn from(err: SiweError) -> Self {
        match err {
            SiweError::SignatureMismatch | SiweError::InvalidSignature(_) => ApiError::InvalidSignature,
            other => ApiError::InvalidMessage(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => ApiError::UsernameTaken,
            StoreError::WalletTaken => ApiError::NoRegistrationSession,
            StoreError::NotFound => ApiError::NotFound,
            other => ApiError::Store(other),
        }
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidSignature => "invalid_signature",
            ApiError::InvalidNonce => "invalid_nonce",
            ApiError::InvalidMessage(..) => "invalid_message",
            ApiError::UnsupportedChain(..) => "unsupported_chain",
            ApiError::NoRegistrationSession => "no_registration_session",
            ApiError::NotVerified => "not_verified",
            ApiError::UsernameTaken => "username_taken",
            ApiError::InvalidInput(..) => "invalid_input",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound => "not_found",
            ApiError::Store(..) => "database_error",
            ApiError::Token(..) => "token_error",
            ApiError::Registry(..) => "internal_error",
            ApiError::SerDe(..) => "internal_error",
            ApiError::Internal(..) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidSignature
            | ApiError::InvalidNonce
            | ApiError::InvalidMessage(..)
            | ApiError::UnsupportedChain(..)
            | ApiError::NoRegistrationSession
            | ApiError::NotVerified
            | ApiError::UsernameTaken
            | ApiError::InvalidInput(..) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(..)
            | ApiError::Token(..)
            | ApiError::Registry(..)
            | ApiError::SerDe(..)
            | ApiError::Internal(..) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let description = if status.is_server_error() {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody {
            error: self.code(),
            description: &description,
        })
    }
}
