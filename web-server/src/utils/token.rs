// web-server/src/utils/token.rs
use rand::{thread_rng, Rng};
use rand::distributions::Alphanumeric;

/// SIWE nonce length; EIP-4361 asks for at least 8 alphanumerics
pub const NONCE_LENGTH: usize = 32;

/// Generate a cryptographically secure random token of specified length
pub fn generate_secure_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a SIWE nonce
pub fn generate_nonce() -> String {
    generate_secure_token(NONCE_LENGTH)
}
