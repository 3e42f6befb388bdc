pub mod auth_gate;
pub mod rate_limiter;

pub use auth_gate::AuthGate;
pub use rate_limiter::RateLimiter;
