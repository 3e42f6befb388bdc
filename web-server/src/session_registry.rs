// web-server/src/session_registry.rs
use actix::{Actor, Context, Handler, Message, AsyncContext, MessageResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::time::Duration;

// Default cleanup interval in seconds
const DEFAULT_CLEANUP_INTERVAL: u64 = 60;

/// Actor message: Revoke a session until its token would have expired anyway
#[derive(Message)]
#[rtype(result = "()")]
pub struct RevokeSession {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Actor message: Check whether a session has been revoked
#[derive(Message)]
#[rtype(result = "bool")]
pub struct IsSessionRevoked {
    pub session_id: String,
}

/// Actor message: Mark a nonce as used. Returns false if it was already used.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct ConsumeNonce {
    pub nonce: String,
}

/// Actor message: Drop entries whose expiry has passed
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpired;

/// Actor message: Get registry metrics
#[derive(Message)]
#[rtype(result = "RegistryMetrics")]
pub struct GetRegistryMetrics;

/// Registry metrics
#[derive(Debug, Clone, Default)]
pub struct RegistryMetrics {
    pub revoked_sessions: usize,
    pub consumed_nonces: usize,
    pub total_revocations: usize,
    pub replayed_nonces: usize,
    pub expired_count: usize,
}

/// Tracks revoked session ids and consumed SIWE nonces
pub struct SessionRegistryActor {
    // Session id to the expiry of its token
    revoked: HashMap<String, DateTime<Utc>>,
    // Nonce to the time it stops mattering
    nonces: HashMap<String, DateTime<Utc>>,
    // How long a consumed nonce is remembered
    nonce_ttl: ChronoDuration,
    // Cleanup interval in seconds
    cleanup_interval: u64,
    metrics: RegistryMetrics,
}

impl SessionRegistryActor {
    pub fn new(nonce_ttl_secs: i64) -> Self {
        Self {
            revoked: HashMap::new(),
            nonces: HashMap::new(),
            nonce_ttl: ChronoDuration::seconds(nonce_ttl_secs),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            metrics: RegistryMetrics::default(),
        }
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds.max(1);
        self
    }

    fn update_metrics(&mut self) {
        self.metrics.revoked_sessions = self.revoked.len();
        self.metrics.consumed_nonces = self.nonces.len();
    }

    /// Remove expired entries and update metrics
    fn cleanup(&mut self) -> usize {
        let now = Utc::now();
        let before = self.revoked.len() + self.nonces.len();

        self.revoked.retain(|_, expires_at| *expires_at > now);
        self.nonces.retain(|_, expires_at| *expires_at > now);

        let expired_count = before - (self.revoked.len() + self.nonces.len());
        self.metrics.expired_count += expired_count;
        self.update_metrics();

        expired_count
    }
}

impl Actor for SessionRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "SessionRegistryActor started, nonce TTL: {}s",
            self.nonce_ttl.num_seconds()
        );

        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired_count = act.cleanup();
            if expired_count > 0 {
                tracing::debug!("Cleaned up {} expired registry entries", expired_count);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "SessionRegistryActor stopped. {} revocations, {} replayed nonces during lifetime",
            self.metrics.total_revocations,
            self.metrics.replayed_nonces
        );
    }
}

impl Handler<RevokeSession> for SessionRegistryActor {
    type Result = ();

    fn handle(&mut self, msg: RevokeSession, _ctx: &mut Self::Context) -> Self::Result {
        if msg.expires_at <= Utc::now() {
            return;
        }
        if self.revoked.insert(msg.session_id, msg.expires_at).is_none() {
            self.metrics.total_revocations += 1;
        }
        self.update_metrics();
    }
}

impl Handler<IsSessionRevoked> for SessionRegistryActor {
    type Result = bool;

    fn handle(&mut self, msg: IsSessionRevoked, _ctx: &mut Self::Context) -> Self::Result {
        self.revoked.contains_key(&msg.session_id)
    }
}

impl Handler<ConsumeNonce> for SessionRegistryActor {
    type Result = bool;

    fn handle(&mut self, msg: ConsumeNonce, _ctx: &mut Self::Context) -> Self::Result {
        let now = Utc::now();
        match self.nonces.get(&msg.nonce) {
            Some(expires_at) if *expires_at > now => {
                self.metrics.replayed_nonces += 1;
                tracing::warn!("Rejected replayed nonce");
                false
            }
            _ => {
                self.nonces.insert(msg.nonce, now + self.nonce_ttl);
                self.update_metrics();
                true
            }
        }
    }
}

impl Handler<CleanupExpired> for SessionRegistryActor {
    type Result = MessageResult<CleanupExpired>;

    fn handle(&mut self, _msg: CleanupExpired, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.cleanup())
    }
}

impl Handler<GetRegistryMetrics> for SessionRegistryActor {
    type Result = MessageResult<GetRegistryMetrics>;

    fn handle(&mut self, _msg: GetRegistryMetrics, _ctx: &mut Self::Context) -> Self::Result {
        self.update_metrics();
        MessageResult(self.metrics.clone())
    }
}
