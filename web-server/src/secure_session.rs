// web-server/src/secure_session.rs
//! Short-lived encrypted cookie carrying the SIWE challenge between the
//! nonce, verify and register/login steps.
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, CookieJar, Key, SameSite};
use actix_web::HttpRequest;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Challenge state. `nonce` is cleared once a signature has been verified;
/// wallet and chain are only present after that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSession {
    pub nonce: Option<String>,
    pub wallet_address: Option<String>,
    pub chain_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ChallengeSession {
    /// Wallet and chain recorded by a successful verify
    pub fn verified_wallet(&self) -> Option<(&str, i64)> {
        match (&self.wallet_address, self.chain_id) {
            (Some(wallet), Some(chain_id)) => Some((wallet.as_str(), chain_id)),
            _ => None,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at <= now)
    }
}

/// Reads and writes the encrypted challenge cookie
#[derive(Clone)]
pub struct ChallengeCookies {
    key: Key,
    name: String,
    ttl_secs: i64,
    secure: bool,
}

impl ChallengeCookies {
    /// `secret` must be at least 32 bytes
    pub fn new(secret: &[u8], name: impl Into<String>, ttl_secs: i64, secure: bool) -> Self {
        Self {
            key: Key::derive_from(secret),
            name: name.into(),
            ttl_secs,
            secure,
        }
    }

    /// A fresh challenge for `nonce`
    pub fn new_challenge(&self, nonce: String) -> ChallengeSession {
        ChallengeSession {
            nonce: Some(nonce),
            wallet_address: None,
            chain_id: None,
            expires_at: Some(Utc::now() + Duration::seconds(self.ttl_secs)),
        }
    }

    /// Load the challenge from the request. Missing, tampered or expired
    /// cookies read as an empty challenge.
    pub fn load(&self, req: &HttpRequest) -> ChallengeSession {
        let Some(cookie) = req.cookie(&self.name) else {
            return ChallengeSession::default();
        };

        let mut jar = CookieJar::new();
        jar.add_original(cookie);

        let Some(decrypted) = jar.private(&self.key).get(&self.name) else {
            tracing::warn!("Discarding challenge cookie that failed to decrypt");
            return ChallengeSession::default();
        };

        match serde_json::from_str::<ChallengeSession>(decrypted.value()) {
            Ok(session) if !session.is_expired(Utc::now()) => session,
            Ok(_) => {
                tracing::debug!("Challenge cookie expired");
                ChallengeSession::default()
            }
            Err(e) => {
                tracing::warn!("Malformed challenge cookie: {}", e);
                ChallengeSession::default()
            }
        }
    }

    /// Encrypt the challenge into a cookie
    pub fn save(&self, session: &ChallengeSession) -> Result<Cookie<'static>, serde_json::Error> {
        let value = serde_json::to_string(session)?;
        let cookie = Cookie::build(self.name.clone(), value)
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.ttl_secs))
            .finish();

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(cookie);

        Ok(jar
            .get(&self.name)
            .cloned()
            .unwrap_or_else(|| self.destroy()))
    }

    /// Cookie that clears the challenge
    pub fn destroy(&self) -> Cookie<'static> {
        Cookie::build(self.name.clone(), "")
            .path("/")
            .max_age(CookieDuration::seconds(0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn cookies() -> ChallengeCookies {
        ChallengeCookies::new(SECRET, "siwe_challenge", 300, false)
    }

    #[test]
    fn test_roundtrip_through_request() {
        let cookies = cookies();
        let mut challenge = cookies.new_challenge("abcdEFGH1234".to_string());
        challenge.wallet_address = Some("0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string());
        challenge.chain_id = Some(11155111);

        let cookie = cookies.save(&challenge).unwrap();
        assert!(!cookie.value().contains("abcdEFGH1234"));
        assert_eq!(cookie.http_only(), Some(true));

        let req = TestRequest::default().cookie(cookie).to_http_request();
        let loaded = cookies.load(&req);
        assert_eq!(loaded, challenge);
        assert_eq!(
            loaded.verified_wallet(),
            Some(("0x71C7656EC7ab88b098defB751B7401B5f6d8976F", 11155111))
        );
    }

    #[test]
    fn test_tampered_cookie_is_empty() {
        let req = TestRequest::default()
            .cookie(Cookie::new("siwe_challenge", "{\"nonce\":\"forged\"}"))
            .to_http_request();
        assert_eq!(cookies().load(&req), ChallengeSession::default());
    }

    #[test]
    fn test_other_key_cannot_read() {
        let cookie = cookies().save(&cookies().new_challenge("abcdEFGH1234".into())).unwrap();
        let other = ChallengeCookies::new(b"ffffffffffffffffffffffffffffffff", "siwe_challenge", 300, false);
        let req = TestRequest::default().cookie(cookie).to_http_request();
        assert_eq!(other.load(&req), ChallengeSession::default());
    }

    #[test]
    fn test_expired_challenge_is_empty() {
        let cookies = cookies();
        let mut challenge = cookies.new_challenge("abcdEFGH1234".into());
        challenge.expires_at = Some(Utc::now() - Duration::seconds(1));
        let req = TestRequest::default()
            .cookie(cookies.save(&challenge).unwrap())
            .to_http_request();
        assert_eq!(cookies.load(&req), ChallengeSession::default());
    }
}
