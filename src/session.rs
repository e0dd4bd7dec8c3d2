//! Admin session gate. A single admin account from configuration; a
//! successful login issues an opaque token carried in the `admin_session`
//! cookie and kept in memory until it expires or the admin logs out.

use std::time::{Duration, Instant};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time;
use dashmap::DashMap;
use ulid::Ulid;

use crate::limits::{MAX_SESSIONS, MAX_SESSION_TTL_HOURS};
use crate::observability::{LOGIN_FAILURES_TOTAL, SESSIONS_ACTIVE};

pub const SESSION_COOKIE: &str = "admin_session";

pub struct SessionStore {
    sessions: DashMap<String, Instant>,
    ttl: Duration,
    admin_user: String,
    admin_password: String,
    secure_cookies: bool,
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl SessionStore {
    /// `ttl` is capped at a year.
    pub fn new(admin_user: String, admin_password: String, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: ttl.min(Duration::from_secs(MAX_SESSION_TTL_HOURS * 3600)),
            admin_user,
            admin_password,
            secure_cookies: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Check the credentials and open a session. `None` on bad credentials.
    pub fn login(&self, user: &str, password: &str) -> Option<String> {
        let user_ok = constant_time_eq(user.as_bytes(), self.admin_user.as_bytes());
        let pass_ok = constant_time_eq(password.as_bytes(), self.admin_password.as_bytes());
        if !(user_ok && pass_ok) {
            metrics::counter!(LOGIN_FAILURES_TOTAL).increment(1);
            tracing::warn!("admin login failed for user {user:?}");
            return None;
        }

        if self.sessions.len() >= MAX_SESSIONS {
            self.purge_expired();
        }
        if self.sessions.len() >= MAX_SESSIONS {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|e| *e.value())
                .map(|e| e.key().clone());
            if let Some(token) = oldest {
                self.sessions.remove(&token);
            }
        }

        let now = Instant::now();
        let Some(expires_at) = now.checked_add(self.ttl) else {
            tracing::error!("session ttl {:?} is out of range", self.ttl);
            return None;
        };
        let token = Ulid::new().to_string();
        self.sessions.insert(token.clone(), expires_at);
        metrics::gauge!(SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        tracing::info!("admin session opened");
        Some(token)
    }

    /// Whether `token` names a live session. Expired sessions are dropped.
    pub fn is_valid(&self, token: &str) -> bool {
        let expired = match self.sessions.get(token) {
            None => return false,
            Some(expires_at) => *expires_at <= Instant::now(),
        };
        if expired {
            self.sessions.remove(token);
            metrics::gauge!(SESSIONS_ACTIVE).set(self.sessions.len() as f64);
            return false;
        }
        true
    }

    pub fn logout(&self, token: &str) {
        if self.sessions.remove(token).is_some() {
            metrics::gauge!(SESSIONS_ACTIVE).set(self.sessions.len() as f64);
            tracing::info!("admin session closed");
        }
    }

    /// Drop every expired session; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, expires_at| *expires_at > now);
        let removed = before.saturating_sub(self.sessions.len());
        metrics::gauge!(SESSIONS_ACTIVE).set(self.sessions.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// The session token carried in a request's cookies, if any.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

fn base_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .secure(secure)
        .build()
}

pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    base_cookie(token, time::Duration::seconds(secs), secure)
}

pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    base_cookie(String::new(), time::Duration::ZERO, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl: Duration) -> SessionStore {
        SessionStore::new("admin".into(), "s3cret".into(), ttl)
    }

    #[test]
    fn login_checks_credentials() {
        let s = store(Duration::from_secs(60));
        assert!(s.login("admin", "wrong").is_none());
        assert!(s.login("root", "s3cret").is_none());
        assert!(s.login("admin", "s3cret!").is_none());
        let token = s.login("admin", "s3cret").unwrap();
        assert!(s.is_valid(&token));
        assert!(!s.is_valid("forged"));
    }

    #[test]
    fn logout_invalidates() {
        let s = store(Duration::from_secs(60));
        let token = s.login("admin", "s3cret").unwrap();
        s.logout(&token);
        assert!(!s.is_valid(&token));
        assert!(s.is_empty());
    }

    #[test]
    fn expired_sessions_are_rejected_and_purged() {
        let s = store(Duration::ZERO);
        let token = s.login("admin", "s3cret").unwrap();
        assert!(!s.is_valid(&token));
        s.login("admin", "s3cret").unwrap();
        assert_eq!(s.purge_expired(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn session_count_is_bounded() {
        let s = store(Duration::from_secs(60));
        for _ in 0..MAX_SESSIONS + 10 {
            s.login("admin", "s3cret").unwrap();
        }
        assert_eq!(s.len(), MAX_SESSIONS);
    }

    #[test]
    fn token_is_read_from_the_jar() {
        let jar = CookieJar::new()
            .add(Cookie::new("theme", "dark"))
            .add(Cookie::new(SESSION_COOKIE, "abc123"));
        assert_eq!(session_token(&jar).as_deref(), Some("abc123"));

        let blank = CookieJar::new().add(Cookie::new(SESSION_COOKIE, ""));
        assert_eq!(session_token(&blank), None);
        assert_eq!(session_token(&CookieJar::new()), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let c = session_cookie("abc".into(), Duration::from_secs(3600), false);
        assert_eq!(c.name(), SESSION_COOKIE);
        assert_eq!(c.value(), "abc");
        assert_eq!(c.path(), Some("/"));
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.max_age(), Some(time::Duration::seconds(3600)));
        assert_ne!(c.secure(), Some(true));

        let c = session_cookie("abc".into(), Duration::from_secs(60), true);
        assert_eq!(c.secure(), Some(true));
        assert!(c.to_string().contains("Secure"));

        let cleared = clear_session_cookie(true);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cleared.secure(), Some(true));
    }

    #[test]
    fn huge_ttl_is_capped() {
        let s = store(Duration::MAX);
        assert_eq!(s.ttl(), Duration::from_secs(MAX_SESSION_TTL_HOURS * 3600));
        let token = s.login("admin", "s3cret").unwrap();
        assert!(s.is_valid(&token));
    }
}
