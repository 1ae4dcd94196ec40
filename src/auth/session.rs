use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{auth::repo::User, state::AppState};

pub const SESSION_COOKIE: &str = "superqa_session";

/// Signed cookie payload. Validity is purely a function of signature and
/// expiry plus the referenced user still existing; there is no server-side
/// session store.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    iat: usize,
    exp: usize,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let session = &state.config.session;
        Self {
            encoding: EncodingKey::from_secret(session.secret.as_bytes()),
            decoding: DecodingKey::from_secret(session.secret.as_bytes()),
            ttl: Duration::from_secs(session.ttl_days.max(0) as u64 * 24 * 60 * 60),
            secure: state.config.production,
        }
    }
}

impl SessionKeys {
    /// Signs a session for the user and wraps it in the session cookie.
    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<Cookie<'static>> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(%user_id, "session issued");
        Ok(Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(self.ttl.as_secs() as i64))
            .build())
    }

    /// Absent, malformed, tampered and expired cookies all read as None.
    pub fn read(&self, jar: &CookieJar) -> Option<Uuid> {
        let cookie = jar.get(SESSION_COOKIE)?;
        match decode::<SessionClaims>(cookie.value(), &self.decoding, &Validation::default()) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                debug!(error = %e, "session cookie rejected");
                None
            }
        }
    }
}

/// Queues a removal cookie. Harmless when no session existed.
pub fn destroy(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// The outcome of a failed session check: send the caller to the sign-in
/// page, preserving where they were headed, and clear any stale cookie.
/// Returned as an explicit value, never raised through a panic or layered
/// side channel, so every caller handles it deliberately.
#[derive(Debug)]
pub struct AuthRedirect {
    location: String,
}

impl AuthRedirect {
    pub fn to_signin(redirect_to: &str) -> Self {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("redirectTo", redirect_to)
            .finish();
        Self {
            location: format!("/signin?{query}"),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        let jar = destroy(CookieJar::new());
        (jar, Redirect::to(&self.location)).into_response()
    }
}

/// Resolves the caller to a user id or ends the request with a redirect.
///
/// A store lookup failure is treated exactly like a missing user: ambiguous
/// authorization state never leaves a request authenticated.
pub async fn require(
    keys: &SessionKeys,
    db: &PgPool,
    jar: &CookieJar,
    requested_path: &str,
) -> Result<Uuid, AuthRedirect> {
    let Some(user_id) = keys.read(jar) else {
        return Err(AuthRedirect::to_signin(requested_path));
    };
    match User::find_by_id(db, user_id).await {
        Ok(Some(_)) => Ok(user_id),
        Ok(None) => {
            warn!(%user_id, "session references a deleted user");
            Err(AuthRedirect::to_signin(requested_path))
        }
        Err(e) => {
            error!(error = %e, %user_id, "user lookup failed during session check");
            Err(AuthRedirect::to_signin(requested_path))
        }
    }
}

/// Extractor for handlers behind the session wall.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let keys = SessionKeys::from_ref(state);
        let user_id = require(&keys, &state.db, &jar, parts.uri.path()).await?;
        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    fn make_keys() -> SessionKeys {
        SessionKeys::from_ref(&AppState::fake())
    }

    fn jar_with(cookie: Cookie<'static>) -> CookieJar {
        CookieJar::new().add(cookie)
    }

    #[tokio::test]
    async fn issue_and_read_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let cookie = keys.issue(user_id).expect("issue session");
        assert_eq!(keys.read(&jar_with(cookie)), Some(user_id));
    }

    #[tokio::test]
    async fn cookie_attributes_match_contract() {
        let keys = make_keys();
        let cookie = keys.issue(Uuid::new_v4()).expect("issue session");
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(TimeDuration::days(30)));
        // fake state is non-production
        assert_eq!(cookie.secure(), Some(false));
    }

    #[tokio::test]
    async fn secure_flag_follows_environment() {
        let mut keys = make_keys();
        keys.secure = true;
        let cookie = keys.issue(Uuid::new_v4()).expect("issue session");
        assert_eq!(cookie.secure(), Some(true));
    }

    #[tokio::test]
    async fn missing_cookie_reads_none() {
        let keys = make_keys();
        assert_eq!(keys.read(&CookieJar::new()), None);
    }

    #[tokio::test]
    async fn tampered_cookie_reads_none() {
        let keys = make_keys();
        let cookie = keys.issue(Uuid::new_v4()).expect("issue session");
        let forged = Cookie::new(SESSION_COOKIE, format!("{}x", cookie.value()));
        assert_eq!(keys.read(&jar_with(forged)), None);
    }

    #[tokio::test]
    async fn garbage_cookie_reads_none() {
        let keys = make_keys();
        let garbage = Cookie::new(SESSION_COOKIE, "not-a-session");
        assert_eq!(keys.read(&jar_with(garbage)), None);
    }

    #[tokio::test]
    async fn expired_session_reads_none() {
        let keys = make_keys();
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            iat: (past - TimeDuration::days(30)).unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("sign");
        assert_eq!(keys.read(&jar_with(Cookie::new(SESSION_COOKIE, token))), None);
    }

    #[tokio::test]
    async fn foreign_secret_reads_none() {
        let keys = make_keys();
        let other = SessionKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            ttl: Duration::from_secs(60),
            secure: false,
        };
        let cookie = other.issue(Uuid::new_v4()).expect("issue session");
        assert_eq!(keys.read(&jar_with(cookie)), None);
    }

    #[tokio::test]
    async fn require_fails_closed_without_a_reachable_store() {
        // The fake state's pool points at nothing usable; a valid cookie must
        // still end in a redirect when the user cannot be confirmed.
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);
        let cookie = keys.issue(Uuid::new_v4()).expect("issue session");
        let outcome = require(&keys, &state.db, &jar_with(cookie), "/projects").await;
        let redirect = outcome.expect_err("must fail closed");
        assert_eq!(redirect.location(), "/signin?redirectTo=%2Fprojects");
    }

    #[tokio::test]
    async fn require_without_cookie_redirects_identically() {
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);
        let outcome = require(&keys, &state.db, &CookieJar::new(), "/projects").await;
        let redirect = outcome.expect_err("must redirect");
        assert_eq!(redirect.location(), "/signin?redirectTo=%2Fprojects");
    }

    #[test]
    fn auth_redirect_response_redirects_and_clears_cookie() {
        let response = AuthRedirect::to_signin("/projects/new").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        assert_eq!(location, "/signin?redirectTo=%2Fprojects%2Fnew");
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("set-cookie header");
        assert!(set_cookie.starts_with("superqa_session="));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[test]
    fn destroy_is_idempotent() {
        let jar = destroy(destroy(CookieJar::new()));
        let removals: Vec<_> = jar.iter().collect();
        // the jar holds at most the single removal entry
        assert!(removals.len() <= 1);
    }
}
