//! Session tokens and the authenticated-user extractor.
//!
//! A token is an opaque session id kept in the `Sessions` table. Clients
//! present it as `Authorization: Bearer <token>` or through the
//! `session_id` cookie set at login.

use actix_web::cookie::Cookie;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use log::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::session::Session;
use crate::models::user::User;
use crate::state::AppState;
use crate::store::Store;

pub const SESSION_COOKIE: &str = "session_id";

/// The caller behind a valid, unexpired session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub session_id: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

pub async fn issue_session(
    store: &dyn Store,
    user_id: i64,
    ttl: Duration,
) -> Result<Session, ApiError> {
    let now = Utc::now();
    let purged = store.purge_expired_sessions(now).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let session = Session {
        session_id: Uuid::new_v4().simple().to_string(),
        user_id,
        expires_at: now + ttl,
    };
    store.create_session(&session).await?;
    Ok(session)
}

pub fn session_cookie(session: &Session) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session.session_id.clone())
        .path("/")
        .http_only(true)
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}

/// Bearer token first, then the session cookie.
fn presented_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

pub async fn authenticate(store: &dyn Store, token: &str) -> Result<User, ApiError> {
    let session = store
        .find_session(token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token.".into()))?;

    if session.is_expired_at(Utc::now()) {
        store.delete_session(token).await?;
        info!("Session expired for user {}", session.user_id);
        return Err(ApiError::Unauthorized("Token expired.".into()));
    }

    store
        .find_user(session.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token. User not found.".into()))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = presented_token(req);
        Box::pin(async move {
            let state = state
                .ok_or_else(|| ApiError::Internal("application state is not configured".into()))?;
            let session_id = token.ok_or_else(|| {
                ApiError::Unauthorized("Access denied. No token provided.".into())
            })?;
            let user = authenticate(state.store.as_ref(), &session_id).await?;
            Ok(AuthUser { user, session_id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::store::MemoryStore;
    use actix_web::test::TestRequest;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        (store, user)
    }

    #[actix_web::test]
    async fn issued_sessions_authenticate_their_user() {
        let (store, user) = store_with_user().await;
        let session = issue_session(&store, user.id, Duration::hours(1)).await.unwrap();

        let found = authenticate(&store, &session.session_id).await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[actix_web::test]
    async fn expired_sessions_are_rejected_and_removed() {
        let (store, user) = store_with_user().await;
        let session = issue_session(&store, user.id, Duration::hours(-1)).await.unwrap();

        let err = authenticate(&store, &session.session_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Token expired.");
        assert!(store.find_session(&session.session_id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn issuing_a_session_purges_expired_ones() {
        let (store, user) = store_with_user().await;
        let stale = issue_session(&store, user.id, Duration::hours(-1)).await.unwrap();
        let live = issue_session(&store, user.id, Duration::hours(1)).await.unwrap();

        assert!(store.find_session(&stale.session_id).await.unwrap().is_none());
        assert!(store.find_session(&live.session_id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn unknown_tokens_are_rejected() {
        let (store, _) = store_with_user().await;
        let err = authenticate(&store, "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid token.");
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .to_http_request();
        assert_eq!(presented_token(&req).as_deref(), Some("from-header"));

        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .to_http_request();
        assert_eq!(presented_token(&req).as_deref(), Some("from-cookie"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic abc"))
            .to_http_request();
        assert_eq!(presented_token(&req), None);
    }
}
