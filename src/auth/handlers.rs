use axum::{
    extract::{FromRef, State},
    http::header::{self, HeaderName},
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{GoogleRequest, SigninRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        session,
    },
    error::ApiError,
    state::AppState,
    users::{dto::PublicUser, repo::User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/google", post(google))
        .route("/auth/signout", get(signout))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

type SetCookie = AppendHeaders<[(HeaderName, String); 1]>;

fn signed_in(keys: &JwtKeys, user: User) -> Result<(SetCookie, Json<PublicUser>), ApiError> {
    let token = keys.sign(user.id)?;
    let cookie = session::session_cookie(&token, keys.ttl);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(user.into()),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("password too short".into()));
    }

    // Pre-checks give precise messages; the unique constraints still close the
    // race window (a concurrent duplicate insert surfaces as 409).
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("email already registered".into()));
    }
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Conflict("username already taken".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash, None).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(mut payload): Json<SigninRequest>,
) -> Result<(SetCookie, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "signin invalid password");
        return Err(ApiError::Auth("invalid credentials".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user signed in");
    let keys = JwtKeys::from_ref(&state);
    signed_in(&keys, user)
}

/// Trust handoff from the external identity provider: upsert by email, no
/// password check on this path.
#[instrument(skip(state, payload))]
pub async fn google(
    State(state): State<AppState>,
    Json(payload): Json<GoogleRequest>,
) -> Result<(SetCookie, Json<PublicUser>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            let username = generate_username(&payload.name);
            // Never surfaced; only its hash is stored so the account still has
            // a credential slot like any other.
            let password: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect();
            let hash = hash_password(&password)?;
            let user = User::create(
                &state.db,
                &username,
                &email,
                &hash,
                payload.photo.as_deref(),
            )
            .await?;
            info!(user_id = %user.id, email = %user.email, "user provisioned from provider");
            user
        }
    };

    let keys = JwtKeys::from_ref(&state);
    signed_in(&keys, user)
}

#[instrument]
pub async fn signout() -> (SetCookie, Json<serde_json::Value>) {
    (
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie())]),
        Json(serde_json::json!({ "success": true, "message": "signed out" })),
    )
}

fn generate_username(name: &str) -> String {
    let base: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("{}{}", base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+tag@sub.domain.io"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn generated_username_is_lowercase_without_spaces() {
        let username = generate_username("Alice Van Houten");
        assert_eq!(username.len(), "alicevanhouten".len() + 4);
        assert!(username.starts_with("alicevanhouten"));
        assert!(!username.contains(' '));
        assert_eq!(username, username.to_lowercase());
    }

    #[test]
    fn generated_usernames_differ() {
        assert_ne!(generate_username("Bob"), generate_username("Bob"));
    }
}
