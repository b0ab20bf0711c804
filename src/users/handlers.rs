use axum::{
    extract::{Path, State},
    http::header,
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        handlers::is_valid_email,
        password::hash_password,
        session,
    },
    error::ApiError,
    listings::{dto::ListingResponse, repo::Listing},
    state::AppState,
    users::{
        dto::{PublicUser, UpdateUserRequest},
        repo::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/:id", get(get_user).delete(delete_user))
        .route("/user/update/:id", post(update_user))
        .route("/user/listings/:id", get(user_listings))
}

/// Public profile lookup (used by the contact flow); no session required.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if auth_id != id {
        warn!(%auth_id, target = %id, "profile update for another account");
        return Err(ApiError::Forbidden(
            "you can only update your own account".into(),
        ));
    }

    let mut user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    if let Some(username) = payload.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::Validation("username is required".into()));
        }
        if username != user.username
            && User::find_by_username(&state.db, &username).await?.is_some()
        {
            return Err(ApiError::Conflict("username already taken".into()));
        }
        user.username = username;
    }

    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
        if email != user.email && User::find_by_email(&state.db, &email).await?.is_some() {
            return Err(ApiError::Conflict("email already registered".into()));
        }
        user.email = email;
    }

    if let Some(password) = payload.password {
        if password.len() < 8 {
            return Err(ApiError::Validation("password too short".into()));
        }
        user.password_hash = hash_password(&password)?;
    }

    if let Some(avatar) = payload.avatar {
        user.avatar = avatar;
    }

    let user = User::update(&state.db, &user).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<
    (
        AppendHeaders<[(header::HeaderName, String); 1]>,
        Json<serde_json::Value>,
    ),
    ApiError,
> {
    if auth_id != id {
        warn!(%auth_id, target = %id, "account deletion for another account");
        return Err(ApiError::Forbidden(
            "you can only delete your own account".into(),
        ));
    }

    let deleted = User::delete(&state.db, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("user not found".into()));
    }

    info!(user_id = %id, "account deleted");
    Ok((
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie())]),
        Json(serde_json::json!({ "success": true, "message": "account deleted" })),
    ))
}

/// A user's own listings; only the owner may list them here.
#[instrument(skip(state))]
pub async fn user_listings(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    if auth_id != id {
        return Err(ApiError::Forbidden(
            "you can only view your own listings".into(),
        ));
    }

    let listings = Listing::list_by_owner(&state.db, id).await?;
    Ok(Json(listings.into_iter().map(Into::into).collect()))
}
