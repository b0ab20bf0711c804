use axum::{
    extract::{Path, Query, State},
    http::HeaderName,
    response::AppendHeaders,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

use super::{
    dto::{CreateListingRequest, ListingResponse, UpdateListingRequest},
    query::{ListingQuery, SearchParams},
    repo::Listing,
};

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listing/create", post(create_listing))
        .route("/listing/update/:id", post(update_listing))
        .route("/listing/delete/:id", delete(delete_listing))
        .route("/listing/get/:id", get(get_listing))
        .route("/listing/get", get(search_listings))
}

#[instrument(skip(state, payload))]
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    payload.validate()?;

    let listing = Listing::insert(&state.db, user_id, &payload).await?;
    info!(listing_id = %listing.id, owner = %user_id, "listing created");
    Ok(Json(listing.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    let mut listing = Listing::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))?;

    if listing.owner_id != user_id {
        warn!(listing_id = %id, owner = %listing.owner_id, caller = %user_id, "update denied");
        return Err(ApiError::Forbidden(
            "you can only update your own listings".into(),
        ));
    }

    payload.apply(&mut listing);
    listing.validate()?;

    let listing = Listing::update(&state.db, &listing).await?;
    info!(listing_id = %listing.id, "listing updated");
    Ok(Json(listing.into()))
}

#[instrument(skip(state))]
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let listing = Listing::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))?;

    if listing.owner_id != user_id {
        warn!(listing_id = %id, owner = %listing.owner_id, caller = %user_id, "delete denied");
        return Err(ApiError::Forbidden(
            "you can only delete your own listings".into(),
        ));
    }

    Listing::delete(&state.db, id).await?;
    info!(listing_id = %id, "listing deleted");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "listing deleted"
    })))
}

/// Public single-listing lookup.
#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingResponse>, ApiError> {
    let listing = Listing::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))?;
    Ok(Json(listing.into()))
}

/// Public catalog search. The body is the ordered page; `x-has-more` carries
/// the load-more hint.
#[instrument(skip(state))]
pub async fn search_listings(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<
    (
        AppendHeaders<[(HeaderName, String); 1]>,
        Json<Vec<ListingResponse>>,
    ),
    ApiError,
> {
    let query = ListingQuery::try_from(params)?;
    let page = Listing::search(&state.db, &query).await?;

    let hint = AppendHeaders([(
        HeaderName::from_static("x-has-more"),
        page.has_more_hint.to_string(),
    )]);
    let items: Vec<ListingResponse> = page.items.into_iter().map(Into::into).collect();
    Ok((hint, Json(items)))
}
