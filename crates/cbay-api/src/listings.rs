use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};
use uuid::Uuid;

use cbay_db::NotFound;
use cbay_types::api::{CreateListingRequest, SetSoldRequest, UpdateListingRequest};
use cbay_types::filter::ListingFilter;
use cbay_types::validation;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, FilterQuery};
use crate::state::{AppState, blocking};

/// GET /listings — every query parameter is an optional, AND-combined filter.
pub async fn filter_listings(
    State(state): State<AppState>,
    FilterQuery(params): FilterQuery,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ListingFilter::try_from(params)?;
    debug!("Listing filter: {:?}", filter);

    let rows = blocking(&state, move |db| db.filter_listings(&filter)).await?;
    Ok(Json(rows.into_iter().map(convert::listing).collect::<Vec<_>>()))
}

pub async fn create_listing(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = validation::new_listing(&req)?;
    let id = Uuid::new_v4().to_string();

    let row = blocking(&state, move |db| db.create_listing(&id, &listing, chrono::Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(convert::listing(row))))
}

pub async fn get_listing(
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = listing_id.to_string();
    let row = blocking(&state, move |db| db.get_listing(&id))
        .await?
        .ok_or_else(|| NotFound::new("listing", listing_id.to_string()))?;
    Ok(Json(convert::listing(row)))
}

pub async fn update_listing(
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = validation::listing_changes(&req)?;
    let id = listing_id.to_string();

    let row = blocking(&state, move |db| db.update_listing(&id, &changes)).await?;
    Ok(Json(convert::listing(row)))
}

pub async fn set_sold(
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SetSoldRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = listing_id.to_string();
    let row = blocking(&state, move |db| db.set_listing_sold(&id, req.sold)).await?;
    Ok(Json(convert::listing(row)))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = listing_id.to_string();
    blocking(&state, move |db| db.delete_listing(&id)).await?;

    info!("Listing {} deleted", listing_id);
    Ok(StatusCode::NO_CONTENT)
}
