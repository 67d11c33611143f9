use axum::{Json, extract::State, response::IntoResponse};

use cbay_types::api::{OrphanedImagesResponse, PurgeImagesResponse};

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// GET /images/orphaned — images whose listing was deleted.
pub async fn orphaned_images(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| db.orphaned_images()).await?;
    Ok(Json(OrphanedImagesResponse {
        images: rows.into_iter().map(convert::image).collect(),
    }))
}

/// DELETE /images/orphaned — drop the rows once external storage is cleaned.
pub async fn purge_orphaned_images(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let purged = blocking(&state, |db| db.purge_orphaned_images()).await?;
    Ok(Json(PurgeImagesResponse { purged }))
}
