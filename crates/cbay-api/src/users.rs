use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use cbay_db::NotFound;
use cbay_types::api::{CreateUserRequest, RateUserRequest, UpdateUserRequest};
use cbay_types::validation;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, blocking};

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = validation::new_user(&req)?;
    let id = Uuid::new_v4().to_string();

    let row = blocking(&state, move |db| db.create_user(&id, &user, chrono::Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(convert::user(row))))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| db.list_users()).await?;
    Ok(Json(rows.into_iter().map(convert::user).collect::<Vec<_>>()))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user_id.to_string();
    let row = blocking(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| NotFound::new("user", user_id.to_string()))?;
    Ok(Json(convert::user(row)))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    ApiPath(email): ApiPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = email.clone();
    let row = blocking(&state, move |db| db.get_user_by_email(&lookup))
        .await?
        .ok_or_else(|| NotFound::new("user", email))?;
    Ok(Json(convert::user(row)))
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = validation::user_changes(&req)?;
    let id = user_id.to_string();

    let row = blocking(&state, move |db| db.update_user(&id, &changes)).await?;
    Ok(Json(convert::user(row)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user_id.to_string();
    blocking(&state, move |db| db.delete_user(&id)).await?;

    info!("User {} deleted", user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rate_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user_id.to_string();
    let row = blocking(&state, move |db| db.rate_user(&id, req.thumbs)).await?;
    Ok(Json(convert::user(row)))
}

pub async fn user_chats(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user_id.to_string();
    let rows = blocking(&state, move |db| db.chats_for_user(&id)).await?;
    Ok(Json(rows.into_iter().map(convert::chat).collect::<Vec<_>>()))
}
