use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use cbay_db::NotFound;
use cbay_types::api::{AddMemberRequest, CreateChatRequest};
use cbay_types::validation;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, blocking};

/// Membership only: no messages are stored or delivered here.
pub async fn create_chat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let members: Vec<String> = validation::validate_chat_members(&req.members)?
        .iter()
        .map(Uuid::to_string)
        .collect();
    let id = Uuid::new_v4().to_string();

    let row = blocking(&state, move |db| db.create_chat(&id, &members, chrono::Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(convert::chat(row))))
}

pub async fn get_chat(
    State(state): State<AppState>,
    ApiPath(chat_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = chat_id.to_string();
    let row = blocking(&state, move |db| db.get_chat(&id))
        .await?
        .ok_or_else(|| NotFound::new("chat", chat_id.to_string()))?;
    Ok(Json(convert::chat(row)))
}

pub async fn add_member(
    State(state): State<AppState>,
    ApiPath(chat_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (cid, uid) = (chat_id.to_string(), req.user_id.to_string());
    let row = blocking(&state, move |db| db.add_chat_member(&cid, &uid)).await?;
    Ok(Json(convert::chat(row)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    ApiPath((chat_id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let (cid, uid) = (chat_id.to_string(), user_id.to_string());
    let row = blocking(&state, move |db| db.remove_chat_member(&cid, &uid)).await?;
    Ok(Json(convert::chat(row)))
}
