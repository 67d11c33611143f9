use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Image;

// -- Users --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub university: String,
    pub bio: Option<String>,
    pub classification: Option<String>,
}

/// Email is immutable and not accepted here. An empty `bio` or
/// `classification` clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub university: Option<String>,
    pub bio: Option<String>,
    pub classification: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Thumbs {
    Up,
    Down,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateUserRequest {
    pub thumbs: Thumbs,
}

// -- Listings --

/// The owner is referenced by exactly one of `user_id` or `user_email`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub item_name: String,
    pub price: Decimal,
    pub negotiable: bool,
    pub condition: String,
    pub description: Option<String>,
    pub location: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Supplied fields overwrite; supplied `categories`/`images` replace the
/// whole set. An empty `description` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    pub item_name: Option<String>,
    pub price: Option<Decimal>,
    pub negotiable: Option<bool>,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub sold: Option<bool>,
    pub categories: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetSoldRequest {
    pub sold: bool,
}

// -- Images --

#[derive(Debug, Serialize, Deserialize)]
pub struct OrphanedImagesResponse {
    pub images: Vec<Image>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeImagesResponse {
    pub purged: usize,
}

// -- Chats --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChatRequest {
    pub members: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
