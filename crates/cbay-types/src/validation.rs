//! Explicit validation, run before anything is persisted.
//!
//! Each request type is turned into a validated input (`NewUser`,
//! `ListingChanges`, ...) that the store accepts. Failures come back as a
//! typed [`ValidationError`] naming the offending field.

use std::collections::HashSet;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::api::{CreateListingRequest, CreateUserRequest, UpdateListingRequest, UpdateUserRequest};
use crate::models::Classification;

pub const NAME_MAX_LEN: usize = 50;
pub const TEXT_MAX_LEN: usize = 5000;
pub const EMAIL_MAX_LEN: usize = 254;
pub const INSTITUTIONAL_SUFFIX: &str = ".edu";
/// Six digits total, two after the point.
pub const PRICE_MAX: Decimal = Decimal::from_parts(999_999, 0, 0, false, 2);
pub const MIN_CHAT_MEMBERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    #[error("{0} is not a .edu email")]
    NonInstitutionalEmail(String),

    #[error(
        "{0} has to be one of (Freshman, Sophomore, Junior, Senior, Graduate, PhD). Check spelling and capitalization."
    )]
    InvalidClassification(String),

    #[error("price {0} must be between 0 and 9999.99 with at most two decimal places")]
    InvalidPrice(Decimal),

    #[error("{0} is not a valid http(s) image URL")]
    InvalidImageUrl(String),

    #[error("a listing owner must be given by exactly one of user_id or user_email")]
    AmbiguousOwner,

    #[error("a chat needs at least two distinct members")]
    TooFewMembers,
}

// -- Validated inputs --

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub university: String,
    pub bio: Option<String>,
    pub classification: Option<Classification>,
}

/// `Some(None)` on an optional field means "clear it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub university: Option<String>,
    pub bio: Option<Option<String>>,
    pub classification: Option<Option<Classification>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerRef {
    Id(Uuid),
    Email(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub owner: OwnerRef,
    pub item_name: String,
    pub price: Decimal,
    pub negotiable: bool,
    pub condition: String,
    pub description: Option<String>,
    pub location: String,
    pub categories: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingChanges {
    pub item_name: Option<String>,
    pub price: Option<Decimal>,
    pub negotiable: Option<bool>,
    pub condition: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<String>,
    pub sold: Option<bool>,
    pub categories: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

// -- Field validators --

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEmail(email.to_string());

    if email.len() > EMAIL_MAX_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(invalid());
    }

    if !domain.to_ascii_lowercase().ends_with(INSTITUTIONAL_SUFFIX) {
        return Err(ValidationError::NonInstitutionalEmail(email.to_string()));
    }
    Ok(())
}

/// Required short text: trimmed, non-empty, bounded.
pub fn validate_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    check_len(field, value, max)?;
    Ok(value.to_string())
}

/// Optional text: blank collapses to `None`.
pub fn validate_optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            check_len(field, v, max)?;
            Ok(Some(v.to_string()))
        }
    }
}

pub fn validate_price(price: Decimal) -> Result<Decimal, ValidationError> {
    let normalized = price.normalize();
    if (normalized.is_sign_negative() && !normalized.is_zero())
        || normalized.scale() > 2
        || normalized > PRICE_MAX
    {
        return Err(ValidationError::InvalidPrice(price));
    }
    let mut price = normalized;
    price.rescale(2);
    Ok(price)
}

pub fn validate_classification(value: Option<&str>) -> Result<Option<Classification>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}

pub fn validate_image_url(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    let invalid = || ValidationError::InvalidImageUrl(value.to_string());
    let url = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(value.to_string())
}

/// Trims labels and drops repeats so a listing never carries a label twice.
pub fn normalize_categories(labels: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(labels.len());
    for label in labels {
        let label = validate_text("category", label, NAME_MAX_LEN)?;
        if seen.insert(label.clone()) {
            out.push(label);
        }
    }
    Ok(out)
}

pub fn normalize_images(urls: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(urls.len());
    for url in urls {
        let url = validate_image_url(url)?;
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
    Ok(out)
}

/// Deduplicates members, keeping first-seen order.
pub fn validate_chat_members(members: &[Uuid]) -> Result<Vec<Uuid>, ValidationError> {
    let mut seen = HashSet::new();
    let members: Vec<Uuid> = members.iter().copied().filter(|m| seen.insert(*m)).collect();
    if members.len() < MIN_CHAT_MEMBERS {
        return Err(ValidationError::TooFewMembers);
    }
    Ok(members)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

// -- Request validators --

pub fn new_user(req: &CreateUserRequest) -> Result<NewUser, ValidationError> {
    let email = req.email.trim();
    validate_email(email)?;

    Ok(NewUser {
        email: email.to_string(),
        first_name: validate_text("first_name", &req.first_name, NAME_MAX_LEN)?,
        last_name: validate_text("last_name", &req.last_name, NAME_MAX_LEN)?,
        university: validate_text("university", &req.university, NAME_MAX_LEN)?,
        bio: validate_optional_text("bio", req.bio.as_deref(), TEXT_MAX_LEN)?,
        classification: validate_classification(req.classification.as_deref())?,
    })
}

pub fn user_changes(req: &UpdateUserRequest) -> Result<UserChanges, ValidationError> {
    Ok(UserChanges {
        first_name: req
            .first_name
            .as_deref()
            .map(|v| validate_text("first_name", v, NAME_MAX_LEN))
            .transpose()?,
        last_name: req
            .last_name
            .as_deref()
            .map(|v| validate_text("last_name", v, NAME_MAX_LEN))
            .transpose()?,
        university: req
            .university
            .as_deref()
            .map(|v| validate_text("university", v, NAME_MAX_LEN))
            .transpose()?,
        bio: req
            .bio
            .as_deref()
            .map(|v| validate_optional_text("bio", Some(v), TEXT_MAX_LEN))
            .transpose()?,
        classification: req
            .classification
            .as_deref()
            .map(|v| validate_classification(Some(v)))
            .transpose()?,
    })
}

pub fn new_listing(req: &CreateListingRequest) -> Result<NewListing, ValidationError> {
    let owner = match (req.user_id, req.user_email.as_deref().map(str::trim)) {
        (Some(id), None) => OwnerRef::Id(id),
        (None, Some(email)) if !email.is_empty() => OwnerRef::Email(email.to_string()),
        _ => return Err(ValidationError::AmbiguousOwner),
    };

    Ok(NewListing {
        owner,
        item_name: validate_text("item_name", &req.item_name, NAME_MAX_LEN)?,
        price: validate_price(req.price)?,
        negotiable: req.negotiable,
        condition: validate_text("condition", &req.condition, NAME_MAX_LEN)?,
        description: validate_optional_text("description", req.description.as_deref(), TEXT_MAX_LEN)?,
        location: validate_text("location", &req.location, NAME_MAX_LEN)?,
        categories: normalize_categories(&req.categories)?,
        images: normalize_images(&req.images)?,
    })
}

pub fn listing_changes(req: &UpdateListingRequest) -> Result<ListingChanges, ValidationError> {
    Ok(ListingChanges {
        item_name: req
            .item_name
            .as_deref()
            .map(|v| validate_text("item_name", v, NAME_MAX_LEN))
            .transpose()?,
        price: req.price.map(validate_price).transpose()?,
        negotiable: req.negotiable,
        condition: req
            .condition
            .as_deref()
            .map(|v| validate_text("condition", v, NAME_MAX_LEN))
            .transpose()?,
        description: req
            .description
            .as_deref()
            .map(|v| validate_optional_text("description", Some(v), TEXT_MAX_LEN))
            .transpose()?,
        location: req
            .location
            .as_deref()
            .map(|v| validate_text("location", v, NAME_MAX_LEN))
            .transpose()?,
        sold: req.sold,
        categories: req.categories.as_deref().map(normalize_categories).transpose()?,
        images: req.images.as_deref().map(normalize_images).transpose()?,
    })
}
