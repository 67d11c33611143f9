use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationError;

/// Academic standing of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    Graduate,
    PhD,
}

impl Classification {
    pub const ALL: [Classification; 6] = [
        Self::Freshman,
        Self::Sophomore,
        Self::Junior,
        Self::Senior,
        Self::Graduate,
        Self::PhD,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Freshman => "Freshman",
            Self::Sophomore => "Sophomore",
            Self::Junior => "Junior",
            Self::Senior => "Senior",
            Self::Graduate => "Graduate",
            Self::PhD => "PhD",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matching is exact: spelling and capitalization must agree.
impl FromStr for Classification {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidClassification(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub university: String,
    pub thumbs_up: u32,
    pub thumbs_down: u32,
    pub bio: Option<String>,
    pub classification: Option<Classification>,
    pub created_at: DateTime<Utc>,
}

/// A for-sale item, returned with its owner and child collections resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub item_name: String,
    pub price: Decimal,
    pub negotiable: bool,
    pub condition: String,
    pub description: Option<String>,
    pub location: String,
    pub date_created: DateTime<Utc>,
    pub sold: bool,
    pub owner: User,
    pub categories: Vec<String>,
    pub images: Vec<String>,
}

/// An image reference. `listing_id` is `None` once its listing is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image_url: String,
    pub listing_id: Option<Uuid>,
}

/// Chat membership only; message transport lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}
