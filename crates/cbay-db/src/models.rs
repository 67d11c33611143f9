//! Row types as read from SQLite. Ids and timestamps stay as stored text;
//! the API layer maps them onto `cbay_types::models`.

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub university: String,
    pub thumbs_up: i64,
    pub thumbs_down: i64,
    pub bio: Option<String>,
    pub classification: Option<String>,
    pub created_at: String,
}

/// A listing joined with its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: String,
    pub item_name: String,
    pub price_cents: i64,
    pub negotiable: bool,
    pub condition: String,
    pub description: Option<String>,
    pub location: String,
    pub date_created: String,
    pub sold: bool,
    pub owner: UserRow,
}

/// A listing with its child collections resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetails {
    pub listing: ListingRow,
    pub categories: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub id: i64,
    pub image_url: String,
    pub listing_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRow {
    pub id: String,
    pub created_at: String,
    pub members: Vec<String>,
}
