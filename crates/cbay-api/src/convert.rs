//! Explicit mapping from store rows to API models.
//!
//! Rows that fail to parse are logged and mapped to defaults rather than
//! failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use cbay_db::models::{ChatRow, ImageRow, ListingDetails, UserRow};
use cbay_types::models::{Chat, Image, Listing, User};
use cbay_types::money::from_cents;

pub(crate) fn user(row: UserRow) -> User {
    let classification = row.classification.as_deref().and_then(|c| {
        c.parse()
            .map_err(|e| warn!("Corrupt classification on user '{}': {}", row.id, e))
            .ok()
    });

    User {
        id: uuid(&row.id, "user"),
        created_at: timestamp(&row.created_at, &row.id),
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        university: row.university,
        thumbs_up: counter(row.thumbs_up),
        thumbs_down: counter(row.thumbs_down),
        bio: row.bio,
        classification,
    }
}

pub(crate) fn listing(details: ListingDetails) -> Listing {
    let row = details.listing;
    Listing {
        id: uuid(&row.id, "listing"),
        date_created: timestamp(&row.date_created, &row.id),
        item_name: row.item_name,
        price: from_cents(row.price_cents),
        negotiable: row.negotiable,
        condition: row.condition,
        description: row.description,
        location: row.location,
        sold: row.sold,
        owner: user(row.owner),
        categories: details.categories,
        images: details.images,
    }
}

pub(crate) fn image(row: ImageRow) -> Image {
    Image {
        listing_id: row.listing_id.as_deref().map(|id| uuid(id, "listing")),
        image_url: row.image_url,
    }
}

pub(crate) fn chat(row: ChatRow) -> Chat {
    Chat {
        id: uuid(&row.id, "chat"),
        members: row.members.iter().map(|m| uuid(m, "user")).collect(),
        created_at: timestamp(&row.created_at, &row.id),
    }
}

fn uuid(raw: &str, entity: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", entity, raw, e);
        Uuid::default()
    })
}

fn timestamp(raw: &str, owner_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on '{}': {}", raw, owner_id, e);
        DateTime::default()
    })
}

fn counter(value: i64) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        warn!("Counter out of range: {}", value);
        if value < 0 { 0 } else { u32::MAX }
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_parse_stored_rfc3339() {
        let parsed = timestamp("2021-03-09T15:20:00.000000Z", "x");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2021, 3, 9, 15, 20, 0).unwrap());
        assert_eq!(timestamp("2021-03-09 15:20:00", "x"), DateTime::<Utc>::default());
        assert_eq!(timestamp("garbage", "x"), DateTime::<Utc>::default());
    }

    #[test]
    fn corrupt_ids_fall_back_to_nil() {
        assert_eq!(uuid("not-a-uuid", "user"), Uuid::nil());
    }
}
