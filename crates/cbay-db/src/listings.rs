use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tracing::info;

use cbay_types::money::to_cents;
use cbay_types::validation::{ListingChanges, NewListing};

use crate::error::NotFound;
use crate::models::{ListingDetails, ListingRow};
use crate::ownership::{self, CATEGORIES, IMAGES};
use crate::users::{USER_COLUMNS, read_user, resolve_owner};
use crate::{Database, OptionalExt, placeholders, to_db_timestamp};

pub(crate) const LISTING_COLUMNS: &str = "l.id, l.item_name, l.price_cents, l.negotiable, l.condition, \
     l.description, l.location, l.date_created, l.sold";

const LISTING_COLUMN_COUNT: usize = 9;

/// Newest first; ties keep insertion order.
pub(crate) const LISTING_ORDER: &str = "ORDER BY l.date_created DESC, l.rowid ASC";

pub(crate) fn listing_select() -> String {
    format!("SELECT {LISTING_COLUMNS}, {USER_COLUMNS} FROM listings l JOIN users u ON u.id = l.user_id")
}

impl Database {
    pub fn create_listing(
        &self,
        id: &str,
        listing: &NewListing,
        date_created: DateTime<Utc>,
    ) -> Result<ListingDetails> {
        self.with_conn_mut(|conn| {
            let owner_id = resolve_owner(conn, &listing.owner)?;

            conn.execute(
                "INSERT INTO listings (id, item_name, price_cents, negotiable, condition, description, location, date_created, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    id,
                    listing.item_name,
                    to_cents(listing.price),
                    listing.negotiable,
                    listing.condition,
                    listing.description,
                    listing.location,
                    to_db_timestamp(date_created),
                    owner_id,
                ],
            )?;
            insert_categories(conn, id, &listing.categories)?;
            attach_images(conn, id, &listing.images)?;

            info!("Created listing {} for user {}", id, owner_id);
            require_listing(conn, id)
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingDetails>> {
        self.with_conn(|conn| query_listing(conn, id))
    }

    /// Every listing, newest first.
    pub fn list_listings(&self) -> Result<Vec<ListingDetails>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} {LISTING_ORDER}", listing_select()))?;
            let rows = stmt
                .query_map([], read_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            with_children(conn, rows)
        })
    }

    pub fn update_listing(&self, id: &str, changes: &ListingChanges) -> Result<ListingDetails> {
        self.with_conn_mut(|conn| {
            let current = require_listing(conn, id)?.listing;

            conn.execute(
                "UPDATE listings SET item_name = ?2, price_cents = ?3, negotiable = ?4, condition = ?5,
                     description = ?6, location = ?7, sold = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.item_name.as_ref().unwrap_or(&current.item_name),
                    changes.price.map(to_cents).unwrap_or(current.price_cents),
                    changes.negotiable.unwrap_or(current.negotiable),
                    changes.condition.as_ref().unwrap_or(&current.condition),
                    changes.description.clone().unwrap_or(current.description),
                    changes.location.as_ref().unwrap_or(&current.location),
                    changes.sold.unwrap_or(current.sold),
                ],
            )?;

            if let Some(categories) = &changes.categories {
                CATEGORIES.release(conn, id)?;
                insert_categories(conn, id, categories)?;
            }
            if let Some(images) = &changes.images {
                IMAGES.release(conn, id)?;
                attach_images(conn, id, images)?;
            }

            require_listing(conn, id)
        })
    }

    pub fn set_listing_sold(&self, id: &str, sold: bool) -> Result<ListingDetails> {
        self.with_conn_mut(|conn| {
            if conn.execute("UPDATE listings SET sold = ?2 WHERE id = ?1", rusqlite::params![id, sold])? == 0 {
                return Err(NotFound::new("listing", id).into());
            }
            require_listing(conn, id)
        })
    }

    /// Categories are deleted with the listing; images are detached.
    pub fn delete_listing(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            if !ownership::delete_listing(conn, id)? {
                return Err(NotFound::new("listing", id).into());
            }
            info!("Deleted listing {}", id);
            Ok(())
        })
    }
}

pub(crate) fn read_listing(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        item_name: row.get(1)?,
        price_cents: row.get(2)?,
        negotiable: row.get(3)?,
        condition: row.get(4)?,
        description: row.get(5)?,
        location: row.get(6)?,
        date_created: row.get(7)?,
        sold: row.get(8)?,
        owner: read_user(row, LISTING_COLUMN_COUNT)?,
    })
}

fn query_listing(conn: &Connection, id: &str) -> Result<Option<ListingDetails>> {
    let row = conn
        .query_row(&format!("{} WHERE l.id = ?1", listing_select()), [id], read_listing)
        .optional()?;

    match row {
        Some(row) => Ok(with_children(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

fn require_listing(conn: &Connection, id: &str) -> Result<ListingDetails> {
    query_listing(conn, id)?.ok_or_else(|| NotFound::new("listing", id).into())
}

fn insert_categories(conn: &Connection, listing_id: &str, labels: &[String]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO categories (category_name, listing_id) VALUES (?1, ?2)",
    )?;
    for label in labels {
        stmt.execute([label.as_str(), listing_id])?;
    }
    Ok(())
}

/// Image URLs are globally unique: attaching a known URL moves it here.
fn attach_images(conn: &Connection, listing_id: &str, urls: &[String]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO images (image_url, listing_id) VALUES (?1, ?2)
         ON CONFLICT(image_url) DO UPDATE SET listing_id = excluded.listing_id",
    )?;
    for url in urls {
        stmt.execute([url.as_str(), listing_id])?;
    }
    Ok(())
}

/// Batch-fetches categories and images for `rows`, keeping row order.
pub(crate) fn with_children(conn: &Connection, rows: Vec<ListingRow>) -> Result<Vec<ListingDetails>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let mut categories = children_by_listing(conn, "category_name", "categories", &ids)?;
    let mut images = children_by_listing(conn, "image_url", "images", &ids)?;

    Ok(rows
        .into_iter()
        .map(|listing| ListingDetails {
            categories: categories.remove(&listing.id).unwrap_or_default(),
            images: images.remove(&listing.id).unwrap_or_default(),
            listing,
        })
        .collect())
}

fn children_by_listing(
    conn: &Connection,
    column: &str,
    table: &str,
    listing_ids: &[&str],
) -> Result<HashMap<String, Vec<String>>> {
    let sql = format!(
        "SELECT listing_id, {column} FROM {table} WHERE listing_id IN ({}) ORDER BY id",
        placeholders(0, listing_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let pairs = stmt
        .query_map(rusqlite::params_from_iter(listing_ids), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (listing_id, value) in pairs {
        map.entry(listing_id).or_default().push(value);
    }
    Ok(map)
}
