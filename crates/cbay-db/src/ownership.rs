//! What happens to a listing's child rows when the listing goes away.
//!
//! Categories belong to their listing and die with it. Images are only
//! weakly referenced: the row survives with its listing reference cleared,
//! so the stored asset can still be found and cleaned up externally.

use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipPolicy {
    /// Children are deleted together with the listing.
    Cascade,
    /// Children survive; their listing reference is set to NULL.
    Detach,
}

#[derive(Debug, Clone, Copy)]
pub struct ChildTable {
    pub table: &'static str,
    pub listing_column: &'static str,
    pub policy: OwnershipPolicy,
}

pub const CATEGORIES: ChildTable = ChildTable {
    table: "categories",
    listing_column: "listing_id",
    policy: OwnershipPolicy::Cascade,
};

pub const IMAGES: ChildTable = ChildTable {
    table: "images",
    listing_column: "listing_id",
    policy: OwnershipPolicy::Detach,
};

pub const LISTING_CHILDREN: [ChildTable; 2] = [CATEGORIES, IMAGES];

impl ChildTable {
    /// Applies this table's policy to every child of `listing_id`.
    /// Returns the number of rows touched.
    pub fn release(&self, conn: &Connection, listing_id: &str) -> Result<usize> {
        let sql = match self.policy {
            OwnershipPolicy::Cascade => {
                format!("DELETE FROM {} WHERE {} = ?1", self.table, self.listing_column)
            }
            OwnershipPolicy::Detach => format!(
                "UPDATE {table} SET {col} = NULL WHERE {col} = ?1",
                table = self.table,
                col = self.listing_column
            ),
        };
        let n = conn.execute(&sql, [listing_id])?;
        debug!("{:?} {} {} rows of listing {}", self.policy, n, self.table, listing_id);
        Ok(n)
    }
}

/// Releases every child per its policy, then deletes the listing row.
/// Returns false if the listing did not exist.
pub(crate) fn delete_listing(conn: &Connection, listing_id: &str) -> Result<bool> {
    for child in LISTING_CHILDREN {
        child.release(conn, listing_id)?;
    }
    Ok(conn.execute("DELETE FROM listings WHERE id = ?1", [listing_id])? > 0)
}
