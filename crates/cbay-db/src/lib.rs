pub mod chats;
pub mod error;
pub mod filter;
pub mod images;
pub mod listings;
pub mod migrations;
pub mod models;
pub mod ownership;
pub mod users;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use error::{Conflict, NotFound};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Runs `f` inside a transaction, committing only if it succeeds.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.unchecked_transaction()?;
        let out = f(&*tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub fn to_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, ... ?n` starting after `offset` bound parameters.
pub(crate) fn placeholders(offset: usize, n: usize) -> String {
    (offset + 1..=offset + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::str::FromStr;

    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use cbay_types::validation::{NewListing, NewUser, OwnerRef};

    use crate::Database;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, d, 12, 0, 0).unwrap()
    }

    pub fn new_user(email: &str, university: &str) -> NewUser {
        NewUser {
            email: email.into(),
            first_name: "Test".into(),
            last_name: "Case".into(),
            university: university.into(),
            bio: None,
            classification: None,
        }
    }

    pub fn add_user(db: &Database, email: &str, university: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, &new_user(email, university), day(1)).unwrap();
        id
    }

    pub fn new_listing(owner: &str, name: &str, price: &str, categories: &[&str]) -> NewListing {
        NewListing {
            owner: OwnerRef::Id(owner.parse().unwrap()),
            item_name: name.into(),
            price: Decimal::from_str(price).unwrap(),
            negotiable: false,
            condition: "used".into(),
            description: None,
            location: "Campus".into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            images: vec![],
        }
    }

    pub fn add_listing(db: &Database, listing: &NewListing, created: DateTime<Utc>) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_listing(&id, listing, created).unwrap();
        id
    }
}
