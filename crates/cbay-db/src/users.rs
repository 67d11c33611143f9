use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tracing::info;

use cbay_types::api::Thumbs;
use cbay_types::validation::{NewUser, OwnerRef, UserChanges};

use crate::error::{Conflict, NotFound};
use crate::models::UserRow;
use crate::{Database, OptionalExt, chats, ownership, to_db_timestamp};

pub(crate) const USER_COLUMNS: &str = "u.id, u.email, u.first_name, u.last_name, u.university, \
     u.thumbs_up, u.thumbs_down, u.bio, u.classification, u.created_at";

impl Database {
    pub fn create_user(&self, id: &str, user: &NewUser, created_at: DateTime<Utc>) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let taken: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE lower(email) = lower(?1)",
                    [&user.email],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(Conflict::new("user", &user.email).into());
            }

            conn.execute(
                "INSERT INTO users (id, email, first_name, last_name, university, bio, classification, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.university,
                    user.bio,
                    user.classification.map(|c| c.as_str()),
                    to_db_timestamp(created_at),
                ],
            )?;

            info!("Created user {} ({})", id, user.email);
            require_user(conn, id)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u ORDER BY u.created_at, u.rowid"
            ))?;
            let rows = stmt
                .query_map([], |row| read_user(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_user(&self, id: &str, changes: &UserChanges) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let current = require_user(conn, id)?;

            let classification = match changes.classification {
                Some(c) => c.map(|c| c.as_str().to_string()),
                None => current.classification,
            };

            conn.execute(
                "UPDATE users SET first_name = ?2, last_name = ?3, university = ?4, bio = ?5, classification = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.first_name.as_ref().unwrap_or(&current.first_name),
                    changes.last_name.as_ref().unwrap_or(&current.last_name),
                    changes.university.as_ref().unwrap_or(&current.university),
                    changes.bio.clone().unwrap_or(current.bio),
                    classification,
                ],
            )?;

            require_user(conn, id)
        })
    }

    /// Deletes the user and their listings. Chats left with fewer than two
    /// members are deleted as well.
    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            require_user(conn, id)?;

            let mut stmt = conn.prepare("SELECT id FROM listings WHERE user_id = ?1")?;
            let listing_ids = stmt
                .query_map([id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            for listing_id in &listing_ids {
                ownership::delete_listing(conn, listing_id)?;
            }

            let dissolved = chats::leave_all_chats(conn, id)?;
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;

            info!(
                "Deleted user {} with {} listings ({} chats dissolved)",
                id,
                listing_ids.len(),
                dissolved
            );
            Ok(())
        })
    }

    pub fn rate_user(&self, id: &str, thumbs: Thumbs) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let sql = match thumbs {
                Thumbs::Up => "UPDATE users SET thumbs_up = thumbs_up + 1 WHERE id = ?1",
                Thumbs::Down => "UPDATE users SET thumbs_down = thumbs_down + 1 WHERE id = ?1",
            };
            if conn.execute(sql, [id])? == 0 {
                return Err(NotFound::new("user", id).into());
            }
            require_user(conn, id)
        })
    }
}

pub(crate) fn read_user(row: &Row<'_>, offset: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(offset)?,
        email: row.get(offset + 1)?,
        first_name: row.get(offset + 2)?,
        last_name: row.get(offset + 3)?,
        university: row.get(offset + 4)?,
        thumbs_up: row.get(offset + 5)?,
        thumbs_down: row.get(offset + 6)?,
        bio: row.get(offset + 7)?,
        classification: row.get(offset + 8)?,
        created_at: row.get(offset + 9)?,
    })
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
        [id],
        |row| read_user(row, 0),
    )
    .optional()
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE lower(u.email) = lower(?1)"),
        [email],
        |row| read_user(row, 0),
    )
    .optional()
}

pub(crate) fn require_user(conn: &Connection, id: &str) -> Result<UserRow> {
    query_user_by_id(conn, id)?.ok_or_else(|| NotFound::new("user", id).into())
}

/// Resolves a listing owner reference to a user id.
pub(crate) fn resolve_owner(conn: &Connection, owner: &OwnerRef) -> Result<String> {
    let user = match owner {
        OwnerRef::Id(id) => require_user(conn, &id.to_string())?,
        OwnerRef::Email(email) => {
            query_user_by_email(conn, email)?.ok_or_else(|| NotFound::new("user", email.as_str()))?
        }
    };
    Ok(user.id)
}
