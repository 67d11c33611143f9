use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use cbay_types::validation::{MIN_CHAT_MEMBERS, ValidationError};

use crate::error::NotFound;
use crate::models::ChatRow;
use crate::users::require_user;
use crate::{Database, OptionalExt, to_db_timestamp};

impl Database {
    /// Members must be distinct existing users; at least two of them.
    pub fn create_chat(&self, id: &str, members: &[String], created_at: DateTime<Utc>) -> Result<ChatRow> {
        self.with_conn_mut(|conn| {
            for member in members {
                require_user(conn, member)?;
            }

            conn.execute(
                "INSERT INTO chats (id, created_at) VALUES (?1, ?2)",
                (id, to_db_timestamp(created_at)),
            )?;
            let mut stmt = conn.prepare("INSERT OR IGNORE INTO chat_members (chat_id, user_id) VALUES (?1, ?2)")?;
            for member in members {
                stmt.execute((id, member))?;
            }

            let chat = require_chat(conn, id)?;
            if chat.members.len() < MIN_CHAT_MEMBERS {
                return Err(ValidationError::TooFewMembers.into());
            }
            info!("Created chat {} with {} members", id, chat.members.len());
            Ok(chat)
        })
    }

    pub fn get_chat(&self, id: &str) -> Result<Option<ChatRow>> {
        self.with_conn(|conn| query_chat(conn, id))
    }

    pub fn chats_for_user(&self, user_id: &str) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            require_user(conn, user_id)?;

            let mut stmt = conn.prepare(
                "SELECT c.id FROM chats c
                 JOIN chat_members m ON m.chat_id = c.id
                 WHERE m.user_id = ?1
                 ORDER BY c.created_at, c.rowid",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            ids.iter().map(|id| require_chat(conn, id)).collect()
        })
    }

    /// Adding an existing member is a no-op.
    pub fn add_chat_member(&self, chat_id: &str, user_id: &str) -> Result<ChatRow> {
        self.with_conn_mut(|conn| {
            require_chat(conn, chat_id)?;
            require_user(conn, user_id)?;
            conn.execute(
                "INSERT OR IGNORE INTO chat_members (chat_id, user_id) VALUES (?1, ?2)",
                (chat_id, user_id),
            )?;
            require_chat(conn, chat_id)
        })
    }

    /// Refuses to leave a chat with fewer than two members.
    pub fn remove_chat_member(&self, chat_id: &str, user_id: &str) -> Result<ChatRow> {
        self.with_conn_mut(|conn| {
            let chat = require_chat(conn, chat_id)?;
            if !chat.members.iter().any(|m| m == user_id) {
                return Err(NotFound::new("chat member", user_id).into());
            }
            if chat.members.len() <= MIN_CHAT_MEMBERS {
                return Err(ValidationError::TooFewMembers.into());
            }
            conn.execute(
                "DELETE FROM chat_members WHERE chat_id = ?1 AND user_id = ?2",
                (chat_id, user_id),
            )?;
            require_chat(conn, chat_id)
        })
    }
}

/// Removes `user_id` from every chat, deleting chats that would drop below
/// the minimum membership. Returns the number of chats deleted.
pub(crate) fn leave_all_chats(conn: &Connection, user_id: &str) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT chat_id FROM chat_members
         WHERE chat_id IN (SELECT chat_id FROM chat_members WHERE user_id = ?1)
         GROUP BY chat_id
         HAVING COUNT(*) <= ?2",
    )?;
    let undersized = stmt
        .query_map((user_id, MIN_CHAT_MEMBERS as i64), |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    drop(stmt);

    conn.execute("DELETE FROM chat_members WHERE user_id = ?1", [user_id])?;
    for chat_id in &undersized {
        conn.execute("DELETE FROM chat_members WHERE chat_id = ?1", [chat_id])?;
        conn.execute("DELETE FROM chats WHERE id = ?1", [chat_id])?;
    }

    Ok(undersized.len())
}

fn query_chat(conn: &Connection, id: &str) -> Result<Option<ChatRow>> {
    let created_at: Option<String> = conn
        .query_row("SELECT created_at FROM chats WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    let Some(created_at) = created_at else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT user_id FROM chat_members WHERE chat_id = ?1 ORDER BY rowid")?;
    let members = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(Some(ChatRow {
        id: id.to_string(),
        created_at,
        members,
    }))
}

fn require_chat(conn: &Connection, id: &str) -> Result<ChatRow> {
    query_chat(conn, id)?.ok_or_else(|| NotFound::new("chat", id).into())
}
