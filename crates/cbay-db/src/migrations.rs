use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Child tables carry plain foreign keys with no `ON DELETE` action; what
/// happens to them when a listing goes away is decided in `ownership`.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                first_name      TEXT NOT NULL,
                last_name       TEXT NOT NULL,
                university      TEXT NOT NULL,
                thumbs_up       INTEGER NOT NULL DEFAULT 0 CHECK (thumbs_up >= 0),
                thumbs_down     INTEGER NOT NULL DEFAULT 0 CHECK (thumbs_down >= 0),
                bio             TEXT,
                classification  TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE listings (
                id              TEXT PRIMARY KEY,
                item_name       TEXT NOT NULL,
                price_cents     INTEGER NOT NULL CHECK (price_cents >= 0),
                negotiable      INTEGER NOT NULL,
                condition       TEXT NOT NULL,
                description     TEXT,
                location        TEXT NOT NULL,
                date_created    TEXT NOT NULL,
                sold            INTEGER NOT NULL DEFAULT 0,
                user_id         TEXT NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_listings_date_created ON listings(date_created);
            CREATE INDEX idx_listings_user ON listings(user_id);

            CREATE TABLE categories (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                category_name   TEXT NOT NULL,
                listing_id      TEXT NOT NULL REFERENCES listings(id),
                UNIQUE(listing_id, category_name)
            );

            CREATE INDEX idx_categories_name ON categories(category_name);

            CREATE TABLE images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                image_url       TEXT NOT NULL UNIQUE,
                listing_id      TEXT REFERENCES listings(id)
            );

            CREATE INDEX idx_images_listing ON images(listing_id);

            CREATE TABLE chats (
                id              TEXT PRIMARY KEY,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE chat_members (
                chat_id         TEXT NOT NULL REFERENCES chats(id),
                user_id         TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (chat_id, user_id)
            );

            CREATE INDEX idx_chat_members_user ON chat_members(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
