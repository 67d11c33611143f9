use anyhow::Result;
use tracing::info;

use crate::Database;
use crate::models::ImageRow;

impl Database {
    /// Images whose listing is gone. Their assets can be removed from
    /// external storage before the rows are purged.
    pub fn orphaned_images(&self) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, image_url, listing_id FROM images WHERE listing_id IS NULL ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ImageRow {
                        id: row.get(0)?,
                        image_url: row.get(1)?,
                        listing_id: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn purge_orphaned_images(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM images WHERE listing_id IS NULL", [])?;
            if n > 0 {
                info!("Purged {} orphaned images", n);
            }
            Ok(n)
        })
    }
}
