//! Brand repository for the `brands` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;

/// A raw brand row. Configuration sections are JSON text.
#[derive(Debug, Clone)]
pub struct BrandRow {
    pub id: i64,
    pub name: String,
    pub domain: Option<String>,
    pub voice: String,
    pub seo: String,
    pub image_defaults: String,
    pub linking: String,
    pub voice_samples: String,
    pub sitemap_pages: String,
    pub created_at: String,
}

impl BrandRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            domain: row.get("domain")?,
            voice: row.get("voice")?,
            seo: row.get("seo")?,
            image_defaults: row.get("image_defaults")?,
            linking: row.get("linking")?,
            voice_samples: row.get("voice_samples")?,
            sitemap_pages: row.get("sitemap_pages")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a brand and returns its assigned id. `brand.id` is ignored.
pub fn insert(conn: &Connection, brand: &BrandRow) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO brands (name, domain, voice, seo, image_defaults, linking,
         voice_samples, sitemap_pages, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            brand.name,
            brand.domain,
            brand.voice,
            brand.seo,
            brand.image_defaults,
            brand.linking,
            brand.voice_samples,
            brand.sitemap_pages,
            brand.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<BrandRow>, DatabaseError> {
    let row = conn
        .query_row("SELECT * FROM brands WHERE id = ?1", params![id], BrandRow::from_row)
        .optional()?;
    Ok(row)
}
