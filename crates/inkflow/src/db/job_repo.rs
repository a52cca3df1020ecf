//! Job repository: CRUD operations for the `jobs` table.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::DatabaseError;

/// A raw job row from the database. JSON columns stay as text here.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub brand_id: i64,
    pub topic: String,
    pub keywords: Option<String>,
    pub status: String,
    pub research_brief: Option<String>,
    pub images: Option<String>,
    pub article_content: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub url_slug: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            brand_id: row.get("brand_id")?,
            topic: row.get("topic")?,
            keywords: row.get("keywords")?,
            status: row.get("status")?,
            research_brief: row.get("research_brief")?,
            images: row.get("images")?,
            article_content: row.get("article_content")?,
            meta_title: row.get("meta_title")?,
            meta_description: row.get("meta_description")?,
            url_slug: row.get("url_slug")?,
            thumbnail_url: row.get("thumbnail_url")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Inserts a new job row and returns its assigned id. `job.id` is ignored.
pub fn insert(conn: &Connection, job: &JobRow) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (brand_id, topic, keywords, status, research_brief, images,
         article_content, meta_title, meta_description, url_slug, thumbnail_url,
         error_message, created_at, updated_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            job.brand_id,
            job.topic,
            job.keywords,
            job.status,
            job.research_brief,
            job.images,
            job.article_content,
            job.meta_title,
            job.meta_description,
            job.url_slug,
            job.thumbnail_url,
            job.error_message,
            job.created_at,
            job.updated_at,
            job.completed_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites every mutable column of an existing row. `id`, `brand_id` and
/// `created_at` are left alone. Returns the number of rows touched.
pub fn update(conn: &Connection, job: &JobRow) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET topic=?2, keywords=?3, status=?4, research_brief=?5, images=?6,
         article_content=?7, meta_title=?8, meta_description=?9, url_slug=?10,
         thumbnail_url=?11, error_message=?12, updated_at=?13, completed_at=?14
         WHERE id=?1",
        params![
            job.id,
            job.topic,
            job.keywords,
            job.status,
            job.research_brief,
            job.images,
            job.article_content,
            job.meta_title,
            job.meta_description,
            job.url_slug,
            job.thumbnail_url,
            job.error_message,
            job.updated_at,
            job.completed_at,
        ],
    )?;
    Ok(changed)
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], JobRow::from_row)
        .optional()?;
    Ok(row)
}

/// Lists jobs whose status is any of `statuses`, oldest id first.
pub fn list_by_status(conn: &Connection, statuses: &[&str]) -> Result<Vec<JobRow>, DatabaseError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=statuses.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT * FROM jobs WHERE status IN ({}) ORDER BY id ASC",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(statuses.iter()), JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_by_status(conn: &Connection, status: &str) -> Result<u64, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM jobs WHERE status = ?1",
        params![status],
        |r| r.get(0),
    )?;
    Ok(count.max(0) as u64)
}
