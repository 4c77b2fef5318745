use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use crate::text_format::{ParsedPost, ParsedThread};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER,
    thread_id INTEGER,
    thread_title TEXT,
    poster TEXT,
    tag TEXT,
    raw_timestamp TEXT,
    iso_timestamp TEXT,
    content TEXT,
    UNIQUE(thread_id, post_id)
);

CREATE TABLE IF NOT EXISTS threads (
    thread_id INTEGER PRIMARY KEY,
    thread_title TEXT,
    op_username TEXT,
    first_post_date_raw TEXT,
    first_post_date_iso TEXT,
    last_post_date_raw TEXT,
    last_post_date_iso TEXT,
    post_count INTEGER
);
";

const INSERT_IGNORE_SQL: &str = "
INSERT OR IGNORE INTO posts (
    post_id, thread_id, thread_title, poster, tag, raw_timestamp, iso_timestamp, content
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const INSERT_REPLACE_SQL: &str = "
INSERT OR REPLACE INTO posts (
    post_id, thread_id, thread_title, poster, tag, raw_timestamp, iso_timestamp, content
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// Rebuilt from the posts table so it stays right across partial re-inserts.
const REFRESH_THREAD_SQL: &str = "
INSERT OR REPLACE INTO threads (
    thread_id, thread_title, op_username,
    first_post_date_raw, first_post_date_iso,
    last_post_date_raw, last_post_date_iso,
    post_count
)
SELECT
    ?1, ?2,
    (SELECT poster FROM posts WHERE thread_id = ?1 ORDER BY post_id ASC LIMIT 1),
    (SELECT raw_timestamp FROM posts WHERE thread_id = ?1 ORDER BY post_id ASC LIMIT 1),
    (SELECT iso_timestamp FROM posts WHERE thread_id = ?1 ORDER BY post_id ASC LIMIT 1),
    (SELECT raw_timestamp FROM posts WHERE thread_id = ?1 ORDER BY post_id DESC LIMIT 1),
    (SELECT iso_timestamp FROM posts WHERE thread_id = ?1 ORDER BY post_id DESC LIMIT 1),
    (SELECT COUNT(*) FROM posts WHERE thread_id = ?1)
WHERE EXISTS (SELECT 1 FROM posts WHERE thread_id = ?1)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    /// Already present and left alone
    pub ignored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub thread_id: u32,
    pub title: String,
    pub op_username: String,
    pub first_post_raw: String,
    pub first_post_iso: String,
    pub last_post_raw: String,
    pub last_post_iso: String,
    pub post_count: u32,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("Failed to apply database pragmas")?;

        Store::with_schema(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Store::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create database schema")?;
        Ok(Store { conn })
    }

    /// Insert every post of a thread in one transaction.
    ///
    /// Posts already stored under the same (thread, post number) are ignored,
    /// or replaced when `overwrite` is set.
    pub fn insert_thread(&mut self, thread: &ParsedThread, overwrite: bool) -> Result<InsertReport> {
        let sql = if overwrite {
            INSERT_REPLACE_SQL
        } else {
            INSERT_IGNORE_SQL
        };

        let tx = self.conn.transaction()?;
        let mut report = InsertReport::default();
        {
            let mut stmt = tx.prepare(sql)?;
            for post in &thread.posts {
                let changed = stmt
                    .execute(params![
                        post.post_id,
                        post.thread_id,
                        thread.title,
                        post.poster,
                        post.tag,
                        post.raw_timestamp,
                        post.iso_timestamp,
                        post.content,
                    ])
                    .with_context(|| {
                        format!(
                            "Failed to insert post {} of thread {}",
                            post.post_id, thread.thread_id
                        )
                    })?;
                if changed > 0 {
                    report.inserted += 1;
                } else {
                    report.ignored += 1;
                }
            }
        }

        tx.execute(REFRESH_THREAD_SQL, params![thread.thread_id, thread.title])
            .with_context(|| format!("Failed to refresh summary of thread {}", thread.thread_id))?;
        tx.commit()?;

        info!(
            "Inserted {} posts from thread {} ({} already present)",
            report.inserted, thread.thread_id, report.ignored
        );
        Ok(report)
    }

    /// Highest stored post number per thread.
    pub fn existing_post_counts(&self) -> Result<BTreeMap<u32, u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT thread_id, MAX(post_id) FROM posts GROUP BY thread_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)))?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (thread_id, max_post) = row?;
            counts.insert(thread_id, max_post);
        }
        Ok(counts)
    }

    pub fn thread_summary(&self, thread_id: u32) -> Result<Option<ThreadSummary>> {
        let summary = self
            .conn
            .query_row(
                "SELECT thread_id, thread_title, op_username,
                        first_post_date_raw, first_post_date_iso,
                        last_post_date_raw, last_post_date_iso, post_count
                 FROM threads WHERE thread_id = ?1",
                params![thread_id],
                |row| {
                    Ok(ThreadSummary {
                        thread_id: row.get(0)?,
                        title: row.get(1)?,
                        op_username: row.get(2)?,
                        first_post_raw: row.get(3)?,
                        first_post_iso: row.get(4)?,
                        last_post_raw: row.get(5)?,
                        last_post_iso: row.get(6)?,
                        post_count: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    pub fn posts_for_thread(&self, thread_id: u32) -> Result<Vec<ParsedPost>> {
        let mut stmt = self.conn.prepare(
            "SELECT post_id, thread_id, poster, tag, raw_timestamp, iso_timestamp, content
             FROM posts WHERE thread_id = ?1 ORDER BY post_id",
        )?;
        let rows = stmt.query_map(params![thread_id], |row| {
            Ok(ParsedPost {
                post_id: row.get(0)?,
                thread_id: row.get(1)?,
                poster: row.get(2)?,
                tag: row.get(3)?,
                raw_timestamp: row.get(4)?,
                iso_timestamp: row.get(5)?,
                content: row.get(6)?,
            })
        })?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    pub fn post_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
