use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Review, ShowRow};
use crate::observable::{Observable, Receiver};

use super::schema::SCHEMA;

const SHOW_COLUMNS: &str =
    "id_show, title, description, image_url, average_rating, no_of_reviews, cached_at";

const REVIEW_COLUMNS: &str = "r.id_review, r.show_id, r.rating, r.comment, r.user_email";

/// Local cache of shows and reviews.
///
/// Every write republishes the full `shows` table to live subscribers.
pub struct Repository {
    conn: Connection,
    live_shows: Observable<Vec<ShowRow>>,
    // Snapshots are numbered on the connection thread, in commit order
    snapshot_seq: Arc<AtomicU64>,
    published_seq: Mutex<u64>,
}

/// The `shows` table as read right after a write, with its read order.
type Snapshot = (u64, Vec<ShowRow>);

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            live_shows: Observable::new(),
            snapshot_seq: Arc::new(AtomicU64::new(0)),
            published_seq: Mutex::new(0),
        })
    }

    // Show operations

    /// Insert or replace every row in one transaction. Returns the row count.
    pub async fn upsert_shows(&self, rows: Vec<ShowRow>) -> Result<usize> {
        let seq = Arc::clone(&self.snapshot_seq);
        let (count, snapshot) = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT OR REPLACE INTO shows
                               (id_show, title, description, image_url, average_rating, no_of_reviews, cached_at)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))"#,
                    )?;
                    for row in &rows {
                        stmt.execute(params![
                            row.id_show,
                            row.title,
                            row.description,
                            row.image_url,
                            row.average_rating,
                            row.no_of_reviews,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok((rows.len(), read_snapshot(conn, &seq)?))
            })
            .await?;

        self.publish_snapshot(snapshot);
        Ok(count)
    }

    pub async fn get_all_shows(&self) -> Result<Vec<ShowRow>> {
        let shows = self
            .conn
            .call(|conn| Ok(query_all_shows(conn)?))
            .await?;
        Ok(shows)
    }

    pub async fn get_show(&self, id: i64) -> Result<Option<ShowRow>> {
        let show = self
            .conn
            .call(move |conn| {
                let show = conn
                    .query_row(
                        &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id_show = ?1"),
                        params![id],
                        show_from_row,
                    )
                    .optional()?;
                Ok(show)
            })
            .await?;
        Ok(show)
    }

    /// Live view of the `shows` table: the current contents first, then the
    /// full table again after every write.
    pub async fn subscribe_shows(&self) -> Result<Receiver<Vec<ShowRow>>> {
        if self.live_shows.get().is_none() {
            self.republish_shows().await?;
        }
        Ok(self.live_shows.subscribe_channel())
    }

    async fn republish_shows(&self) -> Result<()> {
        let seq = Arc::clone(&self.snapshot_seq);
        let snapshot = self
            .conn
            .call(move |conn| Ok(read_snapshot(conn, &seq)?))
            .await?;
        self.publish_snapshot(snapshot);
        Ok(())
    }

    /// Publish unless a newer snapshot already went out.
    fn publish_snapshot(&self, (seq, shows): Snapshot) {
        let mut published = self
            .published_seq
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if seq > *published {
            *published = seq;
            self.live_shows.publish(shows);
        }
    }

    // Review operations

    pub async fn get_reviews_for_show(&self, show_id: i64) -> Result<Vec<Review>> {
        let reviews = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"SELECT {REVIEW_COLUMNS}
                       FROM reviews r
                       INNER JOIN shows s ON r.show_id = s.id_show
                       WHERE s.id_show = ?1"#
                ))?;
                let reviews = stmt
                    .query_map(params![show_id], review_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(reviews)
            })
            .await?;
        Ok(reviews)
    }

    #[allow(dead_code)]
    pub async fn get_review(&self, id: i64) -> Result<Option<Review>> {
        let review = self
            .conn
            .call(move |conn| {
                let review = conn
                    .query_row(
                        &format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id_review = ?1"),
                        params![id],
                        review_from_row,
                    )
                    .optional()?;
                Ok(review)
            })
            .await?;
        Ok(review)
    }

    pub async fn insert_review(&self, review: Review) -> Result<()> {
        self.insert_reviews(vec![review]).await?;
        Ok(())
    }

    pub async fn insert_reviews(&self, reviews: Vec<Review>) -> Result<usize> {
        let count = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT OR REPLACE INTO reviews (id_review, show_id, rating, comment, user_email)
                           VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    )?;
                    for review in &reviews {
                        stmt.execute(params![
                            review.id,
                            review.show_id,
                            review.rating,
                            review.comment,
                            review.author_email(),
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(reviews.len())
            })
            .await?;
        Ok(count)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn query_all_shows(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<ShowRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {SHOW_COLUMNS} FROM shows ORDER BY id_show"))?;
    let shows = stmt
        .query_map([], show_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(shows)
}

fn read_snapshot(conn: &rusqlite::Connection, seq: &AtomicU64) -> rusqlite::Result<Snapshot> {
    let shows = query_all_shows(conn)?;
    Ok((seq.fetch_add(1, Ordering::SeqCst) + 1, shows))
}

fn show_from_row(row: &Row) -> rusqlite::Result<ShowRow> {
    Ok(ShowRow {
        id_show: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        average_rating: row.get(4)?,
        no_of_reviews: row.get(5)?,
        cached_at: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| parse_datetime(&s)),
    })
}

fn review_from_row(row: &Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        show_id: row.get(1)?,
        rating: row.get(2)?,
        comment: row.get(3)?,
        user: row
            .get::<_, Option<String>>(4)?
            .map(|email| crate::models::ReviewAuthor { email }),
    })
}
