//! Durable catalog of past and current broadcasts.
//!
//! Plain CRUD over a single SQLite table. Every operation is a single
//! statement, atomic per call; the caller coordinates multi-step state
//! transitions.

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS broadcasts (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    title            TEXT NOT NULL,
    broadcast_date   TEXT NOT NULL,
    start_time       TEXT NOT NULL,
    end_time         TEXT,
    filename         TEXT NOT NULL UNIQUE,
    is_live          INTEGER NOT NULL DEFAULT 0,
    duration_in_seconds INTEGER
);
";

const COLUMNS: &str =
    "id, title, broadcast_date, start_time, end_time, filename, is_live, duration_in_seconds";

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastRecord {
    pub id: i64,
    pub title: String,
    pub broadcast_date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub filename: String,
    pub is_live: bool,
    /// None until computed on a clean stop; stays None when the precise
    /// session timing was lost (pre-emption, force-stop, restart).
    pub duration_in_seconds: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewBroadcast {
    pub title: String,
    pub broadcast_date: String,
    pub start_time: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSort {
    TitleAsc,
    TitleDesc,
    DateAsc,
    #[default]
    DateDesc,
}

impl SearchSort {
    fn order_clause(self) -> &'static str {
        match self {
            SearchSort::TitleAsc => "ORDER BY title ASC",
            SearchSort::TitleDesc => "ORDER BY title DESC",
            SearchSort::DateAsc => "ORDER BY broadcast_date ASC, start_time ASC",
            SearchSort::DateDesc => "ORDER BY broadcast_date DESC, start_time DESC",
        }
    }
}

pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("catalog open: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new broadcast, live from the moment of creation.
    pub fn create(&self, new: &NewBroadcast) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO broadcasts (title, broadcast_date, start_time, filename, is_live)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![new.title, new.broadcast_date, new.start_time, new.filename],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<BroadcastRecord>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM broadcasts WHERE id = ?1"),
                [id],
                record_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Close out a broadcast: clears the live flag, sets the end time and,
    /// when known, the duration. Returns false if the row no longer exists.
    pub fn finalize(&self, id: i64, end_time: &str, duration_in_seconds: Option<i64>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE broadcasts SET is_live = 0, end_time = ?1, duration_in_seconds = ?2 WHERE id = ?3",
            params![end_time, duration_in_seconds, id],
        )?;
        Ok(rows > 0)
    }

    pub fn find_live(&self) -> Result<Option<BroadcastRecord>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM broadcasts WHERE is_live = 1 LIMIT 1"),
                [],
                record_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Completed broadcasts, newest first.
    pub fn list_archived(&self) -> Result<Vec<BroadcastRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM broadcasts WHERE is_live = 0 ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map([], record_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Title/date substring search over the whole catalog.
    pub fn search(&self, query: &str, sort: SearchSort) -> Result<Vec<BroadcastRecord>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM broadcasts
             WHERE title LIKE ?1 OR broadcast_date LIKE ?1 {}",
            sort.order_clause()
        ))?;
        let rows = stmt.query_map([pattern], record_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

fn record_from_row(row: &Row) -> rusqlite::Result<BroadcastRecord> {
    Ok(BroadcastRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        broadcast_date: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        filename: row.get(5)?,
        is_live: row.get::<_, i64>(6)? != 0,
        duration_in_seconds: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_broadcast(title: &str, date: &str, start: &str, filename: &str) -> NewBroadcast {
        NewBroadcast {
            title: title.to_string(),
            broadcast_date: date.to_string(),
            start_time: start.to_string(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn create_and_get_roundtrip() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog
            .create(&new_broadcast(
                "Morning Show",
                "2024-01-01",
                "08:00",
                "siaran_20240101_080000.webm",
            ))
            .unwrap();

        let rec = catalog.get(id).unwrap().unwrap();
        assert_eq!(rec.title, "Morning Show");
        assert_eq!(rec.broadcast_date, "2024-01-01");
        assert_eq!(rec.start_time, "08:00");
        assert!(rec.is_live);
        assert_eq!(rec.end_time, None);
        assert_eq!(rec.duration_in_seconds, None);
    }

    #[test]
    fn get_missing_returns_none() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(catalog.get(42).unwrap().is_none());
    }

    #[test]
    fn finalize_clears_live_and_sets_fields() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog
            .create(&new_broadcast("a", "2024-01-01", "08:00", "a.webm"))
            .unwrap();

        assert!(catalog.finalize(id, "09:00", Some(3600)).unwrap());

        let rec = catalog.get(id).unwrap().unwrap();
        assert!(!rec.is_live);
        assert_eq!(rec.end_time.as_deref(), Some("09:00"));
        assert_eq!(rec.duration_in_seconds, Some(3600));
        assert!(catalog.find_live().unwrap().is_none());
    }

    #[test]
    fn finalize_missing_row_reports_false() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(!catalog.finalize(7, "09:00", None).unwrap());
    }

    #[test]
    fn finalize_keeps_null_duration() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog
            .create(&new_broadcast("a", "2024-01-01", "08:00", "a.webm"))
            .unwrap();
        catalog.finalize(id, "09:00", None).unwrap();
        assert_eq!(catalog.get(id).unwrap().unwrap().duration_in_seconds, None);
    }

    #[test]
    fn find_live_picks_only_live_row() {
        let catalog = Catalog::open_in_memory().unwrap();
        let first = catalog
            .create(&new_broadcast("a", "2024-01-01", "08:00", "a.webm"))
            .unwrap();
        catalog.finalize(first, "09:00", Some(10)).unwrap();
        let second = catalog
            .create(&new_broadcast("b", "2024-01-02", "10:00", "b.webm"))
            .unwrap();

        let live = catalog.find_live().unwrap().unwrap();
        assert_eq!(live.id, second);
    }

    #[test]
    fn list_archived_excludes_live_and_orders_newest_first() {
        let catalog = Catalog::open_in_memory().unwrap();
        let a = catalog
            .create(&new_broadcast("a", "2024-01-01", "08:00", "a.webm"))
            .unwrap();
        catalog.finalize(a, "09:00", Some(10)).unwrap();
        let b = catalog
            .create(&new_broadcast("b", "2024-01-02", "10:00", "b.webm"))
            .unwrap();
        catalog.finalize(b, "11:00", Some(10)).unwrap();
        catalog
            .create(&new_broadcast("c", "2024-01-03", "12:00", "c.webm"))
            .unwrap();

        let archived = catalog.list_archived().unwrap();
        assert_eq!(archived.len(), 2);
        assert_eq!(archived[0].id, b);
        assert_eq!(archived[1].id, a);
    }

    #[test]
    fn search_matches_title_and_date() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .create(&new_broadcast("Morning Show", "2024-01-01", "08:00", "a.webm"))
            .unwrap();
        catalog
            .create(&new_broadcast("Evening News", "2024-02-15", "19:00", "b.webm"))
            .unwrap();

        let by_title = catalog.search("morning", SearchSort::default()).unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Morning Show");

        let by_date = catalog.search("2024-02", SearchSort::default()).unwrap();
        assert_eq!(by_date.len(), 1);
        assert_eq!(by_date[0].title, "Evening News");

        assert_eq!(catalog.search("", SearchSort::default()).unwrap().len(), 2);
    }

    #[test]
    fn search_sort_orders() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .create(&new_broadcast("Beta", "2024-01-02", "08:00", "a.webm"))
            .unwrap();
        catalog
            .create(&new_broadcast("Alpha", "2024-01-01", "08:00", "b.webm"))
            .unwrap();

        let titles: Vec<_> = catalog
            .search("", SearchSort::TitleAsc)
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);

        let dates: Vec<_> = catalog
            .search("", SearchSort::DateDesc)
            .unwrap()
            .into_iter()
            .map(|r| r.broadcast_date)
            .collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-01"]);
    }
}
