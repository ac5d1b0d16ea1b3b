//! SQLite-backed search cache implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tokio::sync::watch;
use tracing::debug;

use super::{
    normalize_term, CacheError, CacheStore, PageWrite, RemoteKey, ResultItem, Search,
    REMOTE_KEY_ID,
};

const RESULT_COLUMNS: &str = "r.id, r.search_id, r.name, r.original_name, r.link, r.image_link, r.price, r.price_trend, r.updated_at";

/// SQLite-backed search cache.
pub struct SqliteCache {
    conn: Mutex<Connection>,
    generation: watch::Sender<u64>,
}

impl SqliteCache {
    /// Open the cache in the database at `path`, creating the tables if needed.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self::with_connection(conn))
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            conn: Mutex::new(conn),
            generation,
        }
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            -- One row per searched term
            CREATE TABLE IF NOT EXISTS searches (
                id TEXT PRIMARY KEY,
                term TEXT NOT NULL COLLATE NOCASE,
                result_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                history INTEGER NOT NULL DEFAULT 1
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_searches_term ON searches(term);

            -- Result rows; rowid keeps insertion order
            CREATE TABLE IF NOT EXISTS results (
                id TEXT PRIMARY KEY,
                search_id TEXT NOT NULL,
                name TEXT NOT NULL,
                original_name TEXT NOT NULL,
                link TEXT NOT NULL,
                image_link TEXT,
                price TEXT NOT NULL,
                price_trend TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_search ON results(search_id);
            CREATE INDEX IF NOT EXISTS idx_results_link ON results(link);

            -- Marketplace pagination cursor
            CREATE TABLE IF NOT EXISTS remote_keys (
                id TEXT PRIMARY KEY,
                next_offset INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Internal("cache connection poisoned".to_string()))
    }

    fn bump_generation(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    /// Read an RFC 3339 timestamp column.
    fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let value: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn search_from_row(row: &Row<'_>) -> rusqlite::Result<Search> {
        Ok(Search {
            id: row.get(0)?,
            term: row.get(1)?,
            result_count: row.get(2)?,
            updated_at: Self::timestamp_at(row, 3)?,
            history: row.get(4)?,
        })
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ResultItem> {
        Ok(ResultItem {
            id: row.get(0)?,
            search_id: row.get(1)?,
            name: row.get(2)?,
            original_name: row.get(3)?,
            link: row.get(4)?,
            image_link: row.get(5)?,
            price: row.get(6)?,
            price_trend: row.get(7)?,
            updated_at: Self::timestamp_at(row, 8)?,
        })
    }

    fn find_search_in(conn: &Connection, term: &str) -> Result<Option<Search>, CacheError> {
        conn.query_row(
            "SELECT id, term, result_count, updated_at, history FROM searches WHERE term = ?",
            params![normalize_term(term)],
            Self::search_from_row,
        )
        .optional()
        .map_err(|e| CacheError::Database(e.to_string()))
    }

    fn query_items(
        conn: &Connection,
        sql: &str,
        key: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ResultItem>, CacheError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![key, limit, offset], Self::item_from_row)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|e| CacheError::Database(e.to_string()))?);
        }
        Ok(items)
    }

    fn upsert_search_in(conn: &Connection, search: &Search) -> Result<(), CacheError> {
        conn.execute(
            "INSERT INTO searches (id, term, result_count, updated_at, history)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                term = excluded.term,
                result_count = excluded.result_count,
                updated_at = excluded.updated_at,
                history = excluded.history",
            params![
                search.id,
                normalize_term(&search.term),
                search.result_count,
                search.updated_at.to_rfc3339(),
                search.history,
            ],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    fn upsert_results_in(conn: &Connection, items: &[ResultItem]) -> Result<(), CacheError> {
        let mut stmt = conn
            .prepare(
                "INSERT INTO results
                    (id, search_id, name, original_name, link, image_link, price, price_trend, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    search_id = excluded.search_id,
                    name = excluded.name,
                    original_name = excluded.original_name,
                    link = excluded.link,
                    image_link = excluded.image_link,
                    price = excluded.price,
                    price_trend = excluded.price_trend,
                    updated_at = excluded.updated_at",
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

        for item in items {
            stmt.execute(params![
                item.id,
                item.search_id,
                item.name,
                item.original_name,
                item.link,
                item.image_link,
                item.price,
                item.price_trend,
                item.updated_at.to_rfc3339(),
            ])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        }
        Ok(())
    }

    fn upsert_remote_key_in(conn: &Connection, key: &RemoteKey) -> Result<(), CacheError> {
        conn.execute(
            "INSERT INTO remote_keys (id, next_offset) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET next_offset = excluded.next_offset",
            params![key.id, key.next_offset],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }
}

impl CacheStore for SqliteCache {
    fn find_search(&self, term: &str) -> Result<Option<Search>, CacheError> {
        let conn = self.conn()?;
        Self::find_search_in(&conn, term)
    }

    fn find_results_by_search_id(
        &self,
        search_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ResultItem>, CacheError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM results r WHERE r.search_id = ? ORDER BY r.rowid LIMIT ? OFFSET ?",
            RESULT_COLUMNS
        );
        Self::query_items(&conn, &sql, search_id, limit, offset)
    }

    fn find_results_by_query(
        &self,
        term: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ResultItem>, CacheError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM results r
             JOIN searches s ON r.search_id = s.id
             WHERE s.term = ?
             ORDER BY r.rowid LIMIT ? OFFSET ?",
            RESULT_COLUMNS
        );
        Self::query_items(&conn, &sql, &normalize_term(term), limit, offset)
    }

    fn count_results_by_query(&self, term: &str) -> Result<u32, CacheError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM results r JOIN searches s ON r.search_id = s.id WHERE s.term = ?",
            params![normalize_term(term)],
            |row| row.get(0),
        )
        .map_err(|e| CacheError::Database(e.to_string()))
    }

    fn upsert_search(&self, search: &Search) -> Result<String, CacheError> {
        {
            let conn = self.conn()?;
            Self::upsert_search_in(&conn, search)?;
        }
        self.bump_generation();
        Ok(search.id.clone())
    }

    fn upsert_results(&self, items: &[ResultItem]) -> Result<Vec<String>, CacheError> {
        {
            let mut conn = self.conn()?;
            let tx = conn
                .transaction()
                .map_err(|e| CacheError::Database(e.to_string()))?;
            Self::upsert_results_in(&tx, items)?;
            tx.commit()
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }
        self.bump_generation();
        Ok(items.iter().map(|item| item.id.clone()).collect())
    }

    fn remove_search(&self, search: &Search) -> Result<(), CacheError> {
        {
            let conn = self.conn()?;
            conn.execute("DELETE FROM searches WHERE id = ?", params![search.id])
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }
        self.bump_generation();
        Ok(())
    }

    fn remove_results(&self, items: &[ResultItem]) -> Result<(), CacheError> {
        {
            let mut conn = self.conn()?;
            let tx = conn
                .transaction()
                .map_err(|e| CacheError::Database(e.to_string()))?;
            for item in items {
                tx.execute("DELETE FROM results WHERE id = ?", params![item.id])
                    .map_err(|e| CacheError::Database(e.to_string()))?;
            }
            tx.commit()
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }
        self.bump_generation();
        Ok(())
    }

    fn remote_key(&self, id: &str) -> Result<Option<RemoteKey>, CacheError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, next_offset FROM remote_keys WHERE id = ?",
            params![id],
            |row| {
                Ok(RemoteKey {
                    id: row.get(0)?,
                    next_offset: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| CacheError::Database(e.to_string()))
    }

    fn upsert_remote_key(&self, key: &RemoteKey) -> Result<(), CacheError> {
        {
            let conn = self.conn()?;
            Self::upsert_remote_key_in(&conn, key)?;
        }
        self.bump_generation();
        Ok(())
    }

    fn delete_remote_key(&self, id: &str) -> Result<(), CacheError> {
        {
            let conn = self.conn()?;
            conn.execute("DELETE FROM remote_keys WHERE id = ?", params![id])
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }
        self.bump_generation();
        Ok(())
    }

    fn write_page(&self, page: &PageWrite) -> Result<(), CacheError> {
        {
            let mut conn = self.conn()?;
            let tx = conn
                .transaction()
                .map_err(|e| CacheError::Database(e.to_string()))?;

            Self::upsert_search_in(&tx, &page.search)?;
            Self::upsert_results_in(&tx, &page.items)?;
            Self::upsert_remote_key_in(&tx, &page.remote_key)?;
            tx.execute(
                "UPDATE searches SET result_count =
                    (SELECT COUNT(*) FROM results WHERE search_id = ?1)
                 WHERE id = ?1",
                params![page.search.id],
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

            tx.commit()
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }

        debug!(
            term = %page.search.term,
            items = page.items.len(),
            next_offset = page.remote_key.next_offset,
            "Wrote page to cache"
        );
        self.bump_generation();
        Ok(())
    }

    fn clear_history(&self, term: &str) -> Result<bool, CacheError> {
        {
            let mut conn = self.conn()?;
            let tx = conn
                .transaction()
                .map_err(|e| CacheError::Database(e.to_string()))?;

            let Some(search) = Self::find_search_in(&tx, term)? else {
                return Ok(false);
            };

            tx.execute(
                "DELETE FROM results WHERE search_id = ?",
                params![search.id],
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;
            tx.execute("DELETE FROM searches WHERE id = ?", params![search.id])
                .map_err(|e| CacheError::Database(e.to_string()))?;
            tx.execute(
                "DELETE FROM remote_keys WHERE id = ?",
                params![REMOTE_KEY_ID],
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

            tx.commit()
                .map_err(|e| CacheError::Database(e.to_string()))?;
        }

        debug!(term = %term, "Cleared search history");
        self.bump_generation();
        Ok(true)
    }

    fn history(&self) -> Result<Vec<Search>, CacheError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, term, result_count, updated_at, history FROM searches
                 WHERE history = 1 ORDER BY updated_at DESC",
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::search_from_row)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let mut searches = Vec::new();
        for row in rows {
            searches.push(row.map_err(|e| CacheError::Database(e.to_string()))?);
        }
        Ok(searches)
    }

    fn update_prices(
        &self,
        link: &str,
        price: &str,
        price_trend: Option<&str>,
    ) -> Result<u32, CacheError> {
        let updated = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE results SET price = ?, price_trend = ?, updated_at = ? WHERE link = ?",
                params![price, price_trend, Utc::now().to_rfc3339(), link],
            )
            .map_err(|e| CacheError::Database(e.to_string()))?
        };

        if updated > 0 {
            self.bump_generation();
        }
        Ok(updated as u32)
    }

    fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}
