//! SQLite-backed settings store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{Settings, SettingsError, SettingsStore};

const SETTINGS_ID: i64 = 1;

/// SQLite-backed settings store holding a single row.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    /// Open the settings table in the database at `path`, creating it if needed.
    pub fn new(path: &Path) -> Result<Self, SettingsError> {
        let conn = Connection::open(path).map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory settings store (useful for testing).
    pub fn in_memory() -> Result<Self, SettingsError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SettingsError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                language TEXT NOT NULL,
                engine TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SettingsError> {
        self.conn
            .lock()
            .map_err(|_| SettingsError::Internal("settings connection poisoned".to_string()))
    }

    /// Read the row, inserting defaults first when it does not exist yet.
    fn load_or_init(conn: &Connection) -> Result<Settings, SettingsError> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT language, engine FROM settings WHERE id = ?",
                params![SETTINGS_ID],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        match row {
            Some((language, engine)) => Ok(Settings {
                language: language.parse()?,
                engine: engine.parse()?,
            }),
            None => {
                let settings = Settings::default();
                Self::write(conn, &settings)?;
                tracing::debug!("Initialized settings row with defaults");
                Ok(settings)
            }
        }
    }

    fn write(conn: &Connection, settings: &Settings) -> Result<(), SettingsError> {
        conn.execute(
            "INSERT INTO settings (id, language, engine) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET language = excluded.language, engine = excluded.engine",
            params![
                SETTINGS_ID,
                settings.language.code(),
                settings.engine.as_str()
            ],
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let conn = self.conn()?;
        Self::load_or_init(&conn)
    }

    fn update(&self, apply: &mut dyn FnMut(&mut Settings)) -> Result<Settings, SettingsError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        let mut settings = Self::load_or_init(&tx)?;
        apply(&mut settings);
        Self::write(&tx, &settings)?;

        tx.commit()
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(settings)
    }
}
