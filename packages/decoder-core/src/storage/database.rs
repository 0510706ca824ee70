//! # Database
//!
//! Generic embedded key-value record store over SQLite.
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │   LocalStore    │  Domain API (conversations, profiles, ...)        │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │  Record API (this file)                           │
//! │  │                 │  - put / get / delete per category                │
//! │  │                 │  - ordered scans                                  │
//! │  │                 │  - transactional batches                          │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    rusqlite     │  One connection behind a mutex: every write is    │
//! │  │                 │  serialized, batches run in one transaction.      │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  - In-memory for tests                            │
//! │  │                 │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use super::schema;
use crate::error::{Error, Result};

/// Logical record partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Conversation documents keyed by conversation id
    Conversations,
    /// Profile documents keyed by profile id
    Profiles,
    /// Setting scalars keyed by setting name
    Settings,
    /// The cached behavior library and its version tag
    BehaviorLibrary,
    /// Sync bookkeeping (last sync time, ...)
    SyncMetadata,
}

impl Category {
    /// Every category, in the order `delete_all_data` clears them
    pub const ALL: [Category; 5] = [
        Category::Conversations,
        Category::Profiles,
        Category::Settings,
        Category::BehaviorLibrary,
        Category::SyncMetadata,
    ];

    /// Name stored in the `category` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Conversations => "conversations",
            Category::Profiles => "profiles",
            Category::Settings => "settings",
            Category::BehaviorLibrary => "behavior_library",
            Category::SyncMetadata => "sync_metadata",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main database handle
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::Database(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Check current schema version
        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| Error::Database(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v > schema::SCHEMA_VERSION => {
                return Err(Error::Database(format!(
                    "Database schema version {} is newer than supported version {}",
                    v,
                    schema::SCHEMA_VERSION
                )));
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    // ========================================================================
    // RECORD OPERATIONS
    // ========================================================================

    /// Insert or replace a record
    pub fn put(&self, category: Category, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        put_record(&conn, category, key, value)
    }

    /// Get a record's raw value
    pub fn get(&self, category: Category, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        get_record(&conn, category, key)
    }

    /// Delete a record. Returns whether it existed.
    pub fn delete(&self, category: Category, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        delete_record(&conn, category, key)
    }

    /// Delete every record in a category. Returns the number removed.
    pub fn clear(&self, category: Category) -> Result<usize> {
        let conn = self.conn.lock();
        clear_category(&conn, category)
    }

    /// All `(key, value)` pairs of a category in first-insertion order
    pub fn entries(&self, category: Category) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock();
        category_entries(&conn, category)
    }

    /// Number of records in a category
    pub fn count(&self, category: Category) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE category = ?",
                params![category.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("Failed to count {}: {}", category, e)))?;
        Ok(count as usize)
    }

    /// Run several record operations in one transaction
    ///
    /// The connection lock is held for the whole closure, so no other write
    /// can interleave. If the closure returns an error the transaction is
    /// rolled back and nothing it wrote is kept.
    pub fn batch<T>(&self, f: impl FnOnce(&Batch<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

        let result = f(&Batch { conn: &tx })?;

        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit transaction: {}", e)))?;
        Ok(result)
    }
}

/// Record operations inside a [`Database::batch`] transaction
pub struct Batch<'a> {
    conn: &'a Connection,
}

impl Batch<'_> {
    /// Insert or replace a record
    pub fn put(&self, category: Category, key: &str, value: &str) -> Result<()> {
        put_record(self.conn, category, key, value)
    }

    /// Get a record's raw value
    pub fn get(&self, category: Category, key: &str) -> Result<Option<String>> {
        get_record(self.conn, category, key)
    }

    /// Delete a record. Returns whether it existed.
    pub fn delete(&self, category: Category, key: &str) -> Result<bool> {
        delete_record(self.conn, category, key)
    }

    /// Delete every record in a category
    pub fn clear(&self, category: Category) -> Result<usize> {
        clear_category(self.conn, category)
    }

    /// All `(key, value)` pairs of a category in first-insertion order
    pub fn entries(&self, category: Category) -> Result<Vec<(String, String)>> {
        category_entries(self.conn, category)
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

fn put_record(conn: &Connection, category: Category, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO records (category, key, value, updated_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(category, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![category.as_str(), key, value, crate::time::now_timestamp_millis()],
    )
    .map_err(|e| Error::Database(format!("Failed to write {} record: {}", category, e)))?;
    Ok(())
}

fn get_record(conn: &Connection, category: Category, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM records WHERE category = ? AND key = ?",
        params![category.as_str(), key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| Error::Database(format!("Failed to read {} record: {}", category, e)))
}

fn delete_record(conn: &Connection, category: Category, key: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM records WHERE category = ? AND key = ?",
            params![category.as_str(), key],
        )
        .map_err(|e| Error::Database(format!("Failed to delete {} record: {}", category, e)))?;
    Ok(rows > 0)
}

fn clear_category(conn: &Connection, category: Category) -> Result<usize> {
    conn.execute(
        "DELETE FROM records WHERE category = ?",
        params![category.as_str()],
    )
    .map_err(|e| Error::Database(format!("Failed to clear {}: {}", category, e)))
}

fn category_entries(conn: &Connection, category: Category) -> Result<Vec<(String, String)>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM records WHERE category = ? ORDER BY rowid")
        .map_err(|e| Error::Database(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map(params![category.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| Error::Database(format!("Failed to query {}: {}", category, e)))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(
            row.map_err(|e| Error::Database(format!("Failed to read {} row: {}", category, e)))?,
        );
    }
    Ok(entries)
}

// ============================================================================
// TESTS
// ============================================================================
