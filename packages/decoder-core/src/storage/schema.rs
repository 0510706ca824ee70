//! # Database Schema
//!
//! SQL schema definitions for the local record store.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌──────────────────────────────────────────┐    │
//! │  │ schema_version  │    │                 records                  │    │
//! │  ├─────────────────┤    ├──────────────────────────────────────────┤    │
//! │  │ version         │    │ category   ─┐                            │    │
//! │  └─────────────────┘    │ key        ─┴─ primary key               │    │
//! │                         │ value         canonical JSON document    │    │
//! │                         │ updated_at    unix millis of last write  │    │
//! │                         └──────────────────────────────────────────┘    │
//! │                                                                         │
//! │  Categories: conversations, profiles, settings, behavior_library,      │
//! │              sync_metadata                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Upserts go through `ON CONFLICT ... DO UPDATE`, which keeps the row's
//! `rowid`. Scanning a category by `rowid` therefore yields first-insertion
//! order, which is the tie-breaker for sorted listings.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Key-value records, partitioned by category
CREATE TABLE IF NOT EXISTS records (
    -- Logical box the record belongs to
    category TEXT NOT NULL,
    -- Record id (conversation id, profile id, setting key, ...)
    key TEXT NOT NULL,
    -- Canonical JSON document
    value TEXT NOT NULL,
    -- Unix timestamp (ms) of the last write
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (category, key)
);
"#;
