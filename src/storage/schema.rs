//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite crawl state backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per URL that has been fetched successfully
CREATE TABLE IF NOT EXISTS crawl_state (
    url TEXT PRIMARY KEY,
    last_crawl TEXT,
    content_hash TEXT
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
