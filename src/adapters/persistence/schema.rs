//! Store Schema - Explicit Table Description
//!
//! Built once at startup from configuration and handed to the store.
//! All SQL the store runs is rendered here, so the table name is
//! validated in exactly one place before it is spliced into a query.

use anyhow::Result;

/// Columns in the order `map_row` reads them.
const COLUMNS: &str = "id, image, memo, date, created_at, updated_at";

/// Table layout and pre-rendered statements for the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    table: String,
    create_table: String,
    insert: String,
    select_all: String,
    select_one: String,
    update: String,
    delete: String,
}

impl StoreSchema {
    /// Default table name.
    pub const DEFAULT_TABLE: &'static str = "skin_records";

    /// Describe a record table.
    ///
    /// # Errors
    /// Rejects names that are not plain SQL identifiers.
    pub fn new(table: &str) -> Result<Self> {
        anyhow::ensure!(
            is_sql_identifier(table),
            "database table must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*), got {table:?}"
        );

        Ok(Self {
            table: table.to_string(),
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    image       TEXT NULL,
                    memo        TEXT NOT NULL DEFAULT '',
                    date        TEXT NOT NULL UNIQUE,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                );"
            ),
            insert: format!(
                "INSERT INTO {table} (image, memo, date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            select_all: format!("SELECT {COLUMNS} FROM {table} ORDER BY date DESC"),
            select_one: format!("SELECT {COLUMNS} FROM {table} WHERE id = ?1"),
            update: format!(
                "UPDATE {table} SET image = ?1, memo = ?2, date = ?3, updated_at = ?4
                 WHERE id = ?5"
            ),
            delete: format!("DELETE FROM {table} WHERE id = ?1"),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table_sql(&self) -> &str {
        &self.create_table
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    /// Full listing, newest date first. The only supported ordering.
    pub fn select_all_sql(&self) -> &str {
        &self.select_all
    }

    pub fn select_one_sql(&self) -> &str {
        &self.select_one
    }

    pub fn update_sql(&self) -> &str {
        &self.update
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
