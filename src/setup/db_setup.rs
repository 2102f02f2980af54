use redb::{Database, CommitError, StorageError, TableError, TransactionError};
use rusqlite::{Connection, Result as RusqliteResult, Transaction};
use thiserror::Error;

use crate::models::db_operations::content_db_operations;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_accounts_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    tx.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin', 'student', 'alumni', 'professor')),
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_time TEXT
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS content_ownership (
            item_id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES accounts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS media_attachments (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES accounts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS mentors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            bio TEXT NOT NULL,
            contact_email TEXT NOT NULL,
            photo TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mentor_id INTEGER NOT NULL,
            requester_id INTEGER NOT NULL,
            requested_for TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY (mentor_id) REFERENCES mentors(id)
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    seed_initial_settings(&tx)?;

    tx.commit()?;
    Ok(())
}

fn seed_initial_settings(tx: &Transaction) -> RusqliteResult<()> {
    // Empty means "do not notify"; the admin sets the counselling-office
    // address from the dashboard.
    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('booking_notify_address', '')",
        [],
    )?;

    tx.execute(
        "INSERT OR IGNORE INTO settings (key, value) VALUES ('max_upload_size_mb', '5')",
        [],
    )?;

    Ok(())
}

pub fn setup_content_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(content_db_operations::CONTENT)?;
        write_txn.open_table(content_db_operations::METADATA)?;
        write_txn.open_table(content_db_operations::KIND_INDEX)?;
        write_txn.open_table(content_db_operations::CHRONOLOGICAL_INDEX)?;
        write_txn.open_table(content_db_operations::PENDING_CONTENT)?;
        write_txn.open_table(content_db_operations::PENDING_METADATA)?;
    }
    write_txn.commit()?;
    Ok(())
}
