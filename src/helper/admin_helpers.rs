use crate::events::{ContentFeed, FeedEvent};
use crate::helper::sanitization_helpers;
use crate::models::db_operations::content_db_operations::{self, ApproveOutcome, DbError};
use crate::models::db_operations::{directory_db_operations, users_db_operations};
use crate::models::{Account, Appointment, ContentKind, ContentSummary, FullContentItem, Mentor, ModerationStatus};
use crate::DbPool;
use actix_web::web;
use redb::Database;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminHelperError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Content database error: {0}")]
    ContentDatabase(#[from] DbError),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Record not found")]
    NotFound,
}

#[derive(Serialize)]
pub struct Settings {
    pub booking_notify_address: String,
    pub max_upload_size_mb: String,
}

fn get_conn(pool: &web::Data<DbPool>) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, AdminHelperError> {
    pool.get().map_err(AdminHelperError::Pool)
}

pub fn get_settings(conn: &Connection) -> Settings {
    Settings {
        booking_notify_address: users_db_operations::read_setting(conn, "booking_notify_address")
            .unwrap_or_default(),
        max_upload_size_mb: users_db_operations::read_setting(conn, "max_upload_size_mb")
            .unwrap_or_else(|| "5".to_string()),
    }
}

pub fn update_setting(pool: &web::Data<DbPool>, key: &str, value: &str) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::update_setting(&conn, key, value)?;
    Ok(())
}

// --- Account management ---

pub fn create_new_account(
    pool: &web::Data<DbPool>,
    username: &str,
    display_name: &str,
    password: &str,
    role: &str,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::create_account(&conn, username, display_name, password, role)?;
    Ok(())
}

pub fn fetch_all_accounts(pool: &web::Data<DbPool>) -> Result<Vec<Account>, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(users_db_operations::read_all_accounts(&conn)?)
}

pub fn update_account(
    pool: &web::Data<DbPool>,
    account_id: i32,
    display_name: &str,
    new_password: Option<&str>,
    is_active: bool,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::update_account(&conn, account_id, display_name, new_password, is_active)?;
    Ok(())
}

pub fn delete_account(pool: &web::Data<DbPool>, account_id: i32) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    let deleted = users_db_operations::delete_account(&conn, account_id)?;
    if deleted == 0 {
        return Err(AdminHelperError::NotFound);
    }
    Ok(())
}

// --- Moderation queue ---

pub fn fetch_pending_queue(
    db: &web::Data<Database>,
    kind: Option<ContentKind>,
    limit: u32,
    offset: u32,
) -> Result<Vec<ContentSummary>, AdminHelperError> {
    Ok(content_db_operations::read_pending_summaries(db, kind, limit, offset)?)
}

pub fn get_pending_details(db: &web::Data<Database>, id: &str) -> Option<FullContentItem> {
    content_db_operations::read_pending_item(db, id)
}

/// Publishes a pending item. Re-approving is a quiet success so a stale
/// queue view cannot error; the item's `approved_at` is left untouched in
/// that case.
pub fn approve_item(
    db: &web::Data<Database>,
    feed: &ContentFeed,
    item_id: &str,
) -> Result<(), AdminHelperError> {
    match content_db_operations::approve_item(db, item_id) {
        Ok(ApproveOutcome::Approved(item)) => {
            feed.publish(FeedEvent::Published { item });
            Ok(())
        }
        Ok(ApproveOutcome::AlreadyApproved) => Ok(()),
        Err(DbError::NotFound(_)) => Err(AdminHelperError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// Rejection is deletion: the item and its ownership row are destroyed,
/// nothing is retained, and the owner is not notified.
pub fn reject_item(
    db: &web::Data<Database>,
    pool: &web::Data<DbPool>,
    feed: &ContentFeed,
    item_id: &str,
) -> Result<(), AdminHelperError> {
    let kind = content_db_operations::read_item_any_status(db, item_id)
        .map(|item| item.metadata.details.kind());

    match content_db_operations::delete_item(db, item_id) {
        Ok(status) => {
            let conn = get_conn(pool)?;
            users_db_operations::delete_content_ownership(&conn, item_id)?;
            if status == ModerationStatus::Approved {
                if let Some(kind) = kind {
                    feed.publish(FeedEvent::Withdrawn { id: item_id.to_string(), kind });
                }
            }
            Ok(())
        }
        Err(DbError::NotFound(_)) => Err(AdminHelperError::NotFound),
        Err(e) => Err(e.into()),
    }
}

// --- Mentor directory management ---

pub fn create_mentor(
    pool: &web::Data<DbPool>,
    name: &str,
    title: &str,
    bio: &str,
    contact_email: &str,
    photo: Option<&str>,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    directory_db_operations::create_mentor(
        &conn,
        &sanitization_helpers::strip_all_html(name),
        &sanitization_helpers::strip_all_html(title),
        &sanitization_helpers::escape_body(bio),
        &sanitization_helpers::strip_all_html(contact_email),
        photo,
    )?;
    Ok(())
}

pub fn fetch_all_mentors(pool: &web::Data<DbPool>) -> Result<Vec<Mentor>, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(directory_db_operations::read_all_mentors(&conn)?)
}

pub fn update_mentor(
    pool: &web::Data<DbPool>,
    mentor_id: i32,
    name: &str,
    title: &str,
    bio: &str,
    contact_email: &str,
    photo: Option<&str>,
    is_active: bool,
) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    if directory_db_operations::read_mentor(&conn, mentor_id).is_none() {
        return Err(AdminHelperError::NotFound);
    }
    directory_db_operations::update_mentor(
        &conn,
        mentor_id,
        &sanitization_helpers::strip_all_html(name),
        &sanitization_helpers::strip_all_html(title),
        &sanitization_helpers::escape_body(bio),
        &sanitization_helpers::strip_all_html(contact_email),
        photo,
        is_active,
    )?;
    Ok(())
}

pub fn delete_mentor(pool: &web::Data<DbPool>, mentor_id: i32) -> Result<(), AdminHelperError> {
    let conn = get_conn(pool)?;
    let deleted = directory_db_operations::delete_mentor(&conn, mentor_id)?;
    if deleted == 0 {
        return Err(AdminHelperError::NotFound);
    }
    Ok(())
}

pub fn fetch_appointments(pool: &web::Data<DbPool>) -> Result<Vec<Appointment>, AdminHelperError> {
    let conn = get_conn(pool)?;
    Ok(directory_db_operations::read_all_appointments(&conn)?)
}
