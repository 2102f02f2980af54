use crate::models::db_operations::{content_db_operations, directory_db_operations, users_db_operations};
use crate::models::{ContentKind, FullContentItem, Mentor};
use crate::DbPool;
use actix_web::web;
use redb::Database;

pub fn verify_member_credentials(
    pool: &web::Data<DbPool>,
    username: &str,
    password: &str,
) -> Option<(String, String)> {
    if let Ok(conn) = pool.get() {
        users_db_operations::verify_credentials(&conn, username, password)
    } else {
        None
    }
}

/// Approved items only — the single read path every public surface goes
/// through, so a pending item cannot leak onto any of them.
pub fn fetch_approved_items(
    db: &web::Data<Database>,
    kind: Option<ContentKind>,
    limit: u32,
    offset: u32,
) -> Result<Vec<FullContentItem>, content_db_operations::DbError> {
    content_db_operations::read_approved_items(db, kind, limit, offset)
}

pub fn fetch_approved_item(db: &web::Data<Database>, id: &str) -> Option<FullContentItem> {
    content_db_operations::read_approved_item(db, id)
}

pub fn fetch_active_mentors(pool: &web::Data<DbPool>) -> Result<Vec<Mentor>, rusqlite::Error> {
    let conn = pool.get().map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?;
    directory_db_operations::read_active_mentors(&conn)
}
