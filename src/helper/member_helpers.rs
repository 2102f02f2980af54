use crate::events::{ContentFeed, FeedEvent};
use crate::helper::sanitization_helpers;
use crate::models::db_operations::content_db_operations::{self, DbError};
use crate::models::db_operations::{directory_db_operations, users_db_operations};
use crate::models::{
    Account, ContentAction, ContentDetails, EventDetails, FullContentItem, MediaAttachment,
    ModerationStatus,
};
use crate::config::Config;
use crate::DbPool;
use actix_multipart::Multipart;
use actix_web::web;
use chrono::Utc;
use futures_util::StreamExt;
use redb::Database;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MemberActionError {
    #[error("Content database error: {0}")]
    Content(#[from] DbError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Item not found")]
    NotFound,
    #[error("Not permitted")]
    Forbidden,
    #[error("{0}")]
    Invalid(String),
}

pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

pub fn get_account_details(pool: &web::Data<DbPool>, username: &str) -> Option<Account> {
    let conn = pool.get().ok()?;
    users_db_operations::read_account_by_username(&conn, username)
}

pub fn can_member_modify(
    pool: &web::Data<DbPool>,
    account: &Account,
    item_id: &str,
    action: ContentAction,
) -> bool {
    if let Ok(conn) = pool.get() {
        users_db_operations::check_permission(&conn, account, item_id, action)
    } else {
        false
    }
}

fn sanitize_details(details: ContentDetails) -> ContentDetails {
    match details {
        ContentDetails::Story => ContentDetails::Story,
        ContentDetails::Feedback => ContentDetails::Feedback,
        ContentDetails::Event(event) => {
            let clean = |field: Option<String>| {
                field
                    .map(|value| sanitization_helpers::strip_all_html(value.trim()))
                    .filter(|value| !value.is_empty())
            };
            ContentDetails::Event(EventDetails {
                title: clean(event.title),
                starts_on: clean(event.starts_on),
                ends_on: clean(event.ends_on),
                meeting_link: clean(event.meeting_link),
                payment_link: clean(event.payment_link),
                contact_number: clean(event.contact_number),
                image: clean(event.image),
            })
        }
    }
}

/// A new submission always enters the queue as pending; the author's
/// display name is frozen into the metadata here.
pub fn submit_content(
    db: &web::Data<Database>,
    pool: &web::Data<DbPool>,
    account: &Account,
    body: &str,
    details: ContentDetails,
) -> Result<String, MemberActionError> {
    let clean_body = sanitization_helpers::escape_body(body.trim());
    if clean_body.is_empty() {
        return Err(MemberActionError::Invalid("Content body is required.".to_string()));
    }

    let conn = pool.get()?;
    let item_id = content_db_operations::create_pending_item(
        db,
        &account.display_name,
        &clean_body,
        sanitize_details(details),
    )?;
    users_db_operations::add_content_ownership(&conn, &item_id, account.id)?;
    Ok(item_id)
}

/// Any edit forces re-review: a pending item is rewritten in place, an
/// approved item is first pulled off the public surfaces (with a withdrawal
/// announced to live subscribers) and then rewritten in the queue.
pub fn edit_content(
    db: &web::Data<Database>,
    pool: &web::Data<DbPool>,
    feed: &ContentFeed,
    account: &Account,
    item_id: &str,
    body: &str,
    details: ContentDetails,
) -> Result<(), MemberActionError> {
    let conn = pool.get()?;
    match users_db_operations::get_content_owner_id(&conn, item_id)? {
        None => return Err(MemberActionError::NotFound),
        Some(owner_id) if owner_id != account.id => return Err(MemberActionError::Forbidden),
        Some(_) => {}
    }

    let existing = match content_db_operations::read_item_any_status(db, item_id) {
        Some(item) => item,
        None => {
            log::warn!("Ownership row for item {} has no content record.", item_id);
            return Err(MemberActionError::NotFound);
        }
    };

    let details = sanitize_details(details);
    if details.kind() != existing.metadata.details.kind() {
        return Err(MemberActionError::Invalid("The kind of an item cannot be changed.".to_string()));
    }

    let clean_body = sanitization_helpers::escape_body(body.trim());
    if clean_body.is_empty() {
        return Err(MemberActionError::Invalid("Content body is required.".to_string()));
    }

    if existing.status == ModerationStatus::Approved {
        content_db_operations::revert_to_pending(db, item_id)?;
        feed.publish(FeedEvent::Withdrawn {
            id: item_id.to_string(),
            kind: existing.metadata.details.kind(),
        });
    }

    content_db_operations::update_pending_item(db, item_id, &clean_body, details)?;
    Ok(())
}

/// Permanent removal by the owner or an admin. Deleting an id that is
/// already gone is a quiet success; there is nothing to restore either way.
pub fn delete_content(
    db: &web::Data<Database>,
    pool: &web::Data<DbPool>,
    feed: &ContentFeed,
    account: &Account,
    item_id: &str,
) -> Result<DeleteOutcome, MemberActionError> {
    let conn = pool.get()?;
    let owner_id = users_db_operations::get_content_owner_id(&conn, item_id)?;
    let existing = content_db_operations::read_item_any_status(db, item_id);

    if owner_id.is_none() && existing.is_none() {
        return Ok(DeleteOutcome::AlreadyGone);
    }

    let is_owner = owner_id.map_or(false, |id| id == account.id);
    if !is_owner && !account.is_admin() {
        return Err(MemberActionError::Forbidden);
    }

    match content_db_operations::delete_item(db, item_id) {
        Ok(status) => {
            users_db_operations::delete_content_ownership(&conn, item_id)?;
            if status == ModerationStatus::Approved {
                if let Some(item) = existing {
                    feed.publish(FeedEvent::Withdrawn {
                        id: item_id.to_string(),
                        kind: item.metadata.details.kind(),
                    });
                }
            }
            Ok(DeleteOutcome::Deleted)
        }
        Err(DbError::NotFound(_)) => {
            users_db_operations::delete_content_ownership(&conn, item_id)?;
            Ok(DeleteOutcome::AlreadyGone)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn fetch_own_items(
    db: &web::Data<Database>,
    pool: &web::Data<DbPool>,
    user_id: i32,
) -> Result<Vec<FullContentItem>, DbError> {
    let conn = pool
        .get()
        .map_err(|_| DbError::NotFound("DB connection failed".to_string()))?;
    content_db_operations::read_items_by_user(db, &conn, user_id)
}

/// Owners see their item in any status; everyone else gets nothing.
pub fn get_own_item(
    db: &web::Data<Database>,
    pool: &web::Data<DbPool>,
    account: &Account,
    item_id: &str,
) -> Option<FullContentItem> {
    if !can_member_modify(pool, account, item_id, ContentAction::Edit) {
        return None;
    }
    content_db_operations::read_item_any_status(db, item_id)
}

pub fn book_appointment(
    pool: &web::Data<DbPool>,
    account: &Account,
    mentor_id: i32,
    requested_for: &str,
    note: &str,
) -> Result<i64, MemberActionError> {
    let conn = pool.get()?;
    let mentor = directory_db_operations::read_mentor(&conn, mentor_id)
        .filter(|m| m.is_active)
        .ok_or(MemberActionError::NotFound)?;

    let clean_when = sanitization_helpers::strip_all_html(requested_for.trim());
    if clean_when.is_empty() {
        return Err(MemberActionError::Invalid("A requested time is required.".to_string()));
    }
    let clean_note = sanitization_helpers::escape_body(note.trim());

    let appointment_id =
        directory_db_operations::create_appointment(&conn, mentor.id, account.id, &clean_when, &clean_note)?;
    Ok(appointment_id)
}

// --- Media attachments (event images, mentor photos) ---

/// Maps a validated image MIME type to a safe file extension. Intentionally
/// not configurable.
fn image_extension(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/gif" => Some("gif"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub async fn save_media_attachment(
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    user_id: i32,
    mut payload: Multipart,
) -> Result<(String, String), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    let max_file_size_mb = users_db_operations::read_setting(&conn, "max_upload_size_mb")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(5);
    let max_file_size_bytes = max_file_size_mb * 1024 * 1024;

    let mut file_path = PathBuf::new();
    let mut file_size: u64 = 0;
    let mut original_filename = String::new();
    let mut file_ext_str = String::new();
    let file_id = Uuid::new_v4();
    let file_id_str = file_id.to_string();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();

        if field_name != "file" {
            // Drain unexpected fields so the multipart stream stays in sync.
            while let Some(chunk) = field.next().await {
                let _ = chunk?;
            }
            continue;
        }

        let content_type = field.content_type().ok_or("Content-Type not available.")?;
        let content_type_str = content_type.to_string();

        file_ext_str = match image_extension(&content_type_str) {
            Some(ext) => ext.to_string(),
            None => {
                return Err(format!(
                    "Unsupported file type: '{}'. Only PNG, JPEG, WebP, and GIF images are accepted.",
                    content_type_str
                )
                .into())
            }
        };

        let filename = field.content_disposition().get_filename().unwrap_or("upload.tmp");
        original_filename = filename.to_string();

        // Fan out into two-level directories so one folder never holds
        // every upload on the instance.
        let dir1 = &file_id_str[0..2];
        let dir2 = &file_id_str[2..4];
        let new_filename = format!("{}.{}", &file_id_str, &file_ext_str);
        let base_media_path = PathBuf::from(&config.media_path);
        let path = base_media_path.join("attachments").join(dir1).join(dir2);

        web::block({
            let path_clone = path.clone();
            move || fs::create_dir_all(&path_clone)
        })
        .await??;

        let final_path = path.join(new_filename);
        file_path = final_path.clone();

        let mut f = web::block({
            let final_path_clone = final_path.clone();
            move || fs::File::create(final_path_clone)
        })
        .await??;

        while let Some(chunk) = field.next().await {
            let data = chunk?;
            file_size += data.len() as u64;
            if file_size > max_file_size_bytes {
                drop(f);
                let _ = fs::remove_file(&file_path);
                return Err(format!("File is too large. Maximum size is {}MB.", max_file_size_mb).into());
            }
            f = web::block(move || f.write_all(&data).map(|_| f)).await??;
        }
    }

    if file_path.as_os_str().is_empty() {
        return Err("No file was uploaded.".into());
    }

    let display_path = format!(
        "/media/attachments/{}/{}/{}.{}",
        &file_id_str[0..2],
        &file_id_str[2..4],
        file_id_str,
        file_ext_str
    );

    let sidecar_data = MediaAttachment {
        id: file_id_str.clone(),
        file_path: display_path.clone(),
        file_format: file_ext_str,
        original_filename,
        file_size: file_size as i64,
        uploaded_at: Utc::now(),
    };

    let sidecar_json = serde_json::to_string_pretty(&sidecar_data)?;
    let sidecar_path = file_path.with_extension("json");
    fs::write(sidecar_path, sidecar_json)?;

    users_db_operations::add_media_attachment(&conn, &file_id_str, user_id)?;

    Ok((display_path.replace('\\', "/"), file_id_str))
}

fn read_sidecar(path: &Path) -> Result<MediaAttachment, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let metadata: MediaAttachment = serde_json::from_str(&content)?;
    Ok(metadata)
}

pub fn get_user_media(
    config: &web::Data<Config>,
    pool: &web::Data<DbPool>,
    user_id: i32,
) -> Result<Vec<MediaAttachment>, rusqlite::Error> {
    let conn = pool.get().map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?;
    let media_ids = users_db_operations::list_media_ids_for_user(&conn, user_id)?;
    let mut attachments = Vec::new();

    let base_path = PathBuf::from(&config.media_path).join("attachments");

    for id in media_ids {
        let dir1 = &id[0..2];
        let dir2 = &id[2..4];
        let sidecar_path = base_path.join(dir1).join(dir2).join(format!("{}.json", id));

        if sidecar_path.exists() {
            if let Ok(data) = read_sidecar(&sidecar_path) {
                attachments.push(data);
            }
        }
    }
    attachments.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    Ok(attachments)
}

pub async fn delete_media(
    config: &web::Data<Config>,
    pool: &web::Data<DbPool>,
    account: &Account,
    media_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;
    let is_owner = users_db_operations::is_media_owner(&conn, account.id, media_id);
    if !account.is_admin() && !is_owner {
        return Err("Permission denied. You are not the owner of this media.".into());
    }

    // The database record goes first; a stray file is recoverable, a stray
    // record is not.
    users_db_operations::delete_media_attachment(&conn, media_id)?;

    let base_path = PathBuf::from(&config.media_path).join("attachments");
    let dir1 = &media_id[0..2];
    let dir2 = &media_id[2..4];
    let sidecar_path = base_path.join(dir1).join(dir2).join(format!("{}.json", media_id));

    if sidecar_path.exists() {
        if let Ok(sidecar_data) = read_sidecar(&sidecar_path) {
            let file_to_delete_path =
                base_path.join(dir1).join(dir2).join(format!("{}.{}", media_id, sidecar_data.file_format));

            let media_id_owned = media_id.to_string();
            web::block(move || fs::remove_file(&file_to_delete_path))
                .await
                .map_err(|e| format!("Blocking error on file delete: {}", e))?
                .unwrap_or_else(|e| log::error!("Failed to delete media file for {}: {}", media_id_owned, e));
        }

        let media_id_owned = media_id.to_string();
        web::block(move || fs::remove_file(&sidecar_path))
            .await
            .map_err(|e| format!("Blocking error on sidecar delete: {}", e))?
            .unwrap_or_else(|e| log::error!("Failed to delete sidecar file for {}: {}", media_id_owned, e));
    } else {
        log::warn!("Sidecar file for media_id {} was already missing during deletion.", media_id);
    }

    Ok(())
}
