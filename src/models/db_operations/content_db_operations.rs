use redb::{Database, ReadableTable, TableDefinition, CommitError, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use crate::models::{ContentDetails, ContentKind, ContentMetadata, ContentSummary, FullContentItem, ModerationStatus};
use uuid::Uuid;
use chrono::Utc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("UUID parse error: {0}")]
    Uuid(#[from] uuid::Error),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

// --- Tables for APPROVED items ---
pub const CONTENT: TableDefinition<&[u8; 16], &str> = TableDefinition::new("content");
pub const METADATA: TableDefinition<&[u8; 16], &str> = TableDefinition::new("metadata");
// Composite keys give newest-first range scans without in-memory sorting.
pub const KIND_INDEX: TableDefinition<(&str, i64, &[u8; 16]), ()> = TableDefinition::new("kind_index");
pub const CHRONOLOGICAL_INDEX: TableDefinition<(i64, &[u8; 16]), ()> = TableDefinition::new("chronological_index");

// --- Tables for PENDING items ---
pub const PENDING_CONTENT: TableDefinition<&[u8; 16], &str> = TableDefinition::new("pending_content");
pub const PENDING_METADATA: TableDefinition<&[u8; 16], &str> = TableDefinition::new("pending_metadata");

/// An item's status is the table pair it lives in; a third status value is
/// unrepresentable.
pub enum ApproveOutcome {
    Approved(FullContentItem),
    AlreadyApproved,
}

// Negated so ascending range scans come out newest-first.
fn index_timestamp(metadata: &ContentMetadata) -> i64 {
    -metadata.created_at.timestamp_millis()
}

// ====================================================================
// =================== PENDING ITEM OPERATIONS ========================
// ====================================================================

pub fn create_pending_item(
    db: &Database,
    author_name: &str,
    body: &str,
    details: ContentDetails,
) -> Result<String, DbError> {
    let item_uuid = Uuid::new_v4();
    let created_at = Utc::now();

    let metadata = ContentMetadata {
        author_name: author_name.to_string(),
        created_at,
        last_updated_at: None,
        approved_at: None,
        details,
    };
    let metadata_json = serde_json::to_string(&metadata)?;

    let write_txn = db.begin_write()?;
    {
        let mut content_table = write_txn.open_table(PENDING_CONTENT)?;
        let mut metadata_table = write_txn.open_table(PENDING_METADATA)?;

        let item_id_bytes = item_uuid.into_bytes();
        content_table.insert(&item_id_bytes, body)?;
        metadata_table.insert(&item_id_bytes, metadata_json.as_str())?;
    }
    write_txn.commit()?;

    Ok(item_uuid.to_string())
}

/// Overwrites a pending item's body and details. The author name and the
/// creation timestamp carry over from the stored metadata; the kind is
/// expected to match (callers enforce kind immutability).
pub fn update_pending_item(
    db: &Database,
    item_id: &str,
    body: &str,
    details: ContentDetails,
) -> Result<(), DbError> {
    let item_uuid = Uuid::parse_str(item_id)?;
    let item_id_bytes = item_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    {
        let mut content_table = write_txn.open_table(PENDING_CONTENT)?;
        let mut metadata_table = write_txn.open_table(PENDING_METADATA)?;

        let old_meta: ContentMetadata = {
            let guard = metadata_table
                .get(&item_id_bytes)?
                .ok_or_else(|| DbError::NotFound("Pending item metadata not found".to_string()))?;
            serde_json::from_str(guard.value())?
        };

        let new_meta = ContentMetadata {
            author_name: old_meta.author_name,
            created_at: old_meta.created_at,
            last_updated_at: Some(Utc::now()),
            approved_at: None,
            details,
        };
        let new_meta_json = serde_json::to_string(&new_meta)?;

        content_table.insert(&item_id_bytes, body)?;
        metadata_table.insert(&item_id_bytes, new_meta_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn read_pending_item(db: &Database, id: &str) -> Option<FullContentItem> {
    let item_uuid = Uuid::parse_str(id).ok()?;
    let item_id_bytes = item_uuid.into_bytes();

    let read_txn = db.begin_read().ok()?;
    let content_table = read_txn.open_table(PENDING_CONTENT).ok()?;
    let metadata_table = read_txn.open_table(PENDING_METADATA).ok()?;

    let body = content_table.get(&item_id_bytes).ok().flatten()?.value().to_string();
    let metadata: ContentMetadata =
        serde_json::from_str(metadata_table.get(&item_id_bytes).ok().flatten()?.value()).ok()?;

    Some(FullContentItem {
        id: id.to_string(),
        status: ModerationStatus::Pending,
        metadata,
        body,
    })
}

/// The moderation queue: every pending item, optionally narrowed by kind,
/// newest-first. The pending set is small, so the sort happens in memory
/// (no dedicated index for pending items).
pub fn read_pending_summaries(
    db: &Database,
    kind: Option<ContentKind>,
    limit: u32,
    offset: u32,
) -> Result<Vec<ContentSummary>, DbError> {
    let read_txn = db.begin_read()?;
    let metadata_table = read_txn.open_table(PENDING_METADATA)?;
    let mut items: Vec<ContentSummary> = metadata_table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(id_bytes, meta_str)| {
            let item_uuid = Uuid::from_bytes(*id_bytes.value());
            serde_json::from_str::<ContentMetadata>(meta_str.value())
                .ok()
                .map(|metadata| ContentSummary { id: item_uuid.to_string(), metadata })
        })
        .filter(|summary| kind.map_or(true, |k| summary.metadata.details.kind() == k))
        .collect();

    items.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));

    Ok(items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect())
}

// ====================================================================
// =================== STATUS TRANSITIONS =============================
// ====================================================================

/// Moves an item from the pending pair to the approved pair and stamps
/// `approved_at`. Approving an item that is already approved is a no-op
/// success; an id found in neither pair is `NotFound`.
pub fn approve_item(db: &Database, item_id: &str) -> Result<ApproveOutcome, DbError> {
    let item_uuid = Uuid::parse_str(item_id)?;
    let item_id_bytes = item_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    let outcome = {
        let mut pending_content = write_txn.open_table(PENDING_CONTENT)?;
        let mut pending_metadata = write_txn.open_table(PENDING_METADATA)?;
        let mut content_table = write_txn.open_table(CONTENT)?;
        let mut metadata_table = write_txn.open_table(METADATA)?;
        let mut kind_index = write_txn.open_table(KIND_INDEX)?;
        let mut chrono_index = write_txn.open_table(CHRONOLOGICAL_INDEX)?;

        let pending = {
            let body = pending_content.get(&item_id_bytes)?.map(|g| g.value().to_string());
            let meta = pending_metadata.get(&item_id_bytes)?.map(|g| g.value().to_string());
            match (body, meta) {
                (Some(body), Some(meta)) => Some((body, serde_json::from_str::<ContentMetadata>(&meta)?)),
                _ => None,
            }
        };

        match pending {
            Some((body, mut metadata)) => {
                metadata.approved_at = Some(Utc::now());
                let metadata_json = serde_json::to_string(&metadata)?;

                content_table.insert(&item_id_bytes, body.as_str())?;
                metadata_table.insert(&item_id_bytes, metadata_json.as_str())?;

                let timestamp = index_timestamp(&metadata);
                chrono_index.insert((timestamp, &item_id_bytes), ())?;
                kind_index.insert((metadata.details.kind().as_str(), timestamp, &item_id_bytes), ())?;

                pending_content.remove(&item_id_bytes)?;
                pending_metadata.remove(&item_id_bytes)?;

                ApproveOutcome::Approved(FullContentItem {
                    id: item_id.to_string(),
                    status: ModerationStatus::Approved,
                    metadata,
                    body,
                })
            }
            None => {
                if metadata_table.get(&item_id_bytes)?.is_some() {
                    ApproveOutcome::AlreadyApproved
                } else {
                    return Err(DbError::NotFound(item_id.to_string()));
                }
            }
        }
    };
    write_txn.commit()?;
    Ok(outcome)
}

/// Moves an approved item back to the pending pair: `approved_at` is
/// cleared and every public index entry is removed in the same
/// transaction, so a reader never observes a half-withdrawn item.
pub fn revert_to_pending(db: &Database, item_id: &str) -> Result<(), DbError> {
    let item_uuid = Uuid::parse_str(item_id)?;
    let item_id_bytes = item_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    {
        let mut content_table = write_txn.open_table(CONTENT)?;
        let mut metadata_table = write_txn.open_table(METADATA)?;
        let mut kind_index = write_txn.open_table(KIND_INDEX)?;
        let mut chrono_index = write_txn.open_table(CHRONOLOGICAL_INDEX)?;
        let mut pending_content = write_txn.open_table(PENDING_CONTENT)?;
        let mut pending_metadata = write_txn.open_table(PENDING_METADATA)?;

        let body = content_table
            .get(&item_id_bytes)?
            .ok_or_else(|| DbError::NotFound(item_id.to_string()))?
            .value()
            .to_string();
        let mut metadata: ContentMetadata = {
            let guard = metadata_table
                .get(&item_id_bytes)?
                .ok_or_else(|| DbError::NotFound(item_id.to_string()))?;
            serde_json::from_str(guard.value())?
        };

        let timestamp = index_timestamp(&metadata);
        chrono_index.remove((timestamp, &item_id_bytes))?;
        kind_index.remove((metadata.details.kind().as_str(), timestamp, &item_id_bytes))?;
        content_table.remove(&item_id_bytes)?;
        metadata_table.remove(&item_id_bytes)?;

        metadata.approved_at = None;
        let metadata_json = serde_json::to_string(&metadata)?;
        pending_content.insert(&item_id_bytes, body.as_str())?;
        pending_metadata.insert(&item_id_bytes, metadata_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Permanently removes an item from whichever pair holds it and reports
/// which status it had, so callers know whether a withdrawal needs to be
/// announced. There is no tombstone and no soft delete.
pub fn delete_item(db: &Database, item_id: &str) -> Result<ModerationStatus, DbError> {
    let item_uuid = Uuid::parse_str(item_id)?;
    let item_id_bytes = item_uuid.into_bytes();

    let write_txn = db.begin_write()?;
    let status = {
        let mut pending_content = write_txn.open_table(PENDING_CONTENT)?;
        let mut pending_metadata = write_txn.open_table(PENDING_METADATA)?;
        let mut content_table = write_txn.open_table(CONTENT)?;
        let mut metadata_table = write_txn.open_table(METADATA)?;
        let mut kind_index = write_txn.open_table(KIND_INDEX)?;
        let mut chrono_index = write_txn.open_table(CHRONOLOGICAL_INDEX)?;

        if pending_metadata.get(&item_id_bytes)?.is_some() {
            pending_content.remove(&item_id_bytes)?;
            pending_metadata.remove(&item_id_bytes)?;
            ModerationStatus::Pending
        } else {
            let metadata: Option<ContentMetadata> = metadata_table
                .get(&item_id_bytes)?
                .and_then(|guard| serde_json::from_str(guard.value()).ok());

            match metadata {
                Some(meta) => {
                    let timestamp = index_timestamp(&meta);
                    chrono_index.remove((timestamp, &item_id_bytes))?;
                    kind_index.remove((meta.details.kind().as_str(), timestamp, &item_id_bytes))?;
                    content_table.remove(&item_id_bytes)?;
                    metadata_table.remove(&item_id_bytes)?;
                    ModerationStatus::Approved
                }
                None => return Err(DbError::NotFound(item_id.to_string())),
            }
        }
    };
    write_txn.commit()?;
    Ok(status)
}

// ====================================================================
// =================== APPROVED ITEM OPERATIONS =======================
// ====================================================================

pub fn read_approved_item(db: &Database, id: &str) -> Option<FullContentItem> {
    let item_uuid = Uuid::parse_str(id).ok()?;
    let item_id_bytes = item_uuid.into_bytes();

    let read_txn = db.begin_read().ok()?;
    let content_table = read_txn.open_table(CONTENT).ok()?;
    let metadata_table = read_txn.open_table(METADATA).ok()?;

    let body = content_table.get(&item_id_bytes).ok().flatten()?.value().to_string();
    let metadata: ContentMetadata =
        serde_json::from_str(metadata_table.get(&item_id_bytes).ok().flatten()?.value()).ok()?;

    Some(FullContentItem {
        id: id.to_string(),
        status: ModerationStatus::Approved,
        metadata,
        body,
    })
}

/// An item in either state, pending checked first. Owner-facing reads go
/// through this; public surfaces never do.
pub fn read_item_any_status(db: &Database, id: &str) -> Option<FullContentItem> {
    read_pending_item(db, id).or_else(|| read_approved_item(db, id))
}

pub fn read_latest_approved(db: &Database, limit: u32, offset: u32) -> Result<Vec<FullContentItem>, DbError> {
    let read_txn = db.begin_read()?;
    let chrono_index = read_txn.open_table(CHRONOLOGICAL_INDEX)?;
    let content_table = read_txn.open_table(CONTENT)?;
    let metadata_table = read_txn.open_table(METADATA)?;

    let items = chrono_index
        .iter()?
        .skip(offset as usize)
        .take(limit as usize)
        .filter_map(|item_result| {
            item_result.ok().and_then(|(key, _value)| {
                let item_id_bytes = key.value().1;
                let item_uuid = Uuid::from_bytes(*item_id_bytes);
                let body = content_table.get(item_id_bytes).ok().flatten()?.value().to_string();
                metadata_table.get(item_id_bytes).ok().flatten().and_then(|meta_str| {
                    serde_json::from_str(meta_str.value()).ok().map(|metadata| FullContentItem {
                        id: item_uuid.to_string(),
                        status: ModerationStatus::Approved,
                        metadata,
                        body,
                    })
                })
            })
        })
        .collect();
    Ok(items)
}

pub fn read_approved_by_kind(
    db: &Database,
    kind: ContentKind,
    limit: u32,
    offset: u32,
) -> Result<Vec<FullContentItem>, DbError> {
    let read_txn = db.begin_read()?;
    let kind_index = read_txn.open_table(KIND_INDEX)?;
    let content_table = read_txn.open_table(CONTENT)?;
    let metadata_table = read_txn.open_table(METADATA)?;

    let start_key = (kind.as_str(), i64::MIN, &[0u8; 16]);
    let end_key = (kind.as_str(), i64::MAX, &[255u8; 16]);

    let items = kind_index
        .range(start_key..=end_key)?
        .skip(offset as usize)
        .take(limit as usize)
        .filter_map(|item_result| {
            item_result.ok().and_then(|(key, _value)| {
                let item_id_bytes = key.value().2;
                let item_uuid = Uuid::from_bytes(*item_id_bytes);
                let body = content_table.get(item_id_bytes).ok().flatten()?.value().to_string();
                metadata_table.get(item_id_bytes).ok().flatten().and_then(|meta_str| {
                    serde_json::from_str(meta_str.value()).ok().map(|metadata| FullContentItem {
                        id: item_uuid.to_string(),
                        status: ModerationStatus::Approved,
                        metadata,
                        body,
                    })
                })
            })
        })
        .collect();
    Ok(items)
}

pub fn read_approved_items(
    db: &Database,
    kind: Option<ContentKind>,
    limit: u32,
    offset: u32,
) -> Result<Vec<FullContentItem>, DbError> {
    match kind {
        Some(kind) => read_approved_by_kind(db, kind, limit, offset),
        None => read_latest_approved(db, limit, offset),
    }
}

// ====================================================================
// =================== OWNER-SCOPED READS =============================
// ====================================================================

/// Everything a member has submitted, in both statuses, newest-first. The
/// id list comes from the ownership table; items whose ownership row
/// outlived the content (or vice versa) are skipped rather than failing
/// the whole listing.
pub fn read_items_by_user(
    db: &Database,
    conn: &Connection,
    user_id: i32,
) -> Result<Vec<FullContentItem>, DbError> {
    let mut stmt = conn.prepare("SELECT item_id FROM content_ownership WHERE user_id = ?1 ORDER BY rowid DESC")?;
    let id_iter = stmt.query_map([user_id], |row| row.get::<_, String>(0))?;
    let item_ids: Vec<String> = id_iter.filter_map(|id| id.ok()).collect();

    let mut items: Vec<FullContentItem> = item_ids
        .into_iter()
        .filter_map(|id| read_item_any_status(db, &id))
        .collect();

    items.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventDetails;
    use crate::setup::db_setup;
    use std::fs;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;

    struct TempDb {
        db: Database,
        path: PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("mindbase-content-{}.redb", Uuid::new_v4()));
            let db = Database::create(&path).expect("create temp content db");
            db_setup::setup_content_db(&db).expect("create content tables");
            TempDb { db, path }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    fn submit(db: &Database, body: &str, details: ContentDetails) -> String {
        create_pending_item(db, "Asha N.", body, details).expect("create pending item")
    }

    #[test]
    fn new_submission_is_pending_and_invisible_to_public_reads() {
        let tmp = TempDb::new();
        let id = submit(&tmp.db, "hello", ContentDetails::Story);

        let item = read_pending_item(&tmp.db, &id).expect("pending item readable");
        assert_eq!(item.status, ModerationStatus::Pending);
        assert_eq!(item.body, "hello");
        assert!(item.metadata.approved_at.is_none());

        assert!(read_approved_item(&tmp.db, &id).is_none());
        assert!(read_latest_approved(&tmp.db, 10, 0).unwrap().is_empty());
        assert!(read_approved_by_kind(&tmp.db, ContentKind::Story, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn approve_moves_item_and_stamps_approved_at() {
        let tmp = TempDb::new();
        let id = submit(&tmp.db, "Great support!", ContentDetails::Feedback);

        let outcome = approve_item(&tmp.db, &id).expect("approve");
        let item = match outcome {
            ApproveOutcome::Approved(item) => item,
            ApproveOutcome::AlreadyApproved => panic!("expected a fresh approval"),
        };
        assert!(item.metadata.approved_at.is_some());

        assert!(read_pending_item(&tmp.db, &id).is_none());
        let feed = read_approved_by_kind(&tmp.db, ContentKind::Feedback, 10, 0).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, id);
        assert_eq!(feed[0].body, "Great support!");
    }

    #[test]
    fn approving_twice_is_a_no_op() {
        let tmp = TempDb::new();
        let id = submit(&tmp.db, "hello", ContentDetails::Story);

        let first = approve_item(&tmp.db, &id).expect("first approve");
        let approved_at = match first {
            ApproveOutcome::Approved(item) => item.metadata.approved_at,
            ApproveOutcome::AlreadyApproved => panic!("expected a fresh approval"),
        };

        match approve_item(&tmp.db, &id).expect("second approve") {
            ApproveOutcome::AlreadyApproved => {}
            ApproveOutcome::Approved(_) => panic!("second approval must not re-approve"),
        }

        let item = read_approved_item(&tmp.db, &id).expect("still approved");
        assert_eq!(item.metadata.approved_at, approved_at);
    }

    #[test]
    fn approving_unknown_id_is_not_found() {
        let tmp = TempDb::new();
        let missing = Uuid::new_v4().to_string();
        match approve_item(&tmp.db, &missing) {
            Err(DbError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn revert_clears_approved_at_and_public_visibility() {
        let tmp = TempDb::new();
        let id = submit(&tmp.db, "original", ContentDetails::Story);
        approve_item(&tmp.db, &id).expect("approve");

        revert_to_pending(&tmp.db, &id).expect("revert");
        update_pending_item(&tmp.db, &id, "edited", ContentDetails::Story).expect("update");

        assert!(read_approved_item(&tmp.db, &id).is_none());
        assert!(read_latest_approved(&tmp.db, 10, 0).unwrap().is_empty());

        let item = read_pending_item(&tmp.db, &id).expect("back in the queue");
        assert_eq!(item.body, "edited");
        assert!(item.metadata.approved_at.is_none());
        assert!(item.metadata.last_updated_at.is_some());
        assert_eq!(item.metadata.author_name, "Asha N.");
    }

    #[test]
    fn update_pending_preserves_creation_time() {
        let tmp = TempDb::new();
        let id = submit(&tmp.db, "v1", ContentDetails::Story);
        let created_at = read_pending_item(&tmp.db, &id).unwrap().metadata.created_at;

        update_pending_item(&tmp.db, &id, "v2", ContentDetails::Story).expect("update");
        let item = read_pending_item(&tmp.db, &id).unwrap();
        assert_eq!(item.body, "v2");
        assert_eq!(item.metadata.created_at, created_at);
    }

    #[test]
    fn kind_filter_only_returns_matching_items() {
        let tmp = TempDb::new();
        let story = submit(&tmp.db, "a story", ContentDetails::Story);
        let event = submit(
            &tmp.db,
            "an event",
            ContentDetails::Event(EventDetails {
                title: Some("Mindfulness workshop".to_string()),
                ..EventDetails::default()
            }),
        );
        approve_item(&tmp.db, &story).unwrap();
        approve_item(&tmp.db, &event).unwrap();

        let stories = read_approved_by_kind(&tmp.db, ContentKind::Story, 10, 0).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, story);

        let events = read_approved_by_kind(&tmp.db, ContentKind::Event, 10, 0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event);

        assert_eq!(read_latest_approved(&tmp.db, 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn approved_feed_is_newest_first() {
        let tmp = TempDb::new();
        let older = submit(&tmp.db, "older", ContentDetails::Story);
        thread::sleep(Duration::from_millis(5));
        let newer = submit(&tmp.db, "newer", ContentDetails::Story);
        approve_item(&tmp.db, &older).unwrap();
        approve_item(&tmp.db, &newer).unwrap();

        let feed = read_latest_approved(&tmp.db, 10, 0).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, newer);
        assert_eq!(feed[1].id, older);
    }

    #[test]
    fn pending_queue_sorts_newest_first_and_filters_by_kind() {
        let tmp = TempDb::new();
        let older = submit(&tmp.db, "older", ContentDetails::Feedback);
        thread::sleep(Duration::from_millis(5));
        let newer = submit(&tmp.db, "newer", ContentDetails::Feedback);
        submit(&tmp.db, "a story", ContentDetails::Story);

        let queue = read_pending_summaries(&tmp.db, Some(ContentKind::Feedback), 10, 0).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, newer);
        assert_eq!(queue[1].id, older);

        let all = read_pending_summaries(&tmp.db, None, 10, 0).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn delete_reports_prior_status_and_then_not_found() {
        let tmp = TempDb::new();
        let pending = submit(&tmp.db, "pending one", ContentDetails::Story);
        let approved = submit(&tmp.db, "approved one", ContentDetails::Story);
        approve_item(&tmp.db, &approved).unwrap();

        assert_eq!(delete_item(&tmp.db, &pending).unwrap(), ModerationStatus::Pending);
        assert_eq!(delete_item(&tmp.db, &approved).unwrap(), ModerationStatus::Approved);

        match delete_item(&tmp.db, &pending) {
            Err(DbError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
        match update_pending_item(&tmp.db, &pending, "x", ContentDetails::Story) {
            Err(DbError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
        assert!(read_latest_approved(&tmp.db, 10, 0).unwrap().is_empty());
    }
}
