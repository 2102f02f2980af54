use actix_web::web;
use r2d2_sqlite::SqliteConnectionManager;
use redb::Database;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use mindbase_backend::events::{ContentFeed, FeedEvent};
use mindbase_backend::helper::{admin_helpers, member_helpers};
use mindbase_backend::helper::admin_helpers::AdminHelperError;
use mindbase_backend::helper::member_helpers::{DeleteOutcome, MemberActionError};
use mindbase_backend::models::db_operations::users_db_operations;
use mindbase_backend::models::{Account, ContentDetails, ContentKind, ModerationStatus};
use mindbase_backend::setup::db_setup;
use mindbase_backend::DbPool;

struct Harness {
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    feed: ContentFeed,
    content_path: PathBuf,
    accounts_path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let tag = Uuid::new_v4();
        let content_path = std::env::temp_dir().join(format!("mindbase-wf-{}.redb", tag));
        let accounts_path = std::env::temp_dir().join(format!("mindbase-wf-{}.db", tag));

        let content_db = Database::create(&content_path).expect("create content db");
        db_setup::setup_content_db(&content_db).expect("create content tables");

        let mut conn = Connection::open(&accounts_path).expect("create accounts db");
        db_setup::setup_accounts_db(&mut conn).expect("create account tables");
        drop(conn);

        let manager = SqliteConnectionManager::file(&accounts_path);
        let pool = r2d2::Pool::builder().build(manager).expect("build pool");

        let harness = Harness {
            db: web::Data::new(content_db),
            pool: web::Data::new(pool),
            feed: ContentFeed::new(),
            content_path,
            accounts_path,
        };

        harness.add_account("jonah", "Jonah P.", "student");
        harness.add_account("maya", "Maya R.", "alumni");
        harness.add_account("root", "Portal Admin", "admin");
        harness
    }

    fn add_account(&self, username: &str, display_name: &str, role: &str) {
        let conn = self.pool.get().expect("pool connection");
        users_db_operations::create_account(&conn, username, display_name, "correct horse", role)
            .expect("create account");
    }

    fn account(&self, username: &str) -> Account {
        let conn = self.pool.get().expect("pool connection");
        users_db_operations::read_account_by_username(&conn, username).expect("account exists")
    }

    fn public_feed(&self, kind: Option<ContentKind>) -> Vec<mindbase_backend::models::FullContentItem> {
        mindbase_backend::helper::public_helpers::fetch_approved_items(&self.db, kind, 50, 0)
            .expect("public read")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.content_path);
        let _ = fs::remove_file(&self.accounts_path);
    }
}

#[test]
fn moderation_flow_from_submission_to_edit_revert() {
    let h = Harness::new();
    let student = h.account("jonah");
    let mut rx = h.feed.subscribe();

    // (a) Submission enters the queue as pending.
    let item_id = member_helpers::submit_content(&h.db, &h.pool, &student, "Great support!", ContentDetails::Feedback)
        .expect("submit");

    let own = member_helpers::fetch_own_items(&h.db, &h.pool, student.id).expect("own list");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].status, ModerationStatus::Pending);
    assert_eq!(own[0].metadata.author_name, "Jonah P.");
    assert!(h.public_feed(Some(ContentKind::Feedback)).is_empty());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    // (b) The admin queue lists it.
    let queue = admin_helpers::fetch_pending_queue(&h.db, None, 10, 0).expect("queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, item_id);

    // (c) Approval publishes it and announces the change.
    admin_helpers::approve_item(&h.db, &h.feed, &item_id).expect("approve");
    match rx.try_recv().expect("published event") {
        FeedEvent::Published { item } => {
            assert_eq!(item.id, item_id);
            assert!(item.metadata.approved_at.is_some());
        }
        other => panic!("unexpected event {:?}", other),
    }

    // (d) The public kind-filtered surface now carries it.
    let feedback = h.public_feed(Some(ContentKind::Feedback));
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].body, "Great support!");

    // (e) An owner edit reverts to pending and withdraws it immediately.
    member_helpers::edit_content(&h.db, &h.pool, &h.feed, &student, &item_id, "Even better now!", ContentDetails::Feedback)
        .expect("edit");
    match rx.try_recv().expect("withdrawal event") {
        FeedEvent::Withdrawn { id, kind } => {
            assert_eq!(id, item_id);
            assert_eq!(kind, ContentKind::Feedback);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(h.public_feed(Some(ContentKind::Feedback)).is_empty());

    let own = member_helpers::fetch_own_items(&h.db, &h.pool, student.id).expect("own list");
    assert_eq!(own[0].status, ModerationStatus::Pending);
    assert_eq!(own[0].body, "Even better now!");
    assert!(own[0].metadata.approved_at.is_none());
}

#[test]
fn repeated_edits_with_the_same_body_stay_pending() {
    let h = Harness::new();
    let student = h.account("jonah");

    let item_id = member_helpers::submit_content(&h.db, &h.pool, &student, "hello", ContentDetails::Story)
        .expect("submit");

    member_helpers::edit_content(&h.db, &h.pool, &h.feed, &student, &item_id, "hello", ContentDetails::Story)
        .expect("first edit");
    member_helpers::edit_content(&h.db, &h.pool, &h.feed, &student, &item_id, "hello", ContentDetails::Story)
        .expect("second edit");

    let own = member_helpers::fetch_own_items(&h.db, &h.pool, student.id).expect("own list");
    assert_eq!(own[0].status, ModerationStatus::Pending);
    assert_eq!(own[0].body, "hello");
}

#[test]
fn non_owner_mutations_are_forbidden_and_change_nothing() {
    let h = Harness::new();
    let student = h.account("jonah");
    let other = h.account("maya");
    let admin = h.account("root");

    let item_id = member_helpers::submit_content(&h.db, &h.pool, &student, "my story", ContentDetails::Story)
        .expect("submit");

    let edit = member_helpers::edit_content(&h.db, &h.pool, &h.feed, &other, &item_id, "hijacked", ContentDetails::Story);
    assert!(matches!(edit, Err(MemberActionError::Forbidden)));

    let delete = member_helpers::delete_content(&h.db, &h.pool, &h.feed, &other, &item_id);
    assert!(matches!(delete, Err(MemberActionError::Forbidden)));

    // Admins may not rewrite member content either; re-review would be
    // meaningless if they could.
    let admin_edit = member_helpers::edit_content(&h.db, &h.pool, &h.feed, &admin, &item_id, "hijacked", ContentDetails::Story);
    assert!(matches!(admin_edit, Err(MemberActionError::Forbidden)));

    let own = member_helpers::fetch_own_items(&h.db, &h.pool, student.id).expect("own list");
    assert_eq!(own[0].body, "my story");
    assert_eq!(own[0].status, ModerationStatus::Pending);

    // An admin delete, however, goes through.
    let admin_delete = member_helpers::delete_content(&h.db, &h.pool, &h.feed, &admin, &item_id);
    assert!(matches!(admin_delete, Ok(DeleteOutcome::Deleted)));
    assert!(member_helpers::fetch_own_items(&h.db, &h.pool, student.id).expect("own list").is_empty());
}

#[test]
fn rejection_destroys_the_item_entirely() {
    let h = Harness::new();
    let student = h.account("jonah");

    let item_id = member_helpers::submit_content(&h.db, &h.pool, &student, "pending piece", ContentDetails::Feedback)
        .expect("submit");

    admin_helpers::reject_item(&h.db, &h.pool, &h.feed, &item_id).expect("reject");

    assert!(admin_helpers::fetch_pending_queue(&h.db, None, 10, 0).expect("queue").is_empty());

    let edit = member_helpers::edit_content(&h.db, &h.pool, &h.feed, &student, &item_id, "too late", ContentDetails::Feedback);
    assert!(matches!(edit, Err(MemberActionError::NotFound)));

    let approve = admin_helpers::approve_item(&h.db, &h.feed, &item_id);
    assert!(matches!(approve, Err(AdminHelperError::NotFound)));

    // Deleting the already-gone id is a quiet success.
    let delete = member_helpers::delete_content(&h.db, &h.pool, &h.feed, &student, &item_id);
    assert!(matches!(delete, Ok(DeleteOutcome::AlreadyGone)));
}

#[test]
fn approving_an_approved_item_emits_no_second_event() {
    let h = Harness::new();
    let student = h.account("jonah");
    let mut rx = h.feed.subscribe();

    let item_id = member_helpers::submit_content(&h.db, &h.pool, &student, "hello", ContentDetails::Story)
        .expect("submit");

    admin_helpers::approve_item(&h.db, &h.feed, &item_id).expect("first approve");
    assert!(matches!(rx.try_recv(), Ok(FeedEvent::Published { .. })));

    admin_helpers::approve_item(&h.db, &h.feed, &item_id).expect("second approve is a no-op");
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn kind_is_immutable_after_submission() {
    let h = Harness::new();
    let student = h.account("jonah");

    let item_id = member_helpers::submit_content(&h.db, &h.pool, &student, "a story", ContentDetails::Story)
        .expect("submit");

    let edit = member_helpers::edit_content(&h.db, &h.pool, &h.feed, &student, &item_id, "now feedback?", ContentDetails::Feedback);
    assert!(matches!(edit, Err(MemberActionError::Invalid(_))));
}

#[test]
fn event_submissions_carry_their_structured_fields() {
    let h = Harness::new();
    let professor = h.account("maya");

    let details = ContentDetails::Event(mindbase_backend::models::EventDetails {
        title: Some("Exam-season drop-in".to_string()),
        starts_on: Some("2026-11-02".to_string()),
        meeting_link: Some("https://meet.example.edu/dropin".to_string()),
        ..Default::default()
    });

    let item_id = member_helpers::submit_content(&h.db, &h.pool, &professor, "Weekly drop-in session.", details)
        .expect("submit");
    admin_helpers::approve_item(&h.db, &h.feed, &item_id).expect("approve");

    let events = h.public_feed(Some(ContentKind::Event));
    assert_eq!(events.len(), 1);
    match &events[0].metadata.details {
        ContentDetails::Event(event) => {
            assert_eq!(event.title.as_deref(), Some("Exam-season drop-in"));
            assert_eq!(event.starts_on.as_deref(), Some("2026-11-02"));
        }
        other => panic!("unexpected details {:?}", other),
    }

    // Stories and feedback stay off the events surface.
    assert!(h.public_feed(Some(ContentKind::Story)).is_empty());
}
