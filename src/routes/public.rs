use crate::helper::public_helpers;
use crate::models::ContentKind;
use crate::AppState;
use actix_web::{web, Either, HttpResponse, Responder};
use actix_web_lab::sse;
use redb::Database;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Deserialize)]
pub struct ApiQuery {
    kind: Option<ContentKind>,
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Deserialize)]
pub struct StreamQuery {
    kind: Option<ContentKind>,
}

// Cap on the backlog replayed to a freshly connected stream client.
const STREAM_SNAPSHOT_LIMIT: u32 = 100;

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(is_server_active))
            .route("/content/latest", web::get().to(get_latest_content))
            .route("/content/stream", web::get().to(stream_approved_content))
            .route("/content/{id}", web::get().to(get_content_by_id))
            .route("/mentors", web::get().to(get_mentor_directory)),
    );
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

/// Approved items only, newest first, optionally narrowed by kind. The
/// stories feed, home-page testimonials, and event listings all read here.
async fn get_latest_content(db: web::Data<Database>, query: web::Query<ApiQuery>) -> impl Responder {
    let limit = query.limit.unwrap_or(20);
    let offset = query.offset.unwrap_or(0);

    match public_helpers::fetch_approved_items(&db, query.kind, limit, offset) {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(e) => {
            log::error!("Failed to fetch approved content: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_content_by_id(id: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    match public_helpers::fetch_approved_item(&db, &id) {
        Some(item) => HttpResponse::Ok().json(item),
        None => HttpResponse::NotFound().body("Content not found"),
    }
}

/// Live feed of the approved set: the current snapshot as `published`
/// events, then every later publish/withdrawal as it happens. The
/// forwarding task holds the only broadcast receiver for this client and
/// exits as soon as the client disconnects, releasing the subscription.
async fn stream_approved_content(
    db: web::Data<Database>,
    state: web::Data<AppState>,
    query: web::Query<StreamQuery>,
) -> Either<sse::Sse<sse::ChannelStream>, HttpResponse> {
    let kind = query.kind;

    // Subscribe before reading the snapshot; a change racing the snapshot
    // is then delivered twice rather than lost.
    let mut rx = state.feed.subscribe();

    let snapshot = match public_helpers::fetch_approved_items(&db, kind, STREAM_SNAPSHOT_LIMIT, 0) {
        Ok(items) => items,
        Err(e) => {
            log::error!("Failed to build stream snapshot: {}", e);
            return Either::Right(HttpResponse::InternalServerError().finish());
        }
    };

    let (tx, stream) = sse::channel(32);

    actix_web::rt::spawn(async move {
        for item in snapshot {
            let data = match sse::Data::new_json(&item) {
                Ok(data) => data.event("published"),
                Err(e) => {
                    log::error!("Failed to serialize stream snapshot item: {}", e);
                    continue;
                }
            };
            if tx.send(data).await.is_err() {
                return;
            }
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !event.matches(kind) {
                        continue;
                    }
                    let data = match sse::Data::new_json(&event) {
                        Ok(data) => data.event(event.name()),
                        Err(e) => {
                            log::error!("Failed to serialize feed event: {}", e);
                            continue;
                        }
                    };
                    if tx.send(data).await.is_err() {
                        break;
                    }
                }
                // A slow client that misses events just continues from the
                // present; the snapshot-on-reconnect covers the gap.
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Stream client lagged; {} feed events skipped.", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Either::Left(stream.with_keep_alive(Duration::from_secs(15)))
}

async fn get_mentor_directory(pool: web::Data<crate::DbPool>) -> impl Responder {
    match public_helpers::fetch_active_mentors(&pool) {
        Ok(mentors) => HttpResponse::Ok().json(mentors),
        Err(e) => {
            log::error!("Failed to fetch mentor directory: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
