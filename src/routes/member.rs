use crate::config::Config;
use crate::helper::{member_helpers, notify_helpers, public_helpers};
use crate::helper::member_helpers::{DeleteOutcome, MemberActionError};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::users_db_operations;
use crate::models::{Account, ContentDetails, FullContentItem, MediaAttachment};
use crate::AppState;
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder, Error};
use redb::Database;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct ContentPayload {
    body: String,
    #[serde(flatten)]
    details: ContentDetails,
}

#[derive(Deserialize)]
struct AppointmentRequest {
    mentor_id: i32,
    requested_for: String,
    note: Option<String>,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

// --- Route configuration ---

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(handle_member_login))
        .route("/logout", web::post().to(handle_member_logout));
}

pub fn config_portal(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/me", web::get().to(get_profile))
            .route("/content", web::post().to(submit_content_action))
            .route("/content/mine", web::get().to(get_my_content_action))
            .route("/content/mine/{item_id}", web::get().to(get_my_content_details))
            .route("/content/mine/{item_id}/update", web::post().to(update_my_content_action))
            .route("/content/mine/{item_id}/delete", web::post().to(delete_my_content_action))
            .route("/media", web::post().to(upload_media_action))
            .route("/media", web::get().to(get_my_media_action))
            .route("/media/{media_id}/delete", web::post().to(delete_media_action))
            .route("/appointments", web::post().to(book_appointment_action)),
    );
}

// --- Utility to get current account details ---

fn get_current_account(auth_user: &AuthenticatedUser, pool: &web::Data<crate::DbPool>) -> Result<Account, HttpResponse> {
    member_helpers::get_account_details(pool, &auth_user.username)
        .ok_or_else(|| HttpResponse::InternalServerError().json(json!({"success": false, "error": "Authenticated account not found."})))
}

fn map_action_error(action: &str, item_id: &str, e: MemberActionError) -> HttpResponse {
    match e {
        MemberActionError::Forbidden => {
            HttpResponse::Forbidden().json(json!({ "success": false, "error": "You do not have permission to modify this item." }))
        }
        MemberActionError::NotFound => {
            HttpResponse::NotFound().json(json!({ "success": false, "error": "Item not found." }))
        }
        MemberActionError::Invalid(message) => {
            HttpResponse::BadRequest().json(json!({ "success": false, "error": message }))
        }
        e => {
            log::error!("Failed to {} item {}: {}", action, item_id, e);
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": format!("Failed to {} item: {}", action, e) }))
        }
    }
}

// --- Login/Logout handlers ---

async fn handle_member_login(
    session: Session,
    pool: web::Data<crate::DbPool>,
    payload: web::Json<LoginRequest>,
) -> impl Responder {
    if let Some((user, role)) = public_helpers::verify_member_credentials(&pool, &payload.username, &payload.password) {
        if role == "admin" {
            return HttpResponse::Forbidden()
                .json(json!({ "success": false, "error": "Administrators must use the admin login." }));
        }
        session.insert("username", user.clone()).ok();
        session.insert("role", role).ok();

        if let Ok(conn) = pool.get() {
            users_db_operations::update_last_login_time(&conn, &user).ok();
        }

        HttpResponse::Ok().json(json!({ "success": true }))
    } else {
        HttpResponse::Unauthorized()
            .json(json!({ "success": false, "error": "Invalid credentials or account suspended." }))
    }
}

async fn handle_member_logout(session: Session) -> impl Responder {
    session.clear();
    HttpResponse::Ok().json(json!({ "success": true }))
}

async fn get_profile(auth_user: AuthenticatedUser, pool: web::Data<crate::DbPool>) -> impl Responder {
    match get_current_account(&auth_user, &pool) {
        Ok(account) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(account), error: None }),
        Err(resp) => resp,
    }
}

// --- Content handlers ---

async fn submit_content_action(
    auth_user: AuthenticatedUser,
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
    payload: web::Json<ContentPayload>,
) -> Result<HttpResponse, Error> {
    let account = match get_current_account(&auth_user, &pool) {
        Ok(a) => a,
        Err(resp) => return Ok(resp),
    };

    let payload = payload.into_inner();
    if payload.body.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "success": false, "error": "Content body is required." })));
    }

    match member_helpers::submit_content(&db, &pool, &account, &payload.body, payload.details) {
        Ok(item_id) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Submitted for review. It will appear publicly once approved.",
            "item_id": item_id
        }))),
        Err(e) => Ok(map_action_error("submit", "(new)", e)),
    }
}

async fn get_my_content_action(
    auth_user: AuthenticatedUser,
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
) -> impl Responder {
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    match member_helpers::fetch_own_items(&db, &pool, account.id) {
        Ok(items) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(items), error: None }),
        Err(e) => {
            log::error!("Failed to fetch items for account {}: {}", account.id, e);
            HttpResponse::InternalServerError().json(ApiResponse {
                success: false,
                data: None::<Vec<FullContentItem>>,
                error: Some("Failed to retrieve your submissions.".to_string()),
            })
        }
    }
}

async fn get_my_content_details(
    auth_user: AuthenticatedUser,
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
    path: web::Path<String>,
) -> impl Responder {
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    let item_id = path.into_inner();
    match member_helpers::get_own_item(&db, &pool, &account, &item_id) {
        Some(item) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(item), error: None }),
        None => HttpResponse::NotFound().json(ApiResponse {
            success: false,
            data: None::<()>,
            error: Some("Item not found or permission denied.".to_string()),
        }),
    }
}

async fn update_my_content_action(
    auth_user: AuthenticatedUser,
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ContentPayload>,
) -> impl Responder {
    let item_id = path.into_inner();
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    let payload = payload.into_inner();

    match member_helpers::edit_content(&db, &pool, &state.feed, &account, &item_id, &payload.body, payload.details) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Updated and returned to the review queue."
        })),
        Err(e) => map_action_error("update", &item_id, e),
    }
}

async fn delete_my_content_action(
    auth_user: AuthenticatedUser,
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let item_id = path.into_inner();
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };

    match member_helpers::delete_content(&db, &pool, &state.feed, &account, &item_id) {
        Ok(DeleteOutcome::Deleted) => HttpResponse::Ok().json(json!({ "success": true, "message": "Item deleted." })),
        Ok(DeleteOutcome::AlreadyGone) => HttpResponse::Ok().json(json!({ "success": true, "message": "Item was already removed." })),
        Err(e) => map_action_error("delete", &item_id, e),
    }
}

// --- Media handlers ---

async fn upload_media_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    config: web::Data<Config>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let account = match get_current_account(&auth_user, &pool) {
        Ok(a) => a,
        Err(resp) => return Ok(resp),
    };
    match member_helpers::save_media_attachment(config, pool.clone(), account.id, payload).await {
        Ok((display_path, file_id)) => Ok(HttpResponse::Ok().json(json!({ "success": true, "url": display_path, "id": file_id }))),
        Err(e) => Ok(HttpResponse::BadRequest().json(json!({ "success": false, "error": e.to_string() }))),
    }
}

async fn get_my_media_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    match member_helpers::get_user_media(&config, &pool, account.id) {
        Ok(media_files) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(media_files), error: None }),
        Err(e) => HttpResponse::InternalServerError().json(ApiResponse {
            success: false,
            data: None::<Vec<MediaAttachment>>,
            error: Some(e.to_string()),
        }),
    }
}

async fn delete_media_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> impl Responder {
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    let media_id = path.into_inner();
    if media_id.len() < 4 {
        return HttpResponse::BadRequest().json(json!({"success": false, "error": "Invalid media ID for deletion."}));
    }

    match member_helpers::delete_media(&config, &pool, &account, &media_id).await {
        Ok(_) => HttpResponse::Ok().json(json!({ "success": true, "message": "Media deleted successfully." })),
        Err(e) => HttpResponse::InternalServerError().json(json!({ "success": false, "error": format!("Failed to delete media: {}", e) })),
    }
}

// --- Appointment handler ---

/// Two independent steps: record the booking, then tell the counselling
/// team. A relay failure leaves the stored booking in place and is
/// reported as such — the caller decides whether to follow up by hand.
async fn book_appointment_action(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    config: web::Data<Config>,
    state: web::Data<AppState>,
    mail_client: web::Data<reqwest::Client>,
    payload: web::Json<AppointmentRequest>,
) -> impl Responder {
    let account = match get_current_account(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    let payload = payload.into_inner();

    let appointment_id = match member_helpers::book_appointment(
        &pool,
        &account,
        payload.mentor_id,
        &payload.requested_for,
        payload.note.as_deref().unwrap_or(""),
    ) {
        Ok(id) => id,
        Err(MemberActionError::NotFound) => {
            return HttpResponse::NotFound().json(json!({ "success": false, "error": "Mentor not found." }));
        }
        Err(MemberActionError::Invalid(message)) => {
            return HttpResponse::BadRequest().json(json!({ "success": false, "error": message }));
        }
        Err(e) => {
            log::error!("Failed to record appointment: {}", e);
            return HttpResponse::InternalServerError().json(json!({ "success": false, "error": "Failed to record the appointment." }));
        }
    };

    let notify_address = state
        .booking_notify_address
        .read()
        .unwrap_or_else(|poisoned| {
            log::error!("RwLock for booking_notify_address was poisoned! Using stale data.");
            poisoned.into_inner()
        })
        .clone();

    if notify_address.is_empty() {
        log::warn!("No booking notification address configured; appointment {} recorded silently.", appointment_id);
        return HttpResponse::Ok().json(json!({ "success": true, "appointment_id": appointment_id }));
    }

    let subject = "New mentor appointment request";
    let message = format!(
        "{} requested an appointment (#{}) for {}.",
        account.display_name, appointment_id, payload.requested_for
    );

    match notify_helpers::send_notification(&mail_client, &config, &notify_address, subject, &message).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "appointment_id": appointment_id })),
        Err(notify_helpers::NotifyError::NotConfigured) => {
            log::warn!("Mail relay not configured; appointment {} recorded without notification.", appointment_id);
            HttpResponse::Ok().json(json!({ "success": true, "appointment_id": appointment_id }))
        }
        Err(e) => {
            log::error!("Appointment {} recorded but notification failed: {}", appointment_id, e);
            HttpResponse::BadGateway().json(json!({
                "success": false,
                "appointment_id": appointment_id,
                "error": "Your appointment was saved, but the staff notification email failed. Please contact the counselling office directly."
            }))
        }
    }
}
