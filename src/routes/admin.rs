use crate::helper::{admin_helpers, member_helpers};
use crate::helper::admin_helpers::AdminHelperError;
use crate::helper::member_helpers::DeleteOutcome;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::users_db_operations;
use crate::models::{Account, ContentKind, ContentSummary};
use crate::AppState;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct PendingQuery {
    kind: Option<ContentKind>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct CreateAccountRequest {
    username: String,
    display_name: String,
    password: String,
    role: String,
}

#[derive(Deserialize)]
struct UpdateAccountRequest {
    account_id: i32,
    display_name: String,
    new_password: Option<String>,
    is_active: bool,
}

#[derive(Deserialize)]
struct DeleteByIdRequest {
    id: i32,
}

#[derive(Deserialize)]
struct MentorPayload {
    name: String,
    title: String,
    bio: String,
    contact_email: String,
    photo: Option<String>,
}

#[derive(Deserialize)]
struct UpdateMentorRequest {
    mentor_id: i32,
    #[serde(flatten)]
    mentor: MentorPayload,
    is_active: bool,
}

#[derive(Deserialize)]
struct UpdateSettingsRequest {
    booking_notify_address: String,
    max_upload_size_mb: String,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

// --- Route configuration ---

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(handle_admin_login))
        .route("/logout", web::post().to(handle_admin_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("/create_account", web::post().to(create_account_action))
        .route("/update_account", web::post().to(update_account_action))
        .route("/delete_account", web::post().to(delete_account_action))
        .route("/create_mentor", web::post().to(create_mentor_action))
        .route("/update_mentor", web::post().to(update_mentor_action))
        .route("/delete_mentor", web::post().to(delete_mentor_action))
        .route("/update_settings", web::post().to(update_settings_action))
        .service(
            web::scope("/api")
                .route("/pending", web::get().to(get_pending_queue_api))
                .route("/pending/{item_id}", web::get().to(get_pending_details_api))
                .route("/pending/{item_id}/approve", web::post().to(approve_item_api))
                .route("/pending/{item_id}/reject", web::post().to(reject_item_api))
                .route("/content/{item_id}/delete", web::post().to(delete_content_api))
                .route("/accounts", web::get().to(get_accounts_api))
                .route("/mentors", web::get().to(get_mentors_api))
                .route("/appointments", web::get().to(get_appointments_api))
                .route("/settings", web::get().to(get_settings_api)),
        );
}

// --- Utility ---

fn get_current_admin(auth_user: &AuthenticatedUser, pool: &web::Data<crate::DbPool>) -> Result<Account, HttpResponse> {
    member_helpers::get_account_details(pool, &auth_user.username)
        .ok_or_else(|| HttpResponse::InternalServerError().json(json!({"success": false, "error": "Authenticated account not found."})))
}

fn map_admin_error(context: &str, e: AdminHelperError) -> HttpResponse {
    match e {
        AdminHelperError::NotFound => {
            HttpResponse::NotFound().json(json!({ "success": false, "error": "Record not found." }))
        }
        e => {
            log::error!("{}: {}", context, e);
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": format!("{}: {}", context, e) }))
        }
    }
}

// --- Login/Logout ---

async fn handle_admin_login(
    session: Session,
    pool: web::Data<crate::DbPool>,
    payload: web::Json<LoginRequest>,
) -> impl Responder {
    let verified = pool
        .get()
        .ok()
        .and_then(|conn| users_db_operations::verify_credentials(&conn, &payload.username, &payload.password));

    match verified {
        Some((user, role)) if role == "admin" => {
            session.insert("username", user.clone()).ok();
            session.insert("role", role).ok();
            if let Ok(conn) = pool.get() {
                users_db_operations::update_last_login_time(&conn, &user).ok();
            }
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Some(_) => HttpResponse::Forbidden().json(json!({ "success": false, "error": "This login is for administrators only." })),
        None => HttpResponse::Unauthorized().json(json!({ "success": false, "error": "Invalid credentials or account suspended." })),
    }
}

async fn handle_admin_logout(session: Session) -> impl Responder {
    session.clear();
    HttpResponse::Ok().json(json!({ "success": true }))
}

// --- Moderation queue ---

async fn get_pending_queue_api(
    db: web::Data<Database>,
    query: web::Query<PendingQuery>,
) -> impl Responder {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10);
    let offset = (page - 1) * limit;

    match admin_helpers::fetch_pending_queue(&db, query.kind, limit, offset) {
        Ok(items) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(items), error: None }),
        Err(e) => {
            log::error!("Failed to fetch the moderation queue: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse {
                success: false,
                data: None::<Vec<ContentSummary>>,
                error: Some("Failed to retrieve pending items.".to_string()),
            })
        }
    }
}

async fn get_pending_details_api(db: web::Data<Database>, path: web::Path<String>) -> impl Responder {
    let item_id = path.into_inner();
    match admin_helpers::get_pending_details(&db, &item_id) {
        Some(item) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(item), error: None }),
        None => HttpResponse::NotFound().json(ApiResponse {
            success: false,
            data: None::<()>,
            error: Some("Pending item not found.".to_string()),
        }),
    }
}

async fn approve_item_api(
    db: web::Data<Database>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let item_id = path.into_inner();
    match admin_helpers::approve_item(&db, &state.feed, &item_id) {
        Ok(()) => HttpResponse::Ok().json(json!({"success": true, "message": "Item approved and published."})),
        Err(e) => map_admin_error("Failed to approve item", e),
    }
}

async fn reject_item_api(
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let item_id = path.into_inner();
    match admin_helpers::reject_item(&db, &pool, &state.feed, &item_id) {
        Ok(()) => HttpResponse::Ok().json(json!({"success": true, "message": "Item rejected and removed."})),
        Err(e) => map_admin_error("Failed to reject item", e),
    }
}

/// Admin removal of any item, approved content included.
async fn delete_content_api(
    auth_user: AuthenticatedUser,
    db: web::Data<Database>,
    pool: web::Data<crate::DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let admin = match get_current_admin(&auth_user, &pool) { Ok(a) => a, Err(resp) => return resp };
    let item_id = path.into_inner();

    match member_helpers::delete_content(&db, &pool, &state.feed, &admin, &item_id) {
        Ok(DeleteOutcome::Deleted) => HttpResponse::Ok().json(json!({ "success": true, "message": "Item deleted." })),
        Ok(DeleteOutcome::AlreadyGone) => HttpResponse::Ok().json(json!({ "success": true, "message": "Item was already removed." })),
        Err(e) => {
            log::error!("Failed to delete item {}: {}", item_id, e);
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": format!("Failed to delete item: {}", e) }))
        }
    }
}

// --- Account management ---

async fn get_accounts_api(pool: web::Data<crate::DbPool>) -> impl Responder {
    match admin_helpers::fetch_all_accounts(&pool) {
        Ok(accounts) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(accounts), error: None }),
        Err(e) => map_admin_error("Failed to list accounts", e),
    }
}

async fn create_account_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<CreateAccountRequest>,
) -> impl Responder {
    let role = payload.role.trim();
    if !matches!(role, "student" | "alumni" | "professor" | "admin") {
        return HttpResponse::BadRequest().json(json!({ "success": false, "error": "Invalid role." }));
    }
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return HttpResponse::BadRequest().json(json!({ "success": false, "error": "Username and password are required." }));
    }

    match admin_helpers::create_new_account(&pool, payload.username.trim(), payload.display_name.trim(), &payload.password, role) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Account created." })),
        Err(e) => map_admin_error("Failed to create account", e),
    }
}

async fn update_account_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<UpdateAccountRequest>,
) -> impl Responder {
    match admin_helpers::update_account(
        &pool,
        payload.account_id,
        payload.display_name.trim(),
        payload.new_password.as_deref(),
        payload.is_active,
    ) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Account updated." })),
        Err(e) => map_admin_error("Failed to update account", e),
    }
}

async fn delete_account_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<DeleteByIdRequest>,
) -> impl Responder {
    match admin_helpers::delete_account(&pool, payload.id) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Account deleted." })),
        Err(e) => map_admin_error("Failed to delete account", e),
    }
}

// --- Mentor management ---

async fn get_mentors_api(pool: web::Data<crate::DbPool>) -> impl Responder {
    match admin_helpers::fetch_all_mentors(&pool) {
        Ok(mentors) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(mentors), error: None }),
        Err(e) => map_admin_error("Failed to list mentors", e),
    }
}

async fn create_mentor_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<MentorPayload>,
) -> impl Responder {
    if payload.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({ "success": false, "error": "Mentor name is required." }));
    }
    match admin_helpers::create_mentor(
        &pool,
        payload.name.trim(),
        payload.title.trim(),
        &payload.bio,
        payload.contact_email.trim(),
        payload.photo.as_deref(),
    ) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Mentor added to the directory." })),
        Err(e) => map_admin_error("Failed to create mentor", e),
    }
}

async fn update_mentor_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<UpdateMentorRequest>,
) -> impl Responder {
    match admin_helpers::update_mentor(
        &pool,
        payload.mentor_id,
        payload.mentor.name.trim(),
        payload.mentor.title.trim(),
        &payload.mentor.bio,
        payload.mentor.contact_email.trim(),
        payload.mentor.photo.as_deref(),
        payload.is_active,
    ) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Mentor updated." })),
        Err(e) => map_admin_error("Failed to update mentor", e),
    }
}

async fn delete_mentor_action(
    pool: web::Data<crate::DbPool>,
    payload: web::Json<DeleteByIdRequest>,
) -> impl Responder {
    match admin_helpers::delete_mentor(&pool, payload.id) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "message": "Mentor removed." })),
        Err(e) => map_admin_error("Failed to delete mentor", e),
    }
}

// --- Appointments & settings ---

async fn get_appointments_api(pool: web::Data<crate::DbPool>) -> impl Responder {
    match admin_helpers::fetch_appointments(&pool) {
        Ok(appointments) => HttpResponse::Ok().json(ApiResponse { success: true, data: Some(appointments), error: None }),
        Err(e) => map_admin_error("Failed to list appointments", e),
    }
}

async fn get_settings_api(pool: web::Data<crate::DbPool>) -> impl Responder {
    match pool.get() {
        Ok(conn) => HttpResponse::Ok().json(ApiResponse {
            success: true,
            data: Some(admin_helpers::get_settings(&conn)),
            error: None,
        }),
        Err(e) => {
            log::error!("Failed to read settings: {}", e);
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": "Failed to read settings." }))
        }
    }
}

async fn update_settings_action(
    pool: web::Data<crate::DbPool>,
    state: web::Data<AppState>,
    payload: web::Json<UpdateSettingsRequest>,
) -> impl Responder {
    let address = payload.booking_notify_address.trim();
    let max_size = payload.max_upload_size_mb.trim();

    if max_size.parse::<u64>().is_err() {
        return HttpResponse::BadRequest().json(json!({ "success": false, "error": "Invalid max upload size. It must be a whole number." }));
    }

    let update_address_res = admin_helpers::update_setting(&pool, "booking_notify_address", address);
    let update_size_res = admin_helpers::update_setting(&pool, "max_upload_size_mb", max_size);

    match (update_address_res, update_size_res) {
        (Ok(()), Ok(())) => {
            let mut cached = state.booking_notify_address.write().unwrap_or_else(|poisoned| {
                log::error!("RwLock for booking_notify_address was poisoned during settings update! Recovering lock.");
                poisoned.into_inner()
            });
            *cached = address.to_string();
            HttpResponse::Ok().json(json!({ "success": true, "message": "Settings updated." }))
        }
        _ => {
            log::error!("Failed to update one or more settings.");
            HttpResponse::InternalServerError().json(json!({ "success": false, "error": "Failed to update settings in database." }))
        }
    }
}
