use actix_web::{dev, guard, FromRequest, HttpRequest};
use actix_session::{Session, SessionExt};
use serde::Serialize;
use std::env;
use std::future::{ready, Ready};

/// Caller identity resolved once per request from the session cookie and
/// threaded explicitly into the helpers; nothing downstream reads the
/// session again.
#[derive(Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        if let (Ok(Some(username)), Ok(Some(role))) = (session.get("username"), session.get("role")) {
            ready(Ok(AuthenticatedUser { username, role }))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not logged in.")))
        }
    }
}

pub fn admin_guard(session: &Session) -> bool {
    session.get::<String>("role").unwrap_or(None) == Some("admin".to_string())
}

/// Students, alumni, and professors all share the member portal; admins are
/// kept on their own surface.
pub fn member_guard(session: &Session) -> bool {
    matches!(
        session.get::<String>("role").unwrap_or(None).as_deref(),
        Some("student") | Some("alumni") | Some("professor")
    )
}

pub fn ip_guard(ctx: &guard::GuardContext) -> bool {
    let allowed_ips_str = match env::var("ADMIN_LOGIN_ACCEPT_IP") {
        Ok(val) => val,
        Err(_) => {
            log::warn!("ADMIN_LOGIN_ACCEPT_IP is not set. Denying all admin login attempts.");
            return false;
        }
    };

    if allowed_ips_str.trim() == "*" {
        return true;
    }

    // Behind a reverse proxy the peer address is the proxy; prefer the
    // first forwarded address.
    let request_ip = ctx.head().headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| ctx.head().peer_addr.map(|addr| addr.ip().to_string()));

    let peer_addr = match request_ip {
        Some(ip) => ip,
        None => {
            log::warn!("Could not determine peer IP address for admin login attempt.");
            return false;
        }
    };

    let is_allowed = allowed_ips_str.split(',').any(|ip| ip.trim() == peer_addr);

    if !is_allowed {
        log::warn!("Blocked admin login attempt from unauthorized IP: {}", peer_addr);
    }

    is_allowed
}
