use crate::models::{Account, ContentAction};
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Error as RusqliteError};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub fn create_account(
    conn: &Connection,
    username: &str,
    display_name: &str,
    password: &str,
    role: &str,
) -> Result<(), RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO accounts (username, display_name, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![username, display_name, hashed_password, role],
    )?;
    Ok(())
}

pub fn read_all_accounts(conn: &Connection) -> Result<Vec<Account>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, display_name, role, is_active, last_login_time FROM accounts ORDER BY id",
    )?;
    let account_iter = stmt.query_map([], |row| {
        Ok(Account {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            role: row.get(3)?,
            is_active: row.get(4)?,
            last_login_time: row.get(5)?,
        })
    })?;

    Ok(account_iter.filter_map(|a| a.ok()).collect())
}

pub fn read_account_by_username(conn: &Connection, username: &str) -> Option<Account> {
    conn.query_row(
        "SELECT id, username, display_name, role, is_active, last_login_time FROM accounts WHERE username = ?1",
        [username],
        |row| {
            Ok(Account {
                id: row.get(0)?,
                username: row.get(1)?,
                display_name: row.get(2)?,
                role: row.get(3)?,
                is_active: row.get(4)?,
                last_login_time: row.get(5)?,
            })
        },
    )
    .ok()
}

pub fn update_account(
    conn: &Connection,
    account_id: i32,
    display_name: &str,
    new_password: Option<&str>,
    is_active: bool,
) -> Result<(), RusqliteError> {
    if let Some(password) = new_password {
        if !password.is_empty() {
            let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
            conn.execute(
                "UPDATE accounts SET display_name = ?1, password_hash = ?2, is_active = ?3 WHERE id = ?4",
                params![display_name, hashed_password, is_active, account_id],
            )?;
            return Ok(());
        }
    }

    conn.execute(
        "UPDATE accounts SET display_name = ?1, is_active = ?2 WHERE id = ?3",
        params![display_name, is_active, account_id],
    )?;
    Ok(())
}

pub fn delete_account(conn: &Connection, account_id: i32) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM accounts WHERE id = ?1", [account_id])
}

/// Checks a password against the stored hash. Suspended accounts fail
/// verification regardless of the password.
pub fn verify_credentials(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Option<(String, String)> {
    let res: rusqlite::Result<(String, String, bool)> = conn.query_row(
        "SELECT password_hash, role, is_active FROM accounts WHERE username = ?1",
        [username],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    );

    if let Ok((hash, role, is_active)) = res {
        if is_active && verify(password, &hash).unwrap_or(false) {
            return Some((username.to_string(), role));
        }
    }
    None
}

pub fn update_last_login_time(conn: &Connection, username: &str) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE accounts SET last_login_time = ?1 WHERE username = ?2",
        params![now, username],
    )?;
    Ok(())
}

pub fn read_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()
        .unwrap_or(None)
}

pub fn update_setting(conn: &Connection, key: &str, value: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

// --- Content ownership ---
// One row per item for its whole life; ownership never transfers and the
// row does not move when the item's status changes.

pub fn add_content_ownership(conn: &Connection, item_id: &str, user_id: i32) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO content_ownership (item_id, user_id) VALUES (?1, ?2)",
        params![item_id, user_id],
    )?;
    Ok(())
}

pub fn delete_content_ownership(conn: &Connection, item_id: &str) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM content_ownership WHERE item_id = ?1", [item_id])
}

pub fn get_content_owner_id(conn: &Connection, item_id: &str) -> Result<Option<i32>, RusqliteError> {
    conn.query_row(
        "SELECT user_id FROM content_ownership WHERE item_id = ?1",
        [item_id],
        |row| row.get(0),
    )
    .optional()
}

/// Editing is the owner's privilege alone; re-review exists precisely so
/// admins do not rewrite member content. Deletion is owner or admin.
pub fn check_permission(conn: &Connection, account: &Account, item_id: &str, action: ContentAction) -> bool {
    let owner_id = match get_content_owner_id(conn, item_id) {
        Ok(id) => id,
        Err(_) => return false,
    };
    let is_owner = owner_id.map_or(false, |id| id == account.id);

    match action {
        ContentAction::Edit => is_owner,
        ContentAction::Delete => is_owner || account.is_admin(),
    }
}

// --- Media attachments ---

pub fn add_media_attachment(conn: &Connection, id: &str, user_id: i32) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO media_attachments (id, user_id) VALUES (?1, ?2)",
        params![id, user_id],
    )?;
    Ok(())
}

pub fn delete_media_attachment(conn: &Connection, id: &str) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM media_attachments WHERE id = ?1", [id])
}

pub fn is_media_owner(conn: &Connection, user_id: i32, media_id: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM media_attachments WHERE id = ?1 AND user_id = ?2)",
        params![media_id, user_id],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

pub fn list_media_ids_for_user(conn: &Connection, user_id: i32) -> Result<Vec<String>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT id FROM media_attachments WHERE user_id = ?1 ORDER BY rowid DESC")?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;

    let mut ids = Vec::new();
    for id_result in rows {
        ids.push(id_result?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        db_setup::setup_accounts_db(&mut conn).expect("create account tables");
        conn
    }

    fn make_account(conn: &Connection, username: &str, role: &str) -> Account {
        create_account(conn, username, username, "hunter2!", role).expect("create account");
        read_account_by_username(conn, username).expect("read account back")
    }

    #[test]
    fn verify_credentials_accepts_active_accounts_only() {
        let conn = test_conn();
        let account = make_account(&conn, "leila", "student");

        assert_eq!(
            verify_credentials(&conn, "leila", "hunter2!"),
            Some(("leila".to_string(), "student".to_string()))
        );
        assert!(verify_credentials(&conn, "leila", "wrong").is_none());

        update_account(&conn, account.id, "leila", None, false).unwrap();
        assert!(verify_credentials(&conn, "leila", "hunter2!").is_none());
    }

    #[test]
    fn invalid_role_is_rejected_by_schema() {
        let conn = test_conn();
        assert!(create_account(&conn, "eve", "Eve", "pw", "superuser").is_err());
    }

    #[test]
    fn ownership_permission_matrix() {
        let conn = test_conn();
        let owner = make_account(&conn, "owner", "student");
        let other = make_account(&conn, "other", "alumni");
        let admin = make_account(&conn, "root", "admin");

        add_content_ownership(&conn, "item-1", owner.id).unwrap();

        assert!(check_permission(&conn, &owner, "item-1", ContentAction::Edit));
        assert!(check_permission(&conn, &owner, "item-1", ContentAction::Delete));

        assert!(!check_permission(&conn, &other, "item-1", ContentAction::Edit));
        assert!(!check_permission(&conn, &other, "item-1", ContentAction::Delete));

        // Admins may remove anything but never edit someone else's words.
        assert!(!check_permission(&conn, &admin, "item-1", ContentAction::Edit));
        assert!(check_permission(&conn, &admin, "item-1", ContentAction::Delete));
    }

    #[test]
    fn ownership_rows_are_removed_with_the_item() {
        let conn = test_conn();
        let owner = make_account(&conn, "owner", "professor");
        add_content_ownership(&conn, "item-9", owner.id).unwrap();

        assert_eq!(get_content_owner_id(&conn, "item-9").unwrap(), Some(owner.id));
        delete_content_ownership(&conn, "item-9").unwrap();
        assert_eq!(get_content_owner_id(&conn, "item-9").unwrap(), None);
    }

    #[test]
    fn settings_round_trip() {
        let conn = test_conn();
        assert_eq!(read_setting(&conn, "booking_notify_address"), Some(String::new()));
        update_setting(&conn, "booking_notify_address", "counselling@example.edu").unwrap();
        assert_eq!(
            read_setting(&conn, "booking_notify_address").as_deref(),
            Some("counselling@example.edu")
        );
    }
}
