use crate::models::{Appointment, Mentor};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError};

pub fn create_mentor(
    conn: &Connection,
    name: &str,
    title: &str,
    bio: &str,
    contact_email: &str,
    photo: Option<&str>,
) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO mentors (name, title, bio, contact_email, photo) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, title, bio, contact_email, photo],
    )?;
    Ok(())
}

fn mentor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mentor> {
    Ok(Mentor {
        id: row.get(0)?,
        name: row.get(1)?,
        title: row.get(2)?,
        bio: row.get(3)?,
        contact_email: row.get(4)?,
        photo: row.get(5)?,
        is_active: row.get(6)?,
    })
}

pub fn read_all_mentors(conn: &Connection) -> Result<Vec<Mentor>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, title, bio, contact_email, photo, is_active FROM mentors ORDER BY name",
    )?;
    let iter = stmt.query_map([], mentor_from_row)?;
    Ok(iter.filter_map(|m| m.ok()).collect())
}

/// The public directory: deactivated mentors stay in the table (their
/// appointment history references them) but are not listed.
pub fn read_active_mentors(conn: &Connection) -> Result<Vec<Mentor>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, title, bio, contact_email, photo, is_active FROM mentors WHERE is_active = 1 ORDER BY name",
    )?;
    let iter = stmt.query_map([], mentor_from_row)?;
    Ok(iter.filter_map(|m| m.ok()).collect())
}

pub fn read_mentor(conn: &Connection, mentor_id: i32) -> Option<Mentor> {
    conn.query_row(
        "SELECT id, name, title, bio, contact_email, photo, is_active FROM mentors WHERE id = ?1",
        [mentor_id],
        mentor_from_row,
    )
    .ok()
}

pub fn update_mentor(
    conn: &Connection,
    mentor_id: i32,
    name: &str,
    title: &str,
    bio: &str,
    contact_email: &str,
    photo: Option<&str>,
    is_active: bool,
) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE mentors SET name = ?1, title = ?2, bio = ?3, contact_email = ?4, photo = ?5, is_active = ?6 WHERE id = ?7",
        params![name, title, bio, contact_email, photo, is_active, mentor_id],
    )?;
    Ok(())
}

pub fn delete_mentor(conn: &Connection, mentor_id: i32) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM mentors WHERE id = ?1", [mentor_id])
}

pub fn create_appointment(
    conn: &Connection,
    mentor_id: i32,
    requester_id: i32,
    requested_for: &str,
    note: &str,
) -> Result<i64, RusqliteError> {
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO appointments (mentor_id, requester_id, requested_for, note, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![mentor_id, requester_id, requested_for, note, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_all_appointments(conn: &Connection) -> Result<Vec<Appointment>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, mentor_id, requester_id, requested_for, note, created_at FROM appointments ORDER BY id DESC",
    )?;
    let iter = stmt.query_map([], |row| {
        let created_at: String = row.get(5)?;
        Ok(Appointment {
            id: row.get(0)?,
            mentor_id: row.get(1)?,
            requester_id: row.get(2)?,
            requested_for: row.get(3)?,
            note: row.get(4)?,
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        })
    })?;
    Ok(iter.filter_map(|a| a.ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        db_setup::setup_accounts_db(&mut conn).expect("create tables");
        conn
    }

    #[test]
    fn directory_lists_active_mentors_only() {
        let conn = test_conn();
        create_mentor(&conn, "Dr. Imani Okafor", "Counselling Psychologist", "20 years of practice.", "imani@example.edu", None).unwrap();
        create_mentor(&conn, "Ben Hartley", "Peer Mentor", "Final-year student mentor.", "ben@example.edu", None).unwrap();

        let all = read_all_mentors(&conn).unwrap();
        assert_eq!(all.len(), 2);

        let ben = all.iter().find(|m| m.name == "Ben Hartley").unwrap();
        update_mentor(&conn, ben.id, &ben.name, &ben.title, &ben.bio, &ben.contact_email, None, false).unwrap();

        let active = read_active_mentors(&conn).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Dr. Imani Okafor");
    }

    #[test]
    fn appointment_insert_returns_row_id() {
        let conn = test_conn();
        create_mentor(&conn, "Dr. Imani Okafor", "Counselling Psychologist", "Bio", "imani@example.edu", None).unwrap();
        let mentors = read_all_mentors(&conn).unwrap();
        let mentor = &mentors[0];

        let id = create_appointment(&conn, mentor.id, 7, "2026-09-01 14:00", "First session").unwrap();
        assert!(id > 0);

        let listed = read_all_appointments(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].mentor_id, mentor.id);
        assert_eq!(listed[0].requester_id, 7);
    }
}
