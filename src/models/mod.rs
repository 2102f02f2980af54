use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three flavors of moderated content the portal accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Story,
    Feedback,
    Event,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Story => "story",
            ContentKind::Feedback => "feedback",
            ContentKind::Event => "event",
        }
    }
}

/// Structured extras carried only by event announcements. Every field is a
/// free-form string; presence is the only validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventDetails {
    pub title: Option<String>,
    pub starts_on: Option<String>,
    pub ends_on: Option<String>,
    pub meeting_link: Option<String>,
    pub payment_link: Option<String>,
    pub contact_number: Option<String>,
    pub image: Option<String>,
}

/// Kind discriminant plus the per-kind field set, serialized with an
/// internal "kind" tag so stored metadata stays a flat JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentDetails {
    Story,
    Feedback,
    Event(EventDetails),
}

impl ContentDetails {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentDetails::Story => ContentKind::Story,
            ContentDetails::Feedback => ContentKind::Feedback,
            ContentDetails::Event(_) => ContentKind::Event,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContentMetadata {
    /// Display name captured at submission time; deliberately NOT refreshed
    /// if the account later renames itself.
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub details: ContentDetails,
}

#[derive(Debug, Serialize, Clone)]
pub struct FullContentItem {
    pub id: String,
    pub status: ModerationStatus,
    pub metadata: ContentMetadata,
    pub body: String,
}

#[derive(Serialize, Clone)]
pub struct ContentSummary {
    pub id: String,
    pub metadata: ContentMetadata,
}

#[derive(Debug, Serialize)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login_time: Option<String>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Serialize)]
pub struct Mentor {
    pub id: i32,
    pub name: String,
    pub title: String,
    pub bio: String,
    pub contact_email: String,
    pub photo: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub mentor_id: i32,
    pub requester_id: i32,
    pub requested_for: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaAttachment {
    pub id: String,
    pub file_path: String,
    pub file_format: String,
    pub original_filename: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Mutations a caller can attempt on someone's content item.
pub enum ContentAction {
    Edit,
    Delete,
}

pub mod db_operations;
