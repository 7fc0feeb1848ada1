//! User entity

use super::{Audit, PaperId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

entity_id!(
    /// Primary key of a user
    UserId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Unique login name
    pub username: String,

    pub email: Option<String>,

    /// Whether the user can use the curation tools
    pub is_staff: bool,

    /// Inactive users are kept instead of deleted
    pub is_active: bool,

    pub date_joined: DateTime<Utc>,

    pub favourite_papers: Vec<PaperId>,

    pub audit: Audit,
}

impl User {
    pub fn new(id: UserId, username: String, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            email,
            is_staff: false,
            is_active: true,
            date_joined: now,
            favourite_papers: Vec::new(),
            audit: Audit::created(None, now),
        }
    }
}
