//! Catalog entity models
//!
//! Plain data types for the in-memory tables. Every entity carries an
//! [`Audit`] block; tags, tag categories and papers also carry an
//! [`Approval`](crate::approval::Approval).

pub use paper::{
    Paper, PaperAuthor, PaperAuthorId, PaperCitation, PaperCitationId, PaperFile, PaperFileId,
    PaperId, PaperLink, PaperLinkId,
};
pub use tag::{Tag, TagAlias, TagAliasId, TagCategory, TagCategoryId, TagId};
pub use user::{User, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares an `i64` primary key newtype
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

mod paper;
mod tag;
mod user;

/// Creation/update metadata set on every write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
}

impl Audit {
    /// Metadata for a freshly created row
    pub fn created(actor: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: None,
        }
    }

    /// Record an update by `actor`
    pub fn touch(&mut self, actor: Option<UserId>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor;
    }

    /// Drop references to a deleted user
    pub fn forget_user(&mut self, user: UserId) {
        if self.created_by == Some(user) {
            self.created_by = None;
        }
        if self.updated_by == Some(user) {
            self.updated_by = None;
        }
    }
}
