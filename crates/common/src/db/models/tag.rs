//! Tag, tag category and tag alias entities

use super::{Audit, UserId};
use crate::approval::{Approvable, Approval};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

entity_id!(
    /// Primary key of a tag
    TagId
);
entity_id!(TagCategoryId);
entity_id!(TagAliasId);

/// Grouping for tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategory {
    pub id: TagCategoryId,

    /// Unique category name
    pub name: String,

    pub approval: Approval,

    pub audit: Audit,
}

impl TagCategory {
    pub fn new(id: TagCategoryId, name: String, actor: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            approval: Approval::default(),
            audit: Audit::created(actor, now),
        }
    }
}

/// A tag attached to papers.
///
/// `inferred_tags` are directed edges: tagging a paper with this tag also
/// tags it with every tag reachable through them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,

    /// Unique tag name
    pub name: String,

    pub category: Option<TagCategoryId>,

    pub description: String,

    /// Ordered, duplicate-free
    pub inferred_tags: Vec<TagId>,

    pub approval: Approval,

    pub audit: Audit,
}

impl Tag {
    pub fn new(id: TagId, name: String, actor: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            category: None,
            description: String::new(),
            inferred_tags: Vec::new(),
            approval: Approval::default(),
            audit: Audit::created(actor, now),
        }
    }

    /// Replace the inferred edges, dropping repeats while keeping order
    pub fn set_inferred_tags(&mut self, tags: impl IntoIterator<Item = TagId>) {
        self.inferred_tags.clear();
        for tag in tags {
            if !self.inferred_tags.contains(&tag) {
                self.inferred_tags.push(tag);
            }
        }
    }
}

/// Alternate name for exactly one tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAlias {
    pub id: TagAliasId,

    /// Must be unique among tags and aliases
    pub name: String,

    pub tag: TagId,

    pub audit: Audit,
}

impl Approvable for TagCategory {
    type Id = TagCategoryId;
    const KIND: &'static str = "tag_category";

    fn id(&self) -> TagCategoryId {
        self.id
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}

impl Approvable for Tag {
    type Id = TagId;
    const KIND: &'static str = "tag";

    fn id(&self) -> TagId {
        self.id
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}
