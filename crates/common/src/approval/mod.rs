//! Approval workflow shared by tags, tag categories and papers
//!
//! Entities start out `pending`. Approving records the approving user and is
//! terminal; rejecting removes the entity outright instead of moving it to a
//! "rejected" state.

use crate::db::models::UserId;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Approval status of an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state carried by every approvable entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub status: ApprovalStatus,
    /// The user who approved this entry
    pub approver: Option<UserId>,
}

impl Approval {
    /// Move to `approved`, recording `user` as approver
    pub fn approve(&mut self, user: UserId) {
        self.status = ApprovalStatus::Approved;
        self.approver = Some(user);
    }

    /// Apply a status chosen on an edit form.
    ///
    /// Saving an approved status records `actor` as approver. Approved is
    /// terminal, so a request for `pending` on an approved entry is ignored.
    pub fn set_status(&mut self, status: ApprovalStatus, actor: UserId) {
        match status {
            ApprovalStatus::Approved => self.approve(actor),
            ApprovalStatus::Pending if self.status == ApprovalStatus::Approved => {}
            ApprovalStatus::Pending => self.status = ApprovalStatus::Pending,
        }
    }
}

/// Capability implemented by each entity with a pending/approved lifecycle
pub trait Approvable {
    type Id: Copy + Eq + std::fmt::Debug;

    /// Entity kind used in logs and metrics
    const KIND: &'static str;

    fn id(&self) -> Self::Id;
    fn approval(&self) -> &Approval;
    fn approval_mut(&mut self) -> &mut Approval;

    fn approve(&mut self, user: UserId) {
        self.approval_mut().approve(user);
    }

    fn is_approved(&self) -> bool {
        self.approval().status == ApprovalStatus::Approved
    }

    fn is_pending(&self) -> bool {
        self.approval().status == ApprovalStatus::Pending
    }
}

/// Approve every entity in `entities` on behalf of `user`.
///
/// Returns the number of entities touched.
pub fn approve_all<'a, T, I>(entities: I, user: UserId) -> usize
where
    T: Approvable + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    let mut count = 0;
    for entity in entities {
        entity.approve(user);
        count += 1;
    }

    if count > 0 {
        info!(kind = T::KIND, count, approver = %user, "Entries approved");
        crate::metrics::record_approval(T::KIND, count);
    }

    count
}

/// Remove the entities with the given ids from `collection`, returning them.
pub fn reject<T: Approvable>(collection: &mut Vec<T>, ids: &[T::Id]) -> Vec<T> {
    let mut rejected = Vec::new();
    let mut kept = Vec::with_capacity(collection.len());

    for entity in collection.drain(..) {
        if ids.contains(&entity.id()) {
            rejected.push(entity);
        } else {
            kept.push(entity);
        }
    }
    *collection = kept;

    if !rejected.is_empty() {
        info!(kind = T::KIND, count = rejected.len(), "Entries rejected");
        crate::metrics::record_rejection(T::KIND, rejected.len());
    }

    rejected
}

/// Only the approved entities
pub fn approved<'a, T, I>(entities: I) -> impl Iterator<Item = &'a T>
where
    T: Approvable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    entities.into_iter().filter(|e| e.is_approved())
}

/// Only the entities still awaiting approval
pub fn pending<'a, T, I>(entities: I) -> impl Iterator<Item = &'a T>
where
    T: Approvable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    entities.into_iter().filter(|e| e.is_pending())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{TagCategory, TagCategoryId};

    fn category(id: i64, name: &str) -> TagCategory {
        TagCategory::new(TagCategoryId(id), name.to_string(), None, chrono::Utc::now())
    }

    #[test]
    fn test_new_entities_are_pending() {
        let c = category(1, "methods");
        assert!(c.is_pending());
        assert!(!c.is_approved());
        assert_eq!(c.approval().approver, None);
    }

    #[test]
    fn test_bulk_approve() {
        let user = UserId(9);
        let mut items = vec![category(1, "a"), category(2, "b")];

        let count = approve_all(items.iter_mut(), user);

        assert_eq!(count, 2);
        for item in &items {
            assert_eq!(item.approval().status, ApprovalStatus::Approved);
            assert_eq!(item.approval().approver, Some(user));
        }
    }

    #[test]
    fn test_reject_removes_entities() {
        let mut items = vec![category(1, "a"), category(2, "b")];

        let rejected = reject(&mut items, &[TagCategoryId(1)]);

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].name, "a");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, TagCategoryId(2));
    }

    #[test]
    fn test_filters() {
        let mut items = vec![category(1, "a"), category(2, "b"), category(3, "c")];
        items[1].approve(UserId(1));

        let approved_names: Vec<_> = approved(&items).map(|c| c.name.as_str()).collect();
        let pending_names: Vec<_> = pending(&items).map(|c| c.name.as_str()).collect();

        assert_eq!(approved_names, vec!["b"]);
        assert_eq!(pending_names, vec!["a", "c"]);
    }

    #[test]
    fn test_set_status_records_approver() {
        let mut approval = Approval::default();
        approval.set_status(ApprovalStatus::Approved, UserId(4));
        assert_eq!(approval.approver, Some(UserId(4)));

        approval.set_status(ApprovalStatus::Pending, UserId(5));
        assert_eq!(approval.status, ApprovalStatus::Approved);
        assert_eq!(approval.approver, Some(UserId(4)));
    }
}
