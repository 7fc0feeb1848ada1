//! End-to-end catalog workflow through the public API

use chrono::NaiveDate;
use papershelf_common::{
    approval::{Approvable, ApprovalStatus},
    config::DoiConfig,
    db::models::{PaperId, TagId, UserId},
    errors::{AppError, ErrorCode},
    forms::*,
    inference::InferenceOutcome,
    tags, CatalogService, Repository,
};

fn service() -> (CatalogService, UserId) {
    let mut service = CatalogService::new(Repository::default(), &DoiConfig::default());
    let user = service
        .register_user(UserForm {
            username: "editor@papershelf".into(),
            email: Some("editor@PaperShelf.org".into()),
            is_staff: true,
        })
        .unwrap();
    (service, user)
}

fn tag(service: &mut CatalogService, user: UserId, name: &str, inferred: Vec<TagId>) -> TagId {
    service
        .create_tag(
            TagForm {
                name: name.into(),
                inferred_tags: inferred,
                ..Default::default()
            },
            user,
        )
        .unwrap()
}

fn paper(title: &str, doi: Option<&str>, tags: Vec<TagId>) -> PaperForm {
    PaperForm {
        title: title.into(),
        abstract_text: "abstract".into(),
        doi: doi.map(str::to_string),
        publication_date: NaiveDate::from_ymd_opt(2012, 9, 30).unwrap(),
        authors: vec![],
        tags,
    }
}

fn tag_names(service: &CatalogService, paper: PaperId) -> Vec<String> {
    service
        .repository()
        .paper_tags(paper)
        .unwrap()
        .iter()
        .map(|t| t.name.clone())
        .collect()
}

#[test]
fn test_inference_through_chain_and_branch() {
    let (mut service, user) = service();
    let t3 = tag(&mut service, user, "t3", vec![]);
    let t4 = tag(&mut service, user, "t4", vec![]);
    let t2 = tag(&mut service, user, "t2", vec![t3]);
    let t1 = tag(&mut service, user, "t1", vec![t2, t4]);

    let id = service.create_paper(paper("AlexNet", None, vec![t1]), user).unwrap();

    assert_eq!(tag_names(&service, id), vec!["t1", "t2", "t3", "t4"]);
}

#[test]
fn test_stored_cycle_is_tolerated_at_runtime() {
    let (mut service, user) = service();
    let a = tag(&mut service, user, "a", vec![]);
    let b = tag(&mut service, user, "b", vec![a]);
    // Written below the form layer, as data loaded from elsewhere would be
    let mut repo = service.into_repository();
    repo.set_inferred_tags(a, vec![b], None).unwrap();
    let mut service = CatalogService::new(repo, &DoiConfig::default());

    let closure: Vec<TagId> = tags::closure(service.repository(), [a]).iter().map(|t| t.id).collect();
    assert_eq!(closure, vec![a, b]);

    let id = service.create_paper(paper("Cyclic", None, vec![a]), user).unwrap();
    assert_eq!(tag_names(&service, id), vec!["a", "b"]);
    assert_eq!(
        service.add_tags_to_paper(id, &[b], user).unwrap(),
        InferenceOutcome::Unchanged
    );
}

#[test]
fn test_closed_tag_set_leaves_paper_untouched() {
    let (mut service, user) = service();
    let base = tag(&mut service, user, "base", vec![]);
    let derived = tag(&mut service, user, "derived", vec![base]);
    let id = service.create_paper(paper("P", None, vec![derived, base]), user).unwrap();
    let before = service.repository().find_paper(id).unwrap().audit.clone();

    let outcome = service.add_tags_to_paper(id, &[base], user).unwrap();

    assert_eq!(outcome, InferenceOutcome::Unchanged);
    assert_eq!(service.repository().find_paper(id).unwrap().audit, before);
}

#[test]
fn test_doi_normalized_and_unique() {
    let (mut service, user) = service();
    let id = service
        .create_paper(paper("A", Some("  https://dx.doi.org/10.1145/2347736.2347755 "), vec![]), user)
        .unwrap();
    assert_eq!(
        service.repository().find_paper(id).unwrap().doi.as_deref(),
        Some("10.1145/2347736.2347755")
    );

    let err = service
        .create_paper(paper("B", Some("DOI:10.1145/2347736.2347755"), vec![]), user)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.field(), Some("doi"));

    let err = service
        .create_paper(paper("C", Some("doi.org/not-a-doi"), vec![]), user)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);
    assert!(err.to_response().error.message.contains("10.1000/xyz123"));
}

#[test]
fn test_alias_and_tag_names_never_collide() {
    let (mut service, user) = service();
    let ml = tag(&mut service, user, "machine-learning", vec![]);
    service
        .create_alias(TagAliasForm { name: "ml".into(), tag: ml }, user)
        .unwrap();

    let err = service
        .create_tag(TagForm { name: "ml".into(), ..Default::default() }, user)
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { .. }));

    let err = service
        .create_alias(TagAliasForm { name: "machine-learning".into(), tag: ml }, user)
        .unwrap_err();
    assert!(err.is_recoverable());
}

#[test]
fn test_cycle_prevention_on_edit() {
    let (mut service, user) = service();
    let a = tag(&mut service, user, "a", vec![]);
    let b = tag(&mut service, user, "b", vec![a]);
    let c = tag(&mut service, user, "c", vec![b]);

    let err = service
        .update_tag(a, TagForm { name: "a".into(), inferred_tags: vec![c], ..Default::default() }, user)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InferenceCycle);

    let err = service
        .update_tag(a, TagForm { name: "a".into(), inferred_tags: vec![a], ..Default::default() }, user)
        .unwrap_err();
    assert_eq!(err.field(), Some("inferred_tags"));
}

#[test]
fn test_approval_workflow() {
    let (mut service, user) = service();
    let p1 = service.create_paper(paper("One", None, vec![]), user).unwrap();
    let p2 = service.create_paper(paper("Two", None, vec![]), user).unwrap();
    let p3 = service.create_paper(paper("Three", None, vec![]), user).unwrap();
    assert_eq!(service.repository().pending_papers().len(), 3);

    assert_eq!(service.approve_papers(&[p1, p2], user), 2);
    assert_eq!(service.reject_papers(&[p3]), 1);

    let repo = service.repository();
    assert_eq!(repo.approved_papers().len(), 2);
    assert!(repo.pending_papers().is_empty());
    assert!(repo.find_paper(p3).is_none());
    assert_eq!(repo.find_paper(p1).unwrap().approval.approver, Some(user));

    // Approved is terminal
    service.set_paper_status(p1, ApprovalStatus::Pending, user).unwrap();
    assert!(service.repository().find_paper(p1).unwrap().is_approved());
}

#[test]
fn test_deleting_user_keeps_their_work() {
    let (mut service, user) = service();
    let t = tag(&mut service, user, "kept", vec![]);
    let p = service.create_paper(paper("Kept", None, vec![t]), user).unwrap();
    service.approve_tags(&[t], user);
    service.add_favourite(user, p).unwrap();

    service.delete_user(user).unwrap();

    let repo = service.repository();
    let t = repo.find_tag(t).unwrap();
    assert_eq!(t.audit.created_by, None);
    assert_eq!(t.approval.approver, None);
    assert_eq!(repo.find_paper(p).unwrap().audit.created_by, None);
    assert!(matches!(
        service.delete_user(user).unwrap_err(),
        AppError::UserNotFound { .. }
    ));
}

#[test]
fn test_rejecting_category_removes_its_tags_from_papers() {
    let (mut service, user) = service();
    let category = service
        .create_category(TagCategoryForm { name: "topic".into() }, user)
        .unwrap();
    let t = service
        .create_tag(
            TagForm {
                name: "graphs".into(),
                category: Some(category),
                ..Default::default()
            },
            user,
        )
        .unwrap();
    let p = service.create_paper(paper("G", None, vec![t]), user).unwrap();

    assert_eq!(service.reject_categories(&[category]), 1);

    assert!(service.repository().find_tag(t).is_none());
    assert!(tag_names(&service, p).is_empty());
}
