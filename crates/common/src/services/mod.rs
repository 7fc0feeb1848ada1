//! Catalog workflow
//!
//! `CatalogService` is the one write path used by the tools: it cleans the
//! submitted form, performs the repository write with audit stamping, and
//! runs tag inference after every write that can add tags to a paper.

use crate::approval::ApprovalStatus;
use crate::config::DoiConfig;
use crate::db::models::*;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::forms::*;
use crate::inference::{infer_paper_tags, InferenceOutcome};
use tracing::{info, instrument};

pub struct CatalogService {
    repo: Repository,
    doi_url_prefix: String,
}

impl CatalogService {
    pub fn new(repo: Repository, doi: &DoiConfig) -> Self {
        Self {
            repo,
            doi_url_prefix: doi.url_prefix.clone(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn into_repository(self) -> Repository {
        self.repo
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub fn register_user(&mut self, form: UserForm) -> Result<UserId> {
        let user = form.clean()?;
        let id = self.repo.create_user(user.username, user.email, user.is_staff)?;
        info!(user_id = %id, "User registered");
        Ok(id)
    }

    pub fn delete_user(&mut self, id: UserId) -> Result<()> {
        if self.repo.delete_user(id) {
            Ok(())
        } else {
            Err(AppError::UserNotFound { id: id.to_string() })
        }
    }

    pub fn add_favourite(&mut self, user: UserId, paper: PaperId) -> Result<()> {
        self.repo.add_favourite(user, paper)
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn create_category(&mut self, form: TagCategoryForm, actor: UserId) -> Result<TagCategoryId> {
        let name = form.clean()?;
        self.repo.create_category(name, Some(actor))
    }

    /// Create a tag. Name clashes are reported before any cycle.
    pub fn create_tag(&mut self, form: TagForm, actor: UserId) -> Result<TagId> {
        self.repo.check_tag_name(&form.name, None)?;
        let tag = form.clean(&self.repo, None)?;
        self.repo.create_tag(tag, Some(actor))
    }

    /// Edit a tag. A new inference set is checked for self-inference first.
    ///
    /// Papers already carrying the tag are not re-inferred.
    pub fn update_tag(&mut self, id: TagId, form: TagForm, actor: UserId) -> Result<()> {
        if self.repo.find_tag(id).is_none() {
            return Err(AppError::TagNotFound { id: id.to_string() });
        }
        self.repo.check_tag_name(&form.name, Some(id))?;
        let tag = form.clean(&self.repo, Some(id))?;
        self.repo.update_tag(id, tag, Some(actor))
    }

    pub fn create_alias(&mut self, form: TagAliasForm, actor: UserId) -> Result<TagAliasId> {
        let (name, tag) = form.clean(&self.repo)?;
        self.repo.create_alias(name, tag, Some(actor))
    }

    // ========================================================================
    // Papers
    // ========================================================================

    pub fn create_author(&mut self, form: PaperAuthorForm, actor: UserId) -> Result<PaperAuthorId> {
        let name = form.clean()?;
        Ok(self.repo.create_author(name, Some(actor)))
    }

    /// Create a paper and extend its tags to their inference closure
    #[instrument(skip(self, form), fields(title = %form.title))]
    pub fn create_paper(&mut self, form: PaperForm, actor: UserId) -> Result<PaperId> {
        let paper = form.clean()?;
        let id = self.repo.insert_paper(paper, Some(actor))?;
        infer_paper_tags(&mut self.repo, id, Some(actor))?;
        info!(paper_id = %id, "Paper created");
        Ok(id)
    }

    /// Replace a paper's fields and tags, then re-run inference
    pub fn update_paper(&mut self, id: PaperId, form: PaperForm, actor: UserId) -> Result<InferenceOutcome> {
        let paper = form.clean()?;
        self.repo.update_paper(id, paper, Some(actor))?;
        infer_paper_tags(&mut self.repo, id, Some(actor))
    }

    /// Add tags to a paper, then re-run inference
    pub fn add_tags_to_paper(
        &mut self,
        paper: PaperId,
        tags: &[TagId],
        actor: UserId,
    ) -> Result<InferenceOutcome> {
        self.repo.add_paper_tags(paper, tags, Some(actor))?;
        infer_paper_tags(&mut self.repo, paper, Some(actor))
    }

    pub fn add_link(&mut self, paper: PaperId, form: PaperLinkForm, actor: UserId) -> Result<PaperLinkId> {
        let url = form.clean()?;
        self.repo.add_link(paper, url, Some(actor))
    }

    pub fn add_citation(
        &mut self,
        paper: PaperId,
        form: PaperCitationForm,
        actor: UserId,
    ) -> Result<PaperCitationId> {
        let citation = form.clean()?;
        self.repo.add_citation(paper, citation, Some(actor))
    }

    pub fn add_file(&mut self, paper: PaperId, form: PaperFileForm, actor: UserId) -> Result<PaperFileId> {
        let (file, sensitive) = form.clean()?;
        self.repo.add_file(paper, file, sensitive, Some(actor))
    }

    /// Resolver URL of a paper's DOI under the configured prefix
    pub fn doi_url(&self, paper: PaperId) -> Result<Option<String>> {
        self.repo
            .find_paper(paper)
            .map(|p| p.doi_url(&self.doi_url_prefix))
            .ok_or_else(|| AppError::PaperNotFound { id: paper.to_string() })
    }

    // ========================================================================
    // Approval
    // ========================================================================

    pub fn approve_papers(&mut self, ids: &[PaperId], user: UserId) -> usize {
        self.repo.approve_papers(ids, user)
    }

    pub fn approve_tags(&mut self, ids: &[TagId], user: UserId) -> usize {
        self.repo.approve_tags(ids, user)
    }

    pub fn approve_categories(&mut self, ids: &[TagCategoryId], user: UserId) -> usize {
        self.repo.approve_categories(ids, user)
    }

    pub fn reject_papers(&mut self, ids: &[PaperId]) -> usize {
        self.repo.reject_papers(ids)
    }

    pub fn reject_tags(&mut self, ids: &[TagId]) -> usize {
        self.repo.reject_tags(ids)
    }

    pub fn reject_categories(&mut self, ids: &[TagCategoryId]) -> usize {
        self.repo.reject_categories(ids)
    }

    /// Save a status chosen on the paper edit form
    pub fn set_paper_status(&mut self, id: PaperId, status: ApprovalStatus, actor: UserId) -> Result<()> {
        self.repo.set_paper_status(id, status, actor)
    }

    /// Save a status chosen on the tag edit form
    pub fn set_tag_status(&mut self, id: TagId, status: ApprovalStatus, actor: UserId) -> Result<()> {
        self.repo.set_tag_status(id, status, actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn service() -> (CatalogService, UserId) {
        let mut service = CatalogService::new(Repository::default(), &DoiConfig::default());
        let user = service
            .register_user(UserForm {
                username: "curator".into(),
                email: None,
                is_staff: true,
            })
            .unwrap();
        (service, user)
    }

    fn tag_form(name: &str, inferred: Vec<TagId>) -> TagForm {
        TagForm {
            name: name.into(),
            inferred_tags: inferred,
            ..Default::default()
        }
    }

    fn paper_form(doi: Option<&str>, tags: Vec<TagId>) -> PaperForm {
        PaperForm {
            title: "Deep Residual Learning".into(),
            abstract_text: "abstract".into(),
            doi: doi.map(str::to_string),
            publication_date: NaiveDate::from_ymd_opt(2015, 12, 10).unwrap(),
            authors: vec![],
            tags,
        }
    }

    #[test]
    fn test_create_paper_infers_tags() {
        let (mut service, user) = service();
        let vision = service.create_tag(tag_form("vision", vec![]), user).unwrap();
        let cnn = service.create_tag(tag_form("cnn", vec![vision]), user).unwrap();

        let paper = service.create_paper(paper_form(None, vec![cnn]), user).unwrap();

        assert_eq!(service.repository().find_paper(paper).unwrap().tags, vec![cnn, vision]);
    }

    #[test]
    fn test_add_tags_runs_inference() {
        let (mut service, user) = service();
        let ai = service.create_tag(tag_form("ai", vec![]), user).unwrap();
        let ml = service.create_tag(tag_form("ml", vec![ai]), user).unwrap();
        let paper = service.create_paper(paper_form(None, vec![]), user).unwrap();

        let outcome = service.add_tags_to_paper(paper, &[ml], user).unwrap();

        assert_eq!(outcome, InferenceOutcome::Extended { added: vec![ai] });
        let again = service.add_tags_to_paper(paper, &[ml], user).unwrap();
        assert_eq!(again, InferenceOutcome::Unchanged);
    }

    #[test]
    fn test_update_tag_rejects_cycle() {
        let (mut service, user) = service();
        let a = service.create_tag(tag_form("a", vec![]), user).unwrap();
        let b = service.create_tag(tag_form("b", vec![a]), user).unwrap();

        let err = service.update_tag(a, tag_form("a", vec![b]), user).unwrap_err();

        assert!(matches!(err, AppError::InferenceCycle { .. }));
        assert!(service.repository().find_tag(a).unwrap().inferred_tags.is_empty());
    }

    #[test]
    fn test_reused_name_is_duplicate_not_cycle() {
        let (mut service, user) = service();
        let ml = service.create_tag(tag_form("ml", vec![]), user).unwrap();

        let err = service.create_tag(tag_form("ml", vec![ml]), user).unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));

        let other = service.create_tag(tag_form("ai", vec![]), user).unwrap();
        let err = service.update_tag(other, tag_form("ml", vec![ml]), user).unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }

    #[test]
    fn test_doi_url_uses_configured_prefix() {
        let mut service = CatalogService::new(
            Repository::default(),
            &DoiConfig {
                url_prefix: "https://dx.doi.org/".into(),
            },
        );
        let user = service
            .register_user(UserForm {
                username: "u".into(),
                email: None,
                is_staff: false,
            })
            .unwrap();

        let with = service.create_paper(paper_form(Some("doi:10.5555/12345678"), vec![]), user).unwrap();
        let mut form = paper_form(None, vec![]);
        form.title = "No DOI".into();
        let without = service.create_paper(form, user).unwrap();

        assert_eq!(
            service.doi_url(with).unwrap().as_deref(),
            Some("https://dx.doi.org/10.5555/12345678")
        );
        assert_eq!(service.doi_url(without).unwrap(), None);
    }

    #[test]
    fn test_rejected_form_writes_nothing() {
        let (mut service, user) = service();
        let before = service.repository().database().table_sizes();

        assert!(service.create_paper(paper_form(Some("not-a-doi"), vec![]), user).is_err());

        assert_eq!(service.repository().database().table_sizes(), before);
    }
}
