//! Repository pattern for catalog data
//!
//! Provides a single interface for every data access operation. Uniqueness
//! rules and cascading deletes live here so that every write path gets them.
//! Tag inference is not triggered from here; see [`crate::inference`].

use crate::approval::{self, Approvable, ApprovalStatus};
use crate::db::models::*;
use crate::db::Database;
use crate::doi::normalize_optional_doi;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::tags::TagGraph;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Fields for creating or replacing a paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaper {
    pub title: String,
    pub abstract_text: String,
    pub doi: Option<String>,
    pub publication_date: NaiveDate,
    pub authors: Vec<PaperAuthorId>,
    pub tags: Vec<TagId>,
}

/// Fields for creating or replacing a tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub category: Option<TagCategoryId>,
    pub description: String,
    pub inferred_tags: Vec<TagId>,
}

/// Repository for data access operations
#[derive(Debug, Default, Clone)]
pub struct Repository {
    db: Database,
}

impl Repository {
    /// Create a new repository over the given tables
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Read-only view of the tables
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user with a unique username
    pub fn create_user(
        &mut self,
        username: String,
        email: Option<String>,
        is_staff: bool,
    ) -> Result<UserId> {
        if self.find_user_by_username(&username).is_some() {
            return Err(AppError::duplicate(
                "username",
                "A user with that username already exists.",
            ));
        }

        let id = UserId(self.db.next_id());
        let mut user = User::new(id, username, email, Self::now());
        user.is_staff = is_staff;
        self.db.users.insert(id, user);
        Ok(id)
    }

    pub fn find_user(&self, id: UserId) -> Option<&User> {
        self.db.users.get(&id)
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<&User> {
        self.db.users.values().find(|u| u.username == username)
    }

    /// Delete a user. Audit and approver references to it become empty.
    pub fn delete_user(&mut self, id: UserId) -> bool {
        if self.db.users.remove(&id).is_none() {
            return false;
        }

        let db = &mut self.db;
        for user in db.users.values_mut() {
            user.audit.forget_user(id);
        }
        for category in db.tag_categories.values_mut() {
            category.audit.forget_user(id);
            forget_approver(&mut category.approval, id);
        }
        for tag in db.tags.values_mut() {
            tag.audit.forget_user(id);
            forget_approver(&mut tag.approval, id);
        }
        for alias in db.tag_aliases.values_mut() {
            alias.audit.forget_user(id);
        }
        for author in db.paper_authors.values_mut() {
            author.audit.forget_user(id);
        }
        for paper in db.papers.values_mut() {
            paper.audit.forget_user(id);
            forget_approver(&mut paper.approval, id);
        }
        for link in db.paper_links.values_mut() {
            link.audit.forget_user(id);
        }
        for citation in db.paper_citations.values_mut() {
            citation.audit.forget_user(id);
        }
        for file in db.paper_files.values_mut() {
            file.audit.forget_user(id);
        }

        info!(user_id = %id, "User deleted");
        true
    }

    /// Mark a paper as one of the user's favourites
    pub fn add_favourite(&mut self, user: UserId, paper: PaperId) -> Result<()> {
        if !self.db.papers.contains_key(&paper) {
            return Err(AppError::PaperNotFound { id: paper.to_string() });
        }
        let user = self
            .db
            .users
            .get_mut(&user)
            .ok_or_else(|| AppError::UserNotFound { id: user.to_string() })?;

        if !user.favourite_papers.contains(&paper) {
            user.favourite_papers.push(paper);
        }
        Ok(())
    }

    // ========================================================================
    // Tag Category Operations
    // ========================================================================

    pub fn create_category(&mut self, name: String, actor: Option<UserId>) -> Result<TagCategoryId> {
        if self.db.tag_categories.values().any(|c| c.name == name) {
            return Err(AppError::duplicate(
                "name",
                "A tag category with this name already exists.",
            ));
        }

        let id = TagCategoryId(self.db.next_id());
        self.db
            .tag_categories
            .insert(id, TagCategory::new(id, name, actor, Self::now()));
        Ok(id)
    }

    pub fn find_category(&self, id: TagCategoryId) -> Option<&TagCategory> {
        self.db.tag_categories.get(&id)
    }

    pub fn find_category_by_name(&self, name: &str) -> Option<&TagCategory> {
        self.db.tag_categories.values().find(|c| c.name == name)
    }

    pub fn list_categories(&self) -> Vec<&TagCategory> {
        self.db.tag_categories.values().collect()
    }

    /// Delete a category together with every tag in it
    pub fn delete_category(&mut self, id: TagCategoryId) -> bool {
        if self.db.tag_categories.remove(&id).is_none() {
            return false;
        }

        let tags: Vec<TagId> = self
            .db
            .tags
            .values()
            .filter(|t| t.category == Some(id))
            .map(|t| t.id)
            .collect();
        for tag in &tags {
            self.delete_tag(*tag);
        }

        info!(category_id = %id, cascaded_tags = tags.len(), "Tag category deleted");
        true
    }

    // ========================================================================
    // Tag Operations
    // ========================================================================

    /// Check `name` can be used by the tag `editing` (or a new tag)
    pub fn check_tag_name(&self, name: &str, editing: Option<TagId>) -> Result<()> {
        if self
            .db
            .tags
            .values()
            .any(|t| t.name == name && Some(t.id) != editing)
        {
            return Err(AppError::duplicate("name", "A tag with this name already exists."));
        }
        if self.db.tag_aliases.values().any(|a| a.name == name) {
            return Err(AppError::duplicate(
                "name",
                "A tag alias with this name already exists.",
            ));
        }
        Ok(())
    }

    fn check_tag_refs(&self, tag: &NewTag) -> Result<()> {
        if let Some(category) = tag.category {
            if !self.db.tag_categories.contains_key(&category) {
                return Err(AppError::NotFound {
                    resource_type: "tag_category".to_string(),
                    id: category.to_string(),
                });
            }
        }
        self.check_tags_exist(&tag.inferred_tags)
    }

    fn check_tags_exist(&self, tags: &[TagId]) -> Result<()> {
        match tags.iter().find(|t| !self.db.tags.contains_key(*t)) {
            Some(missing) => Err(AppError::TagNotFound { id: missing.to_string() }),
            None => Ok(()),
        }
    }

    /// Create a tag
    pub fn create_tag(&mut self, new: NewTag, actor: Option<UserId>) -> Result<TagId> {
        self.check_tag_name(&new.name, None)?;
        self.check_tag_refs(&new)?;

        let id = TagId(self.db.next_id());
        let mut tag = Tag::new(id, new.name, actor, Self::now());
        tag.category = new.category;
        tag.description = new.description;
        tag.set_inferred_tags(new.inferred_tags);

        debug!(tag_id = %id, name = %tag.name, "Tag created");
        self.db.tags.insert(id, tag);
        Ok(id)
    }

    /// Replace every editable field of a tag
    pub fn update_tag(&mut self, id: TagId, new: NewTag, actor: Option<UserId>) -> Result<()> {
        self.check_tag_name(&new.name, Some(id))?;
        self.check_tag_refs(&new)?;

        let tag = self
            .db
            .tags
            .get_mut(&id)
            .ok_or_else(|| AppError::TagNotFound { id: id.to_string() })?;
        tag.name = new.name;
        tag.category = new.category;
        tag.description = new.description;
        tag.set_inferred_tags(new.inferred_tags);
        tag.audit.touch(actor, Self::now());
        Ok(())
    }

    /// Replace only the inferred edges of a tag
    pub fn set_inferred_tags(
        &mut self,
        id: TagId,
        inferred: Vec<TagId>,
        actor: Option<UserId>,
    ) -> Result<()> {
        self.check_tags_exist(&inferred)?;

        let tag = self
            .db
            .tags
            .get_mut(&id)
            .ok_or_else(|| AppError::TagNotFound { id: id.to_string() })?;
        tag.set_inferred_tags(inferred);
        tag.audit.touch(actor, Self::now());
        Ok(())
    }

    pub fn find_tag(&self, id: TagId) -> Option<&Tag> {
        self.db.tags.get(&id)
    }

    pub fn find_tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.db.tags.values().find(|t| t.name == name)
    }

    /// Look a tag up by its name or one of its aliases
    pub fn resolve_tag(&self, name: &str) -> Option<&Tag> {
        self.find_tag_by_name(name).or_else(|| {
            self.db
                .tag_aliases
                .values()
                .find(|a| a.name == name)
                .and_then(|a| self.db.tags.get(&a.tag))
        })
    }

    pub fn list_tags(&self) -> Vec<&Tag> {
        self.db.tags.values().collect()
    }

    /// Delete a tag, its aliases, and every edge and paper link pointing at it
    pub fn delete_tag(&mut self, id: TagId) -> bool {
        if self.db.tags.remove(&id).is_none() {
            return false;
        }

        self.db.tag_aliases.retain(|_, alias| alias.tag != id);
        for tag in self.db.tags.values_mut() {
            tag.inferred_tags.retain(|t| *t != id);
        }
        for paper in self.db.papers.values_mut() {
            paper.tags.retain(|t| *t != id);
        }

        debug!(tag_id = %id, "Tag deleted");
        true
    }

    // ========================================================================
    // Tag Alias Operations
    // ========================================================================

    /// Check the alias invariants for `name` pointing at `tag`
    pub fn check_alias_name(&self, name: &str, tag: TagId) -> Result<()> {
        let target = self
            .db
            .tags
            .get(&tag)
            .ok_or_else(|| AppError::TagNotFound { id: tag.to_string() })?;

        if target.name == name {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "An alias cannot be the same as the tag it is aliasing.".to_string(),
            });
        }
        if self.find_tag_by_name(name).is_some() {
            return Err(AppError::duplicate("name", "A tag with this name already exists."));
        }
        if self.db.tag_aliases.values().any(|a| a.name == name) {
            return Err(AppError::duplicate(
                "name",
                "A tag alias with this name already exists.",
            ));
        }
        Ok(())
    }

    pub fn create_alias(
        &mut self,
        name: String,
        tag: TagId,
        actor: Option<UserId>,
    ) -> Result<TagAliasId> {
        self.check_alias_name(&name, tag)?;

        let id = TagAliasId(self.db.next_id());
        self.db.tag_aliases.insert(
            id,
            TagAlias {
                id,
                name,
                tag,
                audit: Audit::created(actor, Self::now()),
            },
        );
        Ok(id)
    }

    pub fn aliases_of(&self, tag: TagId) -> Vec<&TagAlias> {
        self.db.tag_aliases.values().filter(|a| a.tag == tag).collect()
    }

    pub fn delete_alias(&mut self, id: TagAliasId) -> bool {
        self.db.tag_aliases.remove(&id).is_some()
    }

    // ========================================================================
    // Author Operations
    // ========================================================================

    pub fn create_author(&mut self, name: String, actor: Option<UserId>) -> PaperAuthorId {
        let id = PaperAuthorId(self.db.next_id());
        self.db.paper_authors.insert(
            id,
            PaperAuthor {
                id,
                name,
                audit: Audit::created(actor, Self::now()),
            },
        );
        id
    }

    pub fn find_author(&self, id: PaperAuthorId) -> Option<&PaperAuthor> {
        self.db.paper_authors.get(&id)
    }

    pub fn find_author_by_name(&self, name: &str) -> Option<&PaperAuthor> {
        self.db.paper_authors.values().find(|a| a.name == name)
    }

    pub fn list_authors(&self) -> Vec<&PaperAuthor> {
        self.db.paper_authors.values().collect()
    }

    /// Delete an author and drop it from every paper's author list
    pub fn delete_author(&mut self, id: PaperAuthorId) -> bool {
        if self.db.paper_authors.remove(&id).is_none() {
            return false;
        }
        for paper in self.db.papers.values_mut() {
            paper.authors.retain(|a| *a != id);
        }
        true
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    fn check_paper(&self, paper: &NewPaper, editing: Option<PaperId>) -> Result<()> {
        if let Some(ref doi) = paper.doi {
            if self
                .db
                .papers
                .values()
                .any(|p| p.doi.as_deref() == Some(doi.as_str()) && Some(p.id) != editing)
            {
                return Err(AppError::duplicate("doi", "A paper with this DOI already exists."));
            }
        }

        if let Some(missing) = paper
            .authors
            .iter()
            .find(|a| !self.db.paper_authors.contains_key(*a))
        {
            return Err(AppError::NotFound {
                resource_type: "paper_author".to_string(),
                id: missing.to_string(),
            });
        }

        self.check_tags_exist(&paper.tags)
    }

    /// Insert a paper. The DOI is normalized right before the write.
    pub fn insert_paper(&mut self, mut new: NewPaper, actor: Option<UserId>) -> Result<PaperId> {
        new.doi = normalize_optional_doi(new.doi.as_deref());
        self.check_paper(&new, None)?;

        let id = PaperId(self.db.next_id());
        let mut paper = Paper {
            id,
            title: new.title,
            abstract_text: new.abstract_text,
            doi: new.doi,
            publication_date: new.publication_date,
            authors: Vec::new(),
            tags: Vec::new(),
            approval: Default::default(),
            audit: Audit::created(actor, Self::now()),
        };
        for author in new.authors {
            if !paper.authors.contains(&author) {
                paper.authors.push(author);
            }
        }
        paper.add_tags(new.tags);

        debug!(paper_id = %id, doi = ?paper.doi, "Paper inserted");
        self.db.papers.insert(id, paper);
        Ok(id)
    }

    /// Replace every editable field of a paper, including its tag set
    pub fn update_paper(&mut self, id: PaperId, mut new: NewPaper, actor: Option<UserId>) -> Result<()> {
        new.doi = normalize_optional_doi(new.doi.as_deref());
        self.check_paper(&new, Some(id))?;

        let paper = self
            .db
            .papers
            .get_mut(&id)
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;
        paper.title = new.title;
        paper.abstract_text = new.abstract_text;
        paper.doi = new.doi;
        paper.publication_date = new.publication_date;
        paper.authors.clear();
        for author in new.authors {
            if !paper.authors.contains(&author) {
                paper.authors.push(author);
            }
        }
        paper.tags.clear();
        paper.add_tags(new.tags);
        paper.audit.touch(actor, Self::now());
        Ok(())
    }

    pub fn find_paper(&self, id: PaperId) -> Option<&Paper> {
        self.db.papers.get(&id)
    }

    pub fn find_paper_by_doi(&self, doi: &str) -> Option<&Paper> {
        let doi = crate::doi::normalize_doi(doi);
        self.db.papers.values().find(|p| p.doi.as_deref() == Some(doi.as_str()))
    }

    /// All papers, most recently published first
    pub fn list_papers(&self) -> Vec<&Paper> {
        let mut papers: Vec<&Paper> = self.db.papers.values().collect();
        papers.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
        papers
    }

    /// Papers tagged with any of `names`, each paper once
    pub fn papers_with_tags(&self, names: &[&str]) -> Vec<&Paper> {
        let wanted: HashSet<TagId> = self
            .db
            .tags
            .values()
            .filter(|t| names.contains(&t.name.as_str()))
            .map(|t| t.id)
            .collect();

        self.list_papers()
            .into_iter()
            .filter(|p| p.tags.iter().any(|t| wanted.contains(t)))
            .collect()
    }

    /// Tags currently on a paper
    pub fn paper_tags(&self, id: PaperId) -> Result<Vec<&Tag>> {
        let paper = self
            .find_paper(id)
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;
        Ok(paper.tags.iter().filter_map(|t| self.db.tags.get(t)).collect())
    }

    /// Union `tags` into a paper's tag set. Returns the tags actually added.
    ///
    /// This is the raw relation write: callers run
    /// [`crate::inference::infer_paper_tags`] afterwards.
    pub fn add_paper_tags(
        &mut self,
        id: PaperId,
        tags: &[TagId],
        actor: Option<UserId>,
    ) -> Result<Vec<TagId>> {
        self.check_tags_exist(tags)?;
        let paper = self
            .db
            .papers
            .get_mut(&id)
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;

        let added = paper.add_tags(tags.iter().copied());
        if !added.is_empty() {
            paper.audit.touch(actor, Self::now());
        }
        Ok(added)
    }

    /// Delete a paper with its links, citations and files
    pub fn delete_paper(&mut self, id: PaperId) -> bool {
        if self.db.papers.remove(&id).is_none() {
            return false;
        }

        self.db.paper_links.retain(|_, l| l.paper != id);
        self.db.paper_citations.retain(|_, c| c.paper != id);
        self.db.paper_files.retain(|_, f| f.paper != id);
        for user in self.db.users.values_mut() {
            user.favourite_papers.retain(|p| *p != id);
        }

        debug!(paper_id = %id, "Paper deleted");
        true
    }

    // ========================================================================
    // Paper Attachment Operations
    // ========================================================================

    fn require_paper(&self, id: PaperId) -> Result<()> {
        if self.db.papers.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::PaperNotFound { id: id.to_string() })
        }
    }

    pub fn add_link(&mut self, paper: PaperId, url: String, actor: Option<UserId>) -> Result<PaperLinkId> {
        self.require_paper(paper)?;
        let id = PaperLinkId(self.db.next_id());
        self.db.paper_links.insert(
            id,
            PaperLink {
                id,
                paper,
                url,
                audit: Audit::created(actor, Self::now()),
            },
        );
        Ok(id)
    }

    pub fn add_citation(
        &mut self,
        paper: PaperId,
        citation: String,
        actor: Option<UserId>,
    ) -> Result<PaperCitationId> {
        self.require_paper(paper)?;
        let id = PaperCitationId(self.db.next_id());
        self.db.paper_citations.insert(
            id,
            PaperCitation {
                id,
                paper,
                citation,
                audit: Audit::created(actor, Self::now()),
            },
        );
        Ok(id)
    }

    pub fn add_file(
        &mut self,
        paper: PaperId,
        file: String,
        sensitive: bool,
        actor: Option<UserId>,
    ) -> Result<PaperFileId> {
        self.require_paper(paper)?;
        let id = PaperFileId(self.db.next_id());
        self.db
            .paper_files
            .insert(id, PaperFile::new(id, paper, file, sensitive, actor, Self::now()));
        Ok(id)
    }

    pub fn links_of(&self, paper: PaperId) -> Vec<&PaperLink> {
        self.db.paper_links.values().filter(|l| l.paper == paper).collect()
    }

    pub fn citations_of(&self, paper: PaperId) -> Vec<&PaperCitation> {
        self.db.paper_citations.values().filter(|c| c.paper == paper).collect()
    }

    pub fn files_of(&self, paper: PaperId) -> Vec<&PaperFile> {
        self.db.paper_files.values().filter(|f| f.paper == paper).collect()
    }

    pub fn sensitive_files(&self, paper: PaperId) -> Vec<&PaperFile> {
        self.files_of(paper).into_iter().filter(|f| f.sensitive).collect()
    }

    pub fn public_files(&self, paper: PaperId) -> Vec<&PaperFile> {
        self.files_of(paper).into_iter().filter(|f| !f.sensitive).collect()
    }

    // ========================================================================
    // Approval Operations
    // ========================================================================

    pub fn approve_tags(&mut self, ids: &[TagId], user: UserId) -> usize {
        approval::approve_all(self.db.tags.values_mut().filter(|t| ids.contains(&t.id)), user)
    }

    pub fn approve_categories(&mut self, ids: &[TagCategoryId], user: UserId) -> usize {
        approval::approve_all(
            self.db.tag_categories.values_mut().filter(|c| ids.contains(&c.id)),
            user,
        )
    }

    pub fn approve_papers(&mut self, ids: &[PaperId], user: UserId) -> usize {
        approval::approve_all(self.db.papers.values_mut().filter(|p| ids.contains(&p.id)), user)
    }

    /// Reject (delete) tags
    pub fn reject_tags(&mut self, ids: &[TagId]) -> usize {
        let count = ids.iter().filter(|id| self.delete_tag(**id)).count();
        record_rejected(Tag::KIND, count);
        count
    }

    /// Reject (delete) categories, cascading to their tags
    pub fn reject_categories(&mut self, ids: &[TagCategoryId]) -> usize {
        let count = ids.iter().filter(|id| self.delete_category(**id)).count();
        record_rejected(TagCategory::KIND, count);
        count
    }

    /// Reject (delete) papers, cascading to their attachments
    pub fn reject_papers(&mut self, ids: &[PaperId]) -> usize {
        let count = ids.iter().filter(|id| self.delete_paper(**id)).count();
        record_rejected(Paper::KIND, count);
        count
    }

    /// Status chosen on an edit form; approving records `actor` as approver
    pub fn set_paper_status(&mut self, id: PaperId, status: ApprovalStatus, actor: UserId) -> Result<()> {
        let paper = self
            .db
            .papers
            .get_mut(&id)
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;
        paper.approval.set_status(status, actor);
        paper.audit.touch(Some(actor), Self::now());
        Ok(())
    }

    pub fn set_tag_status(&mut self, id: TagId, status: ApprovalStatus, actor: UserId) -> Result<()> {
        let tag = self
            .db
            .tags
            .get_mut(&id)
            .ok_or_else(|| AppError::TagNotFound { id: id.to_string() })?;
        tag.approval.set_status(status, actor);
        tag.audit.touch(Some(actor), Self::now());
        Ok(())
    }

    pub fn approved_tags(&self) -> Vec<&Tag> {
        approval::approved(self.db.tags.values()).collect()
    }

    pub fn pending_tags(&self) -> Vec<&Tag> {
        approval::pending(self.db.tags.values()).collect()
    }

    pub fn approved_categories(&self) -> Vec<&TagCategory> {
        approval::approved(self.db.tag_categories.values()).collect()
    }

    pub fn pending_categories(&self) -> Vec<&TagCategory> {
        approval::pending(self.db.tag_categories.values()).collect()
    }

    pub fn approved_papers(&self) -> Vec<&Paper> {
        approval::approved(self.list_papers()).collect()
    }

    pub fn pending_papers(&self) -> Vec<&Paper> {
        approval::pending(self.list_papers()).collect()
    }
}

impl TagGraph for Repository {
    fn tag(&self, id: TagId) -> Option<&Tag> {
        self.db.tags.get(&id)
    }
}

fn forget_approver(approval: &mut crate::approval::Approval, user: UserId) {
    if approval.approver == Some(user) {
        approval.approver = None;
    }
}

fn record_rejected(kind: &'static str, count: usize) {
    if count > 0 {
        info!(kind, count, "Entries rejected");
        metrics::record_rejection(kind, count);
    }
}
