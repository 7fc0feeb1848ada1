//! Input validation for catalog writes
//!
//! Every write goes through a form: the form is deserialized, cleaned
//! (normalization first, then field rules, then cross-record checks) and only
//! then turned into the value the repository stores. Every failure is a
//! field-level [`AppError`] and nothing is written.

use crate::db::models::{PaperAuthorId, TagCategoryId, TagId};
use crate::db::{NewPaper, NewTag, Repository};
use crate::doi::{normalize_optional_doi, validate_doi};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::tags::{traverse_inferred, TagGraph};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::warn;
use validator::{Validate, ValidationError};

/// Run the field rules of `form`, recording failures
fn validated<T: Validate>(form: &T) -> Result<()> {
    form.validate().map_err(|errors| rejected(AppError::from(errors)))
}

fn rejected(err: AppError) -> AppError {
    warn!(code = err.code().as_str(), field = ?err.field(), error = %err, "Form rejected");
    metrics::record_validation_failure(err.code().as_str());
    err
}

// ============================================================================
// Papers
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaperForm {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[validate(length(min = 1))]
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[validate(custom(function = "validate_doi"))]
    #[serde(default)]
    pub doi: Option<String>,

    pub publication_date: NaiveDate,

    #[serde(default)]
    pub authors: Vec<PaperAuthorId>,

    #[serde(default)]
    pub tags: Vec<TagId>,
}

impl PaperForm {
    /// Normalize the DOI, then validate every field
    pub fn clean(mut self) -> Result<NewPaper> {
        self.doi = normalize_optional_doi(self.doi.as_deref());
        validated(&self)?;

        Ok(NewPaper {
            title: self.title,
            abstract_text: self.abstract_text,
            doi: self.doi,
            publication_date: self.publication_date,
            authors: self.authors,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaperAuthorForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl PaperAuthorForm {
    pub fn clean(self) -> Result<String> {
        validated(&self)?;
        Ok(self.name)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaperLinkForm {
    #[validate(url)]
    pub url: String,
}

impl PaperLinkForm {
    pub fn clean(self) -> Result<String> {
        validated(&self)?;
        Ok(self.url)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaperCitationForm {
    #[validate(length(min = 1))]
    pub citation: String,
}

impl PaperCitationForm {
    pub fn clean(self) -> Result<String> {
        validated(&self)?;
        Ok(self.citation)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaperFileForm {
    #[validate(length(min = 1, max = 255))]
    pub file: String,

    #[serde(default = "default_sensitive")]
    pub sensitive: bool,
}

fn default_sensitive() -> bool {
    true
}

impl PaperFileForm {
    pub fn clean(self) -> Result<(String, bool)> {
        validated(&self)?;
        Ok((self.file, self.sensitive))
    }
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TagCategoryForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl TagCategoryForm {
    pub fn clean(self) -> Result<String> {
        validated(&self)?;
        Ok(self.name)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TagForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    pub category: Option<TagCategoryId>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub inferred_tags: Vec<TagId>,
}

impl TagForm {
    /// Validate the form for the tag `editing` (`None` for a new tag).
    ///
    /// Rejects an `inferred_tags` set from which the tag itself is reachable.
    pub fn clean<G: TagGraph + ?Sized>(self, graph: &G, editing: Option<TagId>) -> Result<NewTag> {
        validated(&self)?;

        let own_name = editing
            .and_then(|id| graph.tag(id))
            .map_or(self.name.as_str(), |tag| tag.name.as_str());

        let cycle = traverse_inferred(graph, self.inferred_tags.iter().copied())
            .any(|tag| Some(tag.id) == editing || tag.name == own_name);
        if cycle {
            return Err(rejected(AppError::InferenceCycle {
                tag: own_name.to_string(),
            }));
        }

        Ok(NewTag {
            name: self.name,
            category: self.category,
            description: self.description,
            inferred_tags: self.inferred_tags,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TagAliasForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub tag: TagId,
}

impl TagAliasForm {
    /// Validate the alias against the tags and aliases already stored
    pub fn clean(self, repo: &Repository) -> Result<(String, TagId)> {
        validated(&self)?;
        repo.check_alias_name(&self.name, self.tag).map_err(rejected)?;
        Ok((self.name, self.tag))
    }
}

// ============================================================================
// Users
// ============================================================================

/// Letters and digits in any script, plus `@ . + - _`
fn username_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"))
}

fn validate_username(value: &str) -> std::result::Result<(), ValidationError> {
    if username_pattern().is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some(Cow::Borrowed(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
        Err(err)
    }
}

/// Lower-case the domain part of an email address
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserForm {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub is_staff: bool,
}

/// A validated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanUser {
    pub username: String,
    pub email: Option<String>,
    pub is_staff: bool,
}

impl UserForm {
    pub fn clean(mut self) -> Result<CleanUser> {
        self.email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());
        validated(&self)?;

        Ok(CleanUser {
            username: self.username,
            email: self.email,
            is_staff: self.is_staff,
        })
    }
}
