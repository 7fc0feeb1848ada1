//! Storage layer for Papershelf
//!
//! Provides:
//! - Entity models
//! - In-memory tables with a shared id sequence
//! - Repository pattern for data access

pub mod models;
mod repository;

pub use repository::{NewPaper, NewTag, Repository};

use models::*;
use std::collections::BTreeMap;

/// In-memory tables.
///
/// `BTreeMap` keyed by id keeps every table in creation order, since ids come
/// from one increasing sequence.
#[derive(Debug, Default, Clone)]
pub struct Database {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) tag_categories: BTreeMap<TagCategoryId, TagCategory>,
    pub(crate) tags: BTreeMap<TagId, Tag>,
    pub(crate) tag_aliases: BTreeMap<TagAliasId, TagAlias>,
    pub(crate) paper_authors: BTreeMap<PaperAuthorId, PaperAuthor>,
    pub(crate) papers: BTreeMap<PaperId, Paper>,
    pub(crate) paper_links: BTreeMap<PaperLinkId, PaperLink>,
    pub(crate) paper_citations: BTreeMap<PaperCitationId, PaperCitation>,
    pub(crate) paper_files: BTreeMap<PaperFileId, PaperFile>,
    sequence: i64,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next primary key value
    pub(crate) fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// Row counts per table, for reporting
    pub fn table_sizes(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("users", self.users.len()),
            ("tag_categories", self.tag_categories.len()),
            ("tags", self.tags.len()),
            ("tag_aliases", self.tag_aliases.len()),
            ("paper_authors", self.paper_authors.len()),
            ("papers", self.papers.len()),
            ("paper_links", self.paper_links.len()),
            ("paper_citations", self.paper_citations.len()),
            ("paper_files", self.paper_files.len()),
        ])
    }
}
