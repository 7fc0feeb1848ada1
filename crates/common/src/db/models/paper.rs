//! Paper entity and the records attached to it

use super::{Audit, TagId, UserId};
use crate::approval::{Approvable, Approval};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

entity_id!(
    /// Primary key of a paper
    PaperId
);
entity_id!(PaperAuthorId);
entity_id!(PaperLinkId);
entity_id!(PaperCitationId);
entity_id!(PaperFileId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Canonical DOI (see [`crate::doi::normalize_doi`]), unique when present
    pub doi: Option<String>,

    pub publication_date: NaiveDate,

    pub authors: Vec<PaperAuthorId>,

    /// Ordered, duplicate-free
    pub tags: Vec<TagId>,

    pub approval: Approval,

    pub audit: Audit,
}

impl Paper {
    /// Resolver URL for this paper's DOI
    pub fn doi_url(&self, prefix: &str) -> Option<String> {
        crate::doi::doi_url(prefix, self.doi.as_deref())
    }

    /// Add tags not already present. Returns the ones actually added.
    pub fn add_tags(&mut self, tags: impl IntoIterator<Item = TagId>) -> Vec<TagId> {
        let mut added = Vec::new();
        for tag in tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
                added.push(tag);
            }
        }
        added
    }
}

impl Approvable for Paper {
    type Id = PaperId;
    const KIND: &'static str = "paper";

    fn id(&self) -> PaperId {
        self.id
    }

    fn approval(&self) -> &Approval {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut Approval {
        &mut self.approval
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperAuthor {
    pub id: PaperAuthorId,
    pub name: String,
    pub audit: Audit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperLink {
    pub id: PaperLinkId,
    pub paper: PaperId,
    pub url: String,
    pub audit: Audit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperCitation {
    pub id: PaperCitationId,
    pub paper: PaperId,
    pub citation: String,
    pub audit: Audit,
}

/// Uploaded file attached to a paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperFile {
    pub id: PaperFileId,
    pub paper: PaperId,

    /// Storage path of the file
    pub file: String,

    /// Sensitive files are hidden from the public listing
    pub sensitive: bool,

    pub audit: Audit,
}

impl PaperFile {
    pub fn new(
        id: PaperFileId,
        paper: PaperId,
        file: String,
        sensitive: bool,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            paper,
            file,
            sensitive,
            audit: Audit::created(actor, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(doi: Option<&str>) -> Paper {
        Paper {
            id: PaperId(1),
            title: "On Tags".into(),
            abstract_text: "...".into(),
            doi: doi.map(str::to_string),
            publication_date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            authors: vec![],
            tags: vec![],
            approval: Approval::default(),
            audit: Audit::created(None, Utc::now()),
        }
    }

    #[test]
    fn test_doi_url() {
        let p = paper(Some("10.1000/182"));
        assert_eq!(
            p.doi_url("https://doi.org/").as_deref(),
            Some("https://doi.org/10.1000/182")
        );
        assert_eq!(paper(None).doi_url("https://doi.org/"), None);
    }

    #[test]
    fn test_add_tags_is_set_like() {
        let mut p = paper(None);
        assert_eq!(p.add_tags([TagId(1), TagId(2)]), vec![TagId(1), TagId(2)]);
        assert_eq!(p.add_tags([TagId(2), TagId(3), TagId(3)]), vec![TagId(3)]);
        assert_eq!(p.tags, vec![TagId(1), TagId(2), TagId(3)]);
    }
}
