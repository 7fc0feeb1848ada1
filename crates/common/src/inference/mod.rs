//! Automatic tag inference on papers
//!
//! After any write that adds tags to a paper, the paper's tag set is extended
//! to its inference closure. A set that is already closed is left untouched,
//! so the write this performs can never trigger another round of work.

use crate::db::models::{PaperId, TagId, UserId};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::tags;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// What an inference run did to a paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InferenceOutcome {
    /// The tag set was already closed; nothing was written
    Unchanged,
    /// Tags were added, in discovery order
    Extended { added: Vec<TagId> },
}

impl InferenceOutcome {
    pub fn added(&self) -> &[TagId] {
        match self {
            InferenceOutcome::Unchanged => &[],
            InferenceOutcome::Extended { added } => added,
        }
    }
}

/// Extend a paper's tags to their inference closure.
///
/// Run this after every mutation that adds tags to `paper`.
pub fn infer_paper_tags(
    repo: &mut Repository,
    paper: PaperId,
    actor: Option<UserId>,
) -> Result<InferenceOutcome> {
    let current: Vec<TagId> = repo
        .find_paper(paper)
        .ok_or_else(|| AppError::PaperNotFound { id: paper.to_string() })?
        .tags
        .clone();

    let closure: Vec<TagId> = tags::closure(&*repo, current.iter().copied())
        .into_iter()
        .map(|t| t.id)
        .collect();

    let current: HashSet<TagId> = current.into_iter().collect();
    let closed: HashSet<TagId> = closure.iter().copied().collect();

    // Dangling ids on the paper never appear in the closure, so compare for
    // containment rather than equality.
    if closed.is_subset(&current) {
        debug!(paper_id = %paper, tags = current.len(), "Paper tags already closed");
        metrics::record_inference(closure.len(), 0);
        return Ok(InferenceOutcome::Unchanged);
    }

    let added = repo.add_paper_tags(paper, &closure, actor)?;
    metrics::record_inference(closure.len(), added.len());
    info!(
        paper_id = %paper,
        added = added.len(),
        total = current.len() + added.len(),
        "Inferred tags added to paper"
    );

    Ok(InferenceOutcome::Extended { added })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewPaper, NewTag};
    use chrono::NaiveDate;

    fn tag(repo: &mut Repository, name: &str, inferred: Vec<TagId>) -> TagId {
        repo.create_tag(
            NewTag {
                name: name.to_string(),
                inferred_tags: inferred,
                ..Default::default()
            },
            None,
        )
        .unwrap()
    }

    fn paper(repo: &mut Repository, tags: Vec<TagId>) -> PaperId {
        repo.insert_paper(
            NewPaper {
                title: "Attention".to_string(),
                abstract_text: "abstract".to_string(),
                doi: None,
                publication_date: NaiveDate::from_ymd_opt(2017, 6, 12).unwrap(),
                authors: vec![],
                tags,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_extends_to_closure() {
        let mut repo = Repository::default();
        let ai = tag(&mut repo, "ai", vec![]);
        let ml = tag(&mut repo, "ml", vec![ai]);
        let dl = tag(&mut repo, "dl", vec![ml]);
        let p = paper(&mut repo, vec![dl]);

        let outcome = infer_paper_tags(&mut repo, p, None).unwrap();

        assert_eq!(outcome, InferenceOutcome::Extended { added: vec![ml, ai] });
        assert_eq!(repo.find_paper(p).unwrap().tags, vec![dl, ml, ai]);
    }

    #[test]
    fn test_closed_set_is_not_written() {
        let mut repo = Repository::default();
        let ai = tag(&mut repo, "ai", vec![]);
        let ml = tag(&mut repo, "ml", vec![ai]);
        let p = paper(&mut repo, vec![ml, ai]);
        let before = repo.find_paper(p).unwrap().audit.clone();

        let outcome = infer_paper_tags(&mut repo, p, None).unwrap();

        assert_eq!(outcome, InferenceOutcome::Unchanged);
        assert_eq!(repo.find_paper(p).unwrap().audit, before);
    }

    #[test]
    fn test_second_run_is_unchanged() {
        let mut repo = Repository::default();
        let a = tag(&mut repo, "a", vec![]);
        let b = tag(&mut repo, "b", vec![a]);
        repo.set_inferred_tags(a, vec![b], None).unwrap();
        let p = paper(&mut repo, vec![a]);

        assert_eq!(infer_paper_tags(&mut repo, p, None).unwrap().added(), &[b]);
        assert_eq!(infer_paper_tags(&mut repo, p, None).unwrap(), InferenceOutcome::Unchanged);
    }

    #[test]
    fn test_untagged_paper() {
        let mut repo = Repository::default();
        let p = paper(&mut repo, vec![]);
        assert_eq!(infer_paper_tags(&mut repo, p, None).unwrap(), InferenceOutcome::Unchanged);
    }

    #[test]
    fn test_missing_paper() {
        let mut repo = Repository::default();
        let err = infer_paper_tags(&mut repo, PaperId(42), None).unwrap_err();
        assert!(matches!(err, AppError::PaperNotFound { .. }));
    }
}
