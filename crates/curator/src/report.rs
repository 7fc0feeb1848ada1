//! Import report printed on stdout

use crate::seed::{ImportSummary, Rejection};
use papershelf_common::{approval::ApprovalStatus, CatalogService};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct Report {
    pub version: &'static str,
    pub counts: BTreeMap<&'static str, usize>,
    pub papers: Vec<PaperReport>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Serialize)]
pub struct PaperReport {
    pub id: i64,
    pub title: String,
    pub publication_date: String,
    pub status: ApprovalStatus,
    pub doi: Option<String>,
    pub doi_url: Option<String>,
    pub authors: Vec<String>,
    /// Final tag set, inferred tags included
    pub tags: Vec<String>,
}

impl Report {
    /// Build the report from the catalog after an import
    pub fn build(service: &CatalogService, summary: ImportSummary) -> Self {
        let repo = service.repository();

        let papers = repo
            .list_papers()
            .into_iter()
            .map(|paper| PaperReport {
                id: paper.id.0,
                title: paper.title.clone(),
                publication_date: paper.publication_date.to_string(),
                status: paper.approval.status,
                doi: paper.doi.clone(),
                doi_url: service.doi_url(paper.id).ok().flatten(),
                authors: paper
                    .authors
                    .iter()
                    .filter_map(|a| repo.find_author(*a))
                    .map(|a| a.name.clone())
                    .collect(),
                tags: paper
                    .tags
                    .iter()
                    .filter_map(|t| repo.find_tag(*t))
                    .map(|t| t.name.clone())
                    .collect(),
            })
            .collect();

        Self {
            version: papershelf_common::VERSION,
            counts: repo.database().table_sizes(),
            papers,
            rejected: summary.rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{import, Seed};
    use papershelf_common::{config::DoiConfig, forms::UserForm, Repository};
    use serde_json::json;

    #[test]
    fn test_report_lists_papers_newest_first() {
        let mut service = CatalogService::new(Repository::default(), &DoiConfig::default());
        let actor = service
            .register_user(UserForm {
                username: "curator".into(),
                email: None,
                is_staff: true,
            })
            .unwrap();
        let seed: Seed = serde_json::from_value(json!({
            "papers": [
                { "title": "Old", "abstract": "x", "publication_date": "1990-01-01",
                  "doi": "10.1000/old" },
                { "title": "New", "abstract": "x", "publication_date": "2020-01-01" }
            ]
        }))
        .unwrap();
        let summary = import(&mut service, seed, actor);

        let report = Report::build(&service, summary);

        assert_eq!(report.papers[0].title, "New");
        assert_eq!(report.papers[1].doi_url.as_deref(), Some("https://doi.org/10.1000/old"));
        assert_eq!(report.counts["papers"], 2);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["papers"][0]["status"], "pending");
    }
}
