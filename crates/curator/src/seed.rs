//! Seed file import
//!
//! A seed file names every relation by name instead of id. Entries are
//! imported in dependency order through the catalog service, so they get the
//! same validation, audit stamping and tag inference as any other write. A
//! rejected entry is recorded, anything already written for it is removed,
//! and the import carries on.

use chrono::NaiveDate;
use papershelf_common::{
    db::models::{PaperAuthorId, PaperId, TagCategoryId, TagId, UserId},
    errors::{AppError, ErrorResponse, Result},
    forms::*,
    CatalogService,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<UserForm>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub tags: Vec<SeedTag>,

    #[serde(default)]
    pub aliases: Vec<SeedAlias>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub papers: Vec<SeedPaper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTag {
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Names of the tags this tag implies
    #[serde(default)]
    pub inferred: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAlias {
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPaper {
    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[serde(default)]
    pub doi: Option<String>,

    pub publication_date: NaiveDate,

    #[serde(default)]
    pub authors: Vec<String>,

    /// Tag names or aliases
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub links: Vec<String>,

    #[serde(default)]
    pub citations: Vec<String>,

    #[serde(default)]
    pub files: Vec<PaperFileForm>,
}

/// A seed entry that could not be imported
#[derive(Debug, Serialize)]
pub struct Rejection {
    pub kind: &'static str,
    pub name: String,
    #[serde(flatten)]
    pub response: ErrorResponse,
}

/// Everything an import created, plus what it turned away
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub categories: Vec<TagCategoryId>,
    pub tags: Vec<TagId>,
    pub papers: Vec<PaperId>,
    pub rejected: Vec<Rejection>,
}

impl ImportSummary {
    fn reject(&mut self, kind: &'static str, name: &str, err: AppError) {
        warn!(kind, name, error = %err, "Seed entry rejected");
        self.rejected.push(Rejection {
            kind,
            name: name.to_string(),
            response: err.to_response(),
        });
    }
}

/// Import `seed` on behalf of `actor`
pub fn import(service: &mut CatalogService, seed: Seed, actor: UserId) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for user in seed.users {
        let username = user.username.clone();
        if let Err(err) = service.register_user(user) {
            summary.reject("user", &username, err);
        }
    }

    for name in seed.categories {
        match service.create_category(TagCategoryForm { name: name.clone() }, actor) {
            Ok(id) => summary.categories.push(id),
            Err(err) => summary.reject("tag_category", &name, err),
        }
    }

    // First pass creates every tag without edges, so inferred names may
    // point forward in the file.
    let mut created = Vec::new();
    for tag in seed.tags {
        let result = category_id(service, tag.category.as_deref()).and_then(|category| {
            service.create_tag(
                TagForm {
                    name: tag.name.clone(),
                    category,
                    description: tag.description.clone(),
                    inferred_tags: Vec::new(),
                },
                actor,
            )
        });
        match result {
            Ok(id) => {
                summary.tags.push(id);
                created.push((id, tag));
            }
            Err(err) => summary.reject("tag", &tag.name, err),
        }
    }

    for (id, tag) in created.into_iter().filter(|(_, t)| !t.inferred.is_empty()) {
        let result = tag_ids(service, &tag.inferred)
            .and_then(|inferred| {
                Ok(TagForm {
                    name: tag.name.clone(),
                    category: category_id(service, tag.category.as_deref())?,
                    description: tag.description.clone(),
                    inferred_tags: inferred,
                })
            })
            .and_then(|form| service.update_tag(id, form, actor));
        if let Err(err) = result {
            service.reject_tags(&[id]);
            summary.tags.retain(|t| *t != id);
            summary.reject("tag", &tag.name, err);
        }
    }

    for alias in seed.aliases {
        let result = tag_id(service, &alias.tag).and_then(|tag| {
            service.create_alias(
                TagAliasForm {
                    name: alias.name.clone(),
                    tag,
                },
                actor,
            )
        });
        if let Err(err) = result {
            summary.reject("tag_alias", &alias.name, err);
        }
    }

    for name in seed.authors {
        if let Err(err) = service.create_author(PaperAuthorForm { name: name.clone() }, actor) {
            summary.reject("paper_author", &name, err);
        }
    }

    for paper in seed.papers {
        let title = paper.title.clone();
        match import_paper(service, paper, actor) {
            Ok(id) => summary.papers.push(id),
            Err(err) => summary.reject("paper", &title, err),
        }
    }

    info!(
        categories = summary.categories.len(),
        tags = summary.tags.len(),
        papers = summary.papers.len(),
        rejected = summary.rejected.len(),
        "Seed imported"
    );
    summary
}

fn import_paper(service: &mut CatalogService, paper: SeedPaper, actor: UserId) -> Result<PaperId> {
    let form = PaperForm {
        title: paper.title,
        abstract_text: paper.abstract_text,
        doi: paper.doi,
        publication_date: paper.publication_date,
        authors: author_ids(service, &paper.authors, actor)?,
        tags: tag_ids(service, &paper.tags)?,
    };
    let id = service.create_paper(form, actor)?;

    if let Err(err) = attach(service, id, paper.links, paper.citations, paper.files, actor) {
        service.reject_papers(&[id]);
        return Err(err);
    }

    debug!(paper_id = %id, "Seed paper imported");
    Ok(id)
}

fn attach(
    service: &mut CatalogService,
    id: PaperId,
    links: Vec<String>,
    citations: Vec<String>,
    files: Vec<PaperFileForm>,
    actor: UserId,
) -> Result<()> {
    for url in links {
        service.add_link(id, PaperLinkForm { url }, actor)?;
    }
    for citation in citations {
        service.add_citation(id, PaperCitationForm { citation }, actor)?;
    }
    for file in files {
        service.add_file(id, file, actor)?;
    }
    Ok(())
}

fn category_id(service: &CatalogService, name: Option<&str>) -> Result<Option<TagCategoryId>> {
    name.map(|name| {
        service
            .repository()
            .find_category_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| AppError::NotFound {
                resource_type: "tag_category".to_string(),
                id: name.to_string(),
            })
    })
    .transpose()
}

/// Resolve a tag name or alias
fn tag_id(service: &CatalogService, name: &str) -> Result<TagId> {
    service
        .repository()
        .resolve_tag(name)
        .map(|t| t.id)
        .ok_or_else(|| AppError::TagNotFound { id: name.to_string() })
}

fn tag_ids(service: &CatalogService, names: &[String]) -> Result<Vec<TagId>> {
    names.iter().map(|name| tag_id(service, name)).collect()
}

/// Resolve author names, creating authors not seen before
fn author_ids(service: &mut CatalogService, names: &[String], actor: UserId) -> Result<Vec<PaperAuthorId>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let existing = service.repository().find_author_by_name(name).map(|a| a.id);
        let id = match existing {
            Some(id) => id,
            None => service.create_author(PaperAuthorForm { name: name.clone() }, actor)?,
        };
        ids.push(id);
    }
    Ok(ids)
}
