//! Internal linking engine.
//!
//! Link bundles are recomputed from the current content table on every call
//! and overwrite whatever was stored before. Orphan detection reads only the
//! stored bundles, so it reflects the last generation of each item.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    normalize_keyword, ContentItem, ContentLink, LinkBundle, LinkFailure, OrphanPage, ParentLink,
    PrevNext, RegenerationSummary,
};

use super::url_mapper::{self, CanonicalParts};

const MAX_SIBLINGS: usize = 5;
const MAX_RELATED: usize = 3;

pub struct LinkingEngine {
    repository: Arc<Repository>,
    base_url: String,
}

impl LinkingEngine {
    pub fn new(repository: Arc<Repository>, base_url: impl Into<String>) -> Self {
        Self {
            repository,
            base_url: base_url.into(),
        }
    }

    /// Recompute and persist the link bundle of one content item.
    pub async fn generate_links(&self, content_id: i64) -> Result<LinkBundle> {
        let item = self
            .repository
            .get_content(content_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Content {} not found", content_id)))?;

        let all = self.repository.get_all_content().await?;
        let bundle = build_link_bundle(&item, &all, &self.base_url);

        if !self.repository.save_internal_links(content_id, &bundle).await? {
            return Err(AppError::not_found(format!(
                "Content {} was deleted during link generation",
                content_id
            )));
        }

        tracing::debug!(
            content_id,
            siblings = bundle.siblings.len(),
            related = bundle.related.len(),
            "Generated internal links"
        );
        Ok(bundle)
    }

    /// Items that no stored link bundle points at.
    pub async fn detect_orphan_pages(&self) -> Result<Vec<OrphanPage>> {
        let all = self.repository.get_all_content().await?;
        Ok(find_orphans(&all, &self.base_url))
    }

    /// Regenerate every bundle; per-item failures are collected, never fatal.
    pub async fn regenerate_all_links(&self) -> Result<RegenerationSummary> {
        let ids = self.repository.get_content_ids().await?;
        let mut summary = RegenerationSummary::default();

        for content_id in ids {
            match self.generate_links(content_id).await {
                Ok(_) => summary.success += 1,
                Err(e) => {
                    tracing::warn!(content_id, error = %e, "Failed to regenerate links");
                    summary.failed += 1;
                    summary.errors.push(LinkFailure {
                        content_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            success = summary.success,
            failed = summary.failed,
            "Link regeneration finished"
        );
        Ok(summary)
    }
}

/// Stored canonical URL, or the one derivable from the hierarchy fields.
pub fn item_url(item: &ContentItem, base_url: &str) -> String {
    match item.canonical_url.as_deref() {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => url_mapper::content_canonical_url(
            base_url,
            item.year_slug.as_deref(),
            &item.subject_id,
            &item.slug,
        ),
    }
}

fn content_link(item: &ContentItem, base_url: &str) -> ContentLink {
    ContentLink {
        id: item.id,
        title: item.title.clone(),
        url: item_url(item, base_url),
    }
}

fn same_group(a: &ContentItem, b: &ContentItem) -> bool {
    a.subject_id == b.subject_id && a.year_slug == b.year_slug
}

pub fn parent_link(item: &ContentItem, base_url: &str) -> ParentLink {
    let Some(year) = item.year_slug.as_deref().filter(|y| !y.is_empty()) else {
        return ParentLink {
            title: url_mapper::PROGRAM_TITLE.to_string(),
            url: url_mapper::generate_canonical_url(base_url, CanonicalParts::default()),
        };
    };

    let subject = url_mapper::subject_slug(&item.subject_id);
    if subject.is_empty() {
        ParentLink {
            title: url_mapper::year_title(year),
            url: url_mapper::generate_canonical_url(
                base_url,
                CanonicalParts {
                    year_slug: Some(year),
                    ..Default::default()
                },
            ),
        }
    } else {
        ParentLink {
            title: url_mapper::subject_title(&item.subject_id),
            url: url_mapper::generate_canonical_url(
                base_url,
                CanonicalParts {
                    year_slug: Some(year),
                    subject_slug: Some(&subject),
                    unit_slug: None,
                },
            ),
        }
    }
}

/// Compute the full bundle for `item` against every content row.
pub fn build_link_bundle(item: &ContentItem, all: &[ContentItem], base_url: &str) -> LinkBundle {
    let others: Vec<&ContentItem> = all.iter().filter(|c| c.id != item.id).collect();

    let mut siblings: Vec<&ContentItem> = others
        .iter()
        .copied()
        .filter(|c| same_group(c, item))
        .collect();
    siblings.sort_by_key(|c| (c.unit_number.is_none(), c.unit_number, c.created_at, c.id));

    LinkBundle {
        parent: parent_link(item, base_url),
        siblings: siblings
            .into_iter()
            .take(MAX_SIBLINGS)
            .map(|c| content_link(c, base_url))
            .collect(),
        related: related_items(item, &others)
            .into_iter()
            .take(MAX_RELATED)
            .map(|c| content_link(c, base_url))
            .collect(),
        prev_next: prev_next(item, &others, base_url),
    }
}

/// Candidates sharing the primary keyword or any target keyword, best match first.
fn related_items<'a>(item: &ContentItem, others: &[&'a ContentItem]) -> Vec<&'a ContentItem> {
    let primary = item
        .primary_keyword
        .as_deref()
        .map(normalize_keyword)
        .filter(|k| !k.is_empty());
    let targets: HashSet<String> = item
        .target_keywords
        .iter()
        .map(|k| normalize_keyword(k))
        .filter(|k| !k.is_empty())
        .collect();

    let mut scored: Vec<(bool, usize, &ContentItem)> = others
        .iter()
        .filter_map(|candidate| {
            let exact = match (&primary, candidate.primary_keyword.as_deref()) {
                (Some(p), Some(other)) => *p == normalize_keyword(other),
                _ => false,
            };
            let overlap = candidate
                .target_keywords
                .iter()
                .map(|k| normalize_keyword(k))
                .collect::<HashSet<_>>()
                .intersection(&targets)
                .count();
            (exact || overlap > 0).then_some((exact, overlap, *candidate))
        })
        .collect();

    scored.sort_by_key(|(exact, overlap, c)| (!exact, Reverse(*overlap), c.id));
    scored.into_iter().map(|(_, _, c)| c).collect()
}

fn prev_next(item: &ContentItem, others: &[&ContentItem], base_url: &str) -> PrevNext {
    let Some(unit) = item.unit_number else {
        return PrevNext::default();
    };

    let numbered: Vec<(i64, &ContentItem)> = others
        .iter()
        .copied()
        .filter(|c| same_group(c, item))
        .filter_map(|c| c.unit_number.map(|u| (u, c)))
        .collect();

    let prev = numbered
        .iter()
        .filter(|(u, _)| *u < unit)
        .min_by_key(|(u, c)| (Reverse(*u), c.created_at, c.id))
        .map(|(_, c)| content_link(c, base_url));
    let next = numbered
        .iter()
        .filter(|(u, _)| *u > unit)
        .min_by_key(|(u, c)| (*u, c.created_at, c.id))
        .map(|(_, c)| content_link(c, base_url));

    PrevNext { prev, next }
}

pub fn find_orphans(all: &[ContentItem], base_url: &str) -> Vec<OrphanPage> {
    let referenced: HashSet<i64> = all
        .iter()
        .filter_map(|source| {
            source
                .internal_links
                .as_ref()
                .map(|bundle| (source.id, bundle))
        })
        .flat_map(|(source_id, bundle)| {
            bundle
                .target_ids()
                .filter(move |target| *target != source_id)
                .collect::<Vec<_>>()
        })
        .collect();

    all.iter()
        .filter(|item| !referenced.contains(&item.id))
        .map(|item| OrphanPage {
            id: item.id,
            title: item.title.clone(),
            url: item_url(item, base_url),
        })
        .collect()
}
