use std::sync::Arc;

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{
    CannibalizedKeyword, ChecklistItem, ContentSummary, OrphanPage, QualityReport,
};

use super::keywords::KeywordService;
use super::linking::LinkingEngine;
use super::sitemap::SitemapService;

pub const LOW_WORD_COUNT_THRESHOLD: i64 = 1200;

const ORPHAN_PENALTY: u32 = 2;
const CANNIBALIZATION_PENALTY: u32 = 5;
const MISSING_KEYWORD_PENALTY: u32 = 1;
const LOW_WORD_COUNT_PENALTY: u32 = 1;
const MISSING_CANONICAL_PENALTY: u32 = 3;
const NO_INDEXABLE_PENALTY: u32 = 20;

/// 100 minus fixed per-issue deductions, floored at 0.
pub fn calculate_score(
    orphans: &[OrphanPage],
    cannibalized: &[CannibalizedKeyword],
    missing_keyword: &[ContentSummary],
    low_word_count: &[ContentSummary],
    missing_canonical: &[ContentSummary],
    indexable_pages: usize,
) -> u32 {
    let penalty = |count: usize, each: u32| (count as u32).saturating_mul(each);

    let mut deductions = penalty(orphans.len(), ORPHAN_PENALTY)
        .saturating_add(penalty(cannibalized.len(), CANNIBALIZATION_PENALTY))
        .saturating_add(penalty(missing_keyword.len(), MISSING_KEYWORD_PENALTY))
        .saturating_add(penalty(low_word_count.len(), LOW_WORD_COUNT_PENALTY))
        .saturating_add(penalty(missing_canonical.len(), MISSING_CANONICAL_PENALTY));
    if indexable_pages == 0 {
        deductions = deductions.saturating_add(NO_INDEXABLE_PENALTY);
    }

    100u32.saturating_sub(deductions)
}

fn checklist_item(check: &str, count: usize, ok: &str, issue: String) -> ChecklistItem {
    ChecklistItem {
        check: check.to_string(),
        passed: count == 0,
        count,
        message: if count == 0 { ok.to_string() } else { issue },
    }
}

/// Read-only aggregation over the other services.
pub struct QualityReporter {
    repository: Arc<Repository>,
    linking: Arc<LinkingEngine>,
    keywords: Arc<KeywordService>,
    sitemaps: Arc<SitemapService>,
    clock: Arc<dyn Clock>,
}

impl QualityReporter {
    pub fn new(
        repository: Arc<Repository>,
        linking: Arc<LinkingEngine>,
        keywords: Arc<KeywordService>,
        sitemaps: Arc<SitemapService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            linking,
            keywords,
            sitemaps,
            clock,
        }
    }

    pub async fn generate_report(&self) -> Result<QualityReport> {
        let orphan_pages = self.linking.detect_orphan_pages().await?;
        let cannibalized_keywords = self.keywords.detect_cannibalization().await?;
        let missing_primary_keyword = self.repository.content_missing_primary_keyword().await?;
        let low_word_count = self
            .repository
            .content_below_word_count(LOW_WORD_COUNT_THRESHOLD)
            .await?;
        let missing_canonical = self.repository.content_missing_canonical().await?;
        let sitemap_cache = self.sitemaps.cache_stats().await?;
        let total_pages = self.repository.count_content().await?;
        let indexable_pages = self.repository.count_indexable().await?;

        let score = calculate_score(
            &orphan_pages,
            &cannibalized_keywords,
            &missing_primary_keyword,
            &low_word_count,
            &missing_canonical,
            indexable_pages,
        );

        let checklist = vec![
            checklist_item(
                "orphan_pages",
                orphan_pages.len(),
                "Every page has at least one internal link pointing to it",
                format!("{} page(s) have no inbound internal links", orphan_pages.len()),
            ),
            checklist_item(
                "keyword_cannibalization",
                cannibalized_keywords.len(),
                "No primary keyword is targeted by more than one page",
                format!(
                    "{} primary keyword(s) are shared by multiple pages",
                    cannibalized_keywords.len()
                ),
            ),
            checklist_item(
                "primary_keyword",
                missing_primary_keyword.len(),
                "Every page has a primary keyword",
                format!("{} page(s) lack a primary keyword", missing_primary_keyword.len()),
            ),
            checklist_item(
                "word_count",
                low_word_count.len(),
                "Every page meets the minimum word count",
                format!(
                    "{} page(s) have fewer than {} words",
                    low_word_count.len(),
                    LOW_WORD_COUNT_THRESHOLD
                ),
            ),
            checklist_item(
                "canonical_url",
                missing_canonical.len(),
                "Every page has a canonical URL",
                format!("{} page(s) lack a canonical URL", missing_canonical.len()),
            ),
            ChecklistItem {
                check: "indexable_pages".to_string(),
                passed: indexable_pages > 0,
                count: indexable_pages,
                message: if indexable_pages > 0 {
                    format!("{} page(s) are indexable", indexable_pages)
                } else {
                    "No pages are indexable".to_string()
                },
            },
        ];

        tracing::info!(score, total_pages, "Generated quality report");

        Ok(QualityReport {
            score,
            generated_at: self.clock.now(),
            total_pages,
            indexable_pages,
            orphan_pages,
            cannibalized_keywords,
            missing_primary_keyword,
            low_word_count,
            missing_canonical,
            sitemap_cache,
            checklist,
        })
    }
}
