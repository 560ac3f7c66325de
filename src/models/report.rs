use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::ContentSummary;
use super::keyword::CannibalizedKeyword;
use super::links::OrphanPage;
use super::sitemap::SitemapCacheStat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub check: String,
    pub passed: bool,
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub score: u32,
    pub generated_at: DateTime<Utc>,
    pub total_pages: usize,
    pub indexable_pages: usize,
    pub orphan_pages: Vec<OrphanPage>,
    pub cannibalized_keywords: Vec<CannibalizedKeyword>,
    pub missing_primary_keyword: Vec<ContentSummary>,
    pub low_word_count: Vec<ContentSummary>,
    pub missing_canonical: Vec<ContentSummary>,
    pub sitemap_cache: Vec<SitemapCacheStat>,
    pub checklist: Vec<ChecklistItem>,
}
