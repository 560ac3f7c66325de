use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::links::LinkBundle;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: i64,
    pub subject_id: String,
    pub title: String,
    pub slug: String,
    pub blog_content: String,
    pub youtube_id: Option<String>,
    pub quiz_data: Vec<QuizQuestion>,
    pub faqs: Vec<Faq>,
    pub primary_keyword: Option<String>,
    pub target_keywords: Vec<String>,
    pub year_slug: Option<String>,
    pub unit_number: Option<i64>,
    pub canonical_url: Option<String>,
    pub breadcrumb_path: Vec<Breadcrumb>,
    pub internal_links: Option<LinkBundle>,
    pub word_count: i64,
    pub reading_time_minutes: i64,
    pub is_indexable: bool,
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFreq>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn summary(&self) -> ContentSummary {
        ContentSummary {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            subject_id: self.subject_id.clone(),
            year_slug: self.year_slug.clone(),
            unit_number: self.unit_number,
            word_count: self.word_count,
            canonical_url: self.canonical_url.clone(),
        }
    }
}

/// Lightweight listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub subject_id: String,
    pub year_slug: Option<String>,
    pub unit_number: Option<i64>,
    pub word_count: i64,
    pub canonical_url: Option<String>,
}

/// Editorial payload for a new content item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    pub subject_id: String,
    pub title: String,
    #[serde(default)]
    pub blog_content: String,
    pub youtube_id: Option<String>,
    #[serde(default)]
    pub quiz_data: Vec<QuizQuestion>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    pub primary_keyword: Option<String>,
    #[serde(default)]
    pub target_keywords: Vec<String>,
    pub year_slug: Option<String>,
    pub unit_number: Option<i64>,
    pub is_indexable: Option<bool>,
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFreq>,
}

/// Partial update; only the provided fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    pub subject_id: Option<String>,
    pub title: Option<String>,
    pub blog_content: Option<String>,
    pub youtube_id: Option<String>,
    pub quiz_data: Option<Vec<QuizQuestion>>,
    pub faqs: Option<Vec<Faq>>,
    pub primary_keyword: Option<String>,
    pub target_keywords: Option<Vec<String>>,
    pub year_slug: Option<String>,
    pub unit_number: Option<i64>,
    pub is_indexable: Option<bool>,
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFreq>,
}

/// Fully derived row ready for insertion or overwrite.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub subject_id: String,
    pub title: String,
    pub slug: String,
    pub blog_content: String,
    pub youtube_id: Option<String>,
    pub quiz_data: Vec<QuizQuestion>,
    pub faqs: Vec<Faq>,
    pub primary_keyword: Option<String>,
    pub target_keywords: Vec<String>,
    pub year_slug: Option<String>,
    pub unit_number: Option<i64>,
    pub canonical_url: String,
    pub breadcrumb_path: Vec<Breadcrumb>,
    pub word_count: i64,
    pub reading_time_minutes: i64,
    pub is_indexable: bool,
    pub priority: Option<f64>,
    pub changefreq: Option<ChangeFreq>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub url: String,
}

/// Sitemap `<changefreq>` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeFreq {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(ChangeFreq::Always),
            "hourly" => Ok(ChangeFreq::Hourly),
            "daily" => Ok(ChangeFreq::Daily),
            "weekly" => Ok(ChangeFreq::Weekly),
            "monthly" => Ok(ChangeFreq::Monthly),
            "yearly" => Ok(ChangeFreq::Yearly),
            "never" => Ok(ChangeFreq::Never),
            other => Err(format!("unknown changefreq: {}", other)),
        }
    }
}

/// Normalised form used for keyword comparisons.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

/// Drop blank keywords and case-insensitive duplicates, keeping first occurrence.
pub fn dedup_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(normalize_keyword(k)))
        .collect()
}
