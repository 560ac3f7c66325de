use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::ContentSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordPriority {
    #[default]
    Primary,
    Secondary,
    Tertiary,
}

impl KeywordPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordPriority::Primary => "primary",
            KeywordPriority::Secondary => "secondary",
            KeywordPriority::Tertiary => "tertiary",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "secondary" => KeywordPriority::Secondary,
            "tertiary" => KeywordPriority::Tertiary,
            _ => KeywordPriority::Primary,
        }
    }
}

/// Explicit keyword -> page binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMapping {
    pub id: i64,
    pub keyword: String,
    pub url: String,
    pub content_id: i64,
    pub priority: KeywordPriority,
    pub search_volume: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKeywordMapping {
    pub keyword: String,
    pub url: String,
    pub content_id: i64,
    #[serde(default)]
    pub priority: KeywordPriority,
    pub search_volume: Option<i64>,
}

/// Mapping joined with the content it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMappingRow {
    #[serde(flatten)]
    pub mapping: KeywordMapping,
    pub content_title: String,
    pub content_slug: String,
}

/// Result of looking up an existing mapping for a keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CannibalizationCheck {
    pub exists: bool,
    pub url: Option<String>,
    pub content_id: Option<i64>,
}

/// Primary keyword targeted by more than one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CannibalizedKeyword {
    pub keyword: String,
    pub count: usize,
    pub contents: Vec<ContentSummary>,
}
