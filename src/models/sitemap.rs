use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SitemapKind {
    Index,
    Core,
    Content,
}

impl SitemapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SitemapKind::Index => "index",
            SitemapKind::Core => "core",
            SitemapKind::Content => "content",
        }
    }

    /// Public file name, e.g. `sitemap-core.xml`.
    pub fn file_name(&self) -> String {
        format!("sitemap-{}.xml", self.as_str())
    }
}

impl fmt::Display for SitemapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SitemapKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" => Ok(SitemapKind::Index),
            "core" => Ok(SitemapKind::Core),
            "content" => Ok(SitemapKind::Content),
            other => Err(format!("unknown sitemap type: {}", other)),
        }
    }
}

/// Which cache rows an invalidation drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget {
    All,
    Kind(SitemapKind),
}

impl FromStr for CacheTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CacheTarget::All)
        } else {
            s.parse().map(CacheTarget::Kind)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSitemap {
    pub kind: SitemapKind,
    pub xml: String,
    pub url_count: i64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapCacheStat {
    pub kind: SitemapKind,
    pub url_count: i64,
    pub generated_at: DateTime<Utc>,
}
