//! Sitemap generation and caching.
//!
//! Three documents are served: an index pointing at the other two, a fixed
//! list of core routes, and one entry per indexable content item.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/bpharm</loc>
//!     <lastmod>2026-01-01</lastmod>
//!     <changefreq>weekly</changefreq>
//!     <priority>0.9</priority>
//!   </url>
//! </urlset>
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{CacheTarget, ChangeFreq, ContentItem, SitemapCacheStat, SitemapKind};

use super::linking::item_url;

// ============================================================================
// Constants
// ============================================================================

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const DEFAULT_PRIORITY: f64 = 0.8;
const DEFAULT_CHANGEFREQ: ChangeFreq = ChangeFreq::Monthly;

/// Static routes listed in the core sitemap: (path, priority, changefreq).
const CORE_ROUTES: &[(&str, f64, ChangeFreq)] = &[
    ("/", 1.0, ChangeFreq::Daily),
    ("/bpharm", 0.9, ChangeFreq::Weekly),
    ("/bpharm/1st-year", 0.8, ChangeFreq::Weekly),
    ("/bpharm/2nd-year", 0.8, ChangeFreq::Weekly),
    ("/bpharm/3rd-year", 0.8, ChangeFreq::Weekly),
    ("/bpharm/4th-year", 0.8, ChangeFreq::Weekly),
    ("/about", 0.5, ChangeFreq::Monthly),
    ("/contact", 0.5, ChangeFreq::Monthly),
];

// ============================================================================
// Documents
// ============================================================================

/// Single `<url>` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlEntry {
    pub loc: String,
    /// YYYY-MM-DD
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f64>,
}

/// A generated document plus the number of entries it lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapDocument {
    pub xml: String,
    pub count: usize,
}

pub fn urlset_xml(entries: &[UrlEntry]) -> String {
    let mut xml = String::with_capacity(256 + entries.len() * 160);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(lastmod) = &entry.lastmod {
            xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        }
        if let Some(changefreq) = entry.changefreq {
            xml.push_str(&format!("    <changefreq>{changefreq}</changefreq>\n"));
        }
        if let Some(priority) = entry.priority {
            xml.push_str(&format!("    <priority>{priority:.1}</priority>\n"));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

pub fn sitemap_index_xml(locs: &[String], lastmod: &str) -> String {
    let mut xml = String::with_capacity(512);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<sitemapindex xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for loc in locs {
        xml.push_str("  <sitemap>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(loc)));
        xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        xml.push_str("  </sitemap>\n");
    }

    xml.push_str("</sitemapindex>\n");
    xml
}

fn ymd(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn core_entries(base_url: &str, today: &str) -> Vec<UrlEntry> {
    let base = base_url.trim_end_matches('/');
    CORE_ROUTES
        .iter()
        .map(|(path, priority, changefreq)| UrlEntry {
            loc: if *path == "/" {
                format!("{}/", base)
            } else {
                format!("{}{}", base, path)
            },
            lastmod: Some(today.to_string()),
            changefreq: Some(*changefreq),
            priority: Some(*priority),
        })
        .collect()
}

pub fn content_entries(items: &[ContentItem], base_url: &str) -> Vec<UrlEntry> {
    items
        .iter()
        .filter(|item| item.is_indexable)
        .map(|item| UrlEntry {
            loc: item_url(item, base_url),
            lastmod: Some(ymd(item.updated_at)),
            changefreq: Some(item.changefreq.unwrap_or(DEFAULT_CHANGEFREQ)),
            priority: Some(item.priority.unwrap_or(DEFAULT_PRIORITY)),
        })
        .collect()
}

pub fn generate_robots_txt(base_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /api/\n\nSitemap: {}/{}\n",
        base_url.trim_end_matches('/'),
        SitemapKind::Index.file_name()
    )
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ============================================================================
// Service
// ============================================================================

pub struct SitemapService {
    repository: Arc<Repository>,
    clock: Arc<dyn Clock>,
    base_url: String,
    max_age_hours: i64,
    generations: AtomicU64,
}

impl SitemapService {
    pub fn new(
        repository: Arc<Repository>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
        max_age_hours: i64,
    ) -> Self {
        Self {
            repository,
            clock,
            base_url: base_url.into(),
            max_age_hours,
            generations: AtomicU64::new(0),
        }
    }

    /// Number of documents generated (cache misses) since startup.
    pub fn generation_count(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    pub fn generate_sitemap_index(&self) -> SitemapDocument {
        let base = self.base_url.trim_end_matches('/');
        let locs: Vec<String> = [SitemapKind::Core, SitemapKind::Content]
            .iter()
            .map(|kind| format!("{}/{}", base, kind.file_name()))
            .collect();
        SitemapDocument {
            xml: sitemap_index_xml(&locs, &ymd(self.clock.now())),
            count: locs.len(),
        }
    }

    pub fn generate_core_sitemap(&self) -> SitemapDocument {
        let entries = core_entries(&self.base_url, &ymd(self.clock.now()));
        SitemapDocument {
            xml: urlset_xml(&entries),
            count: entries.len(),
        }
    }

    pub async fn generate_content_sitemap(&self) -> Result<SitemapDocument> {
        let items = self.repository.get_indexable_content().await?;
        let entries = content_entries(&items, &self.base_url);
        Ok(SitemapDocument {
            xml: urlset_xml(&entries),
            count: entries.len(),
        })
    }

    pub async fn generate(&self, kind: SitemapKind) -> Result<SitemapDocument> {
        self.generations.fetch_add(1, Ordering::Relaxed);
        match kind {
            SitemapKind::Index => Ok(self.generate_sitemap_index()),
            SitemapKind::Core => Ok(self.generate_core_sitemap()),
            SitemapKind::Content => self.generate_content_sitemap().await,
        }
    }

    pub async fn cache_sitemap(&self, kind: SitemapKind, xml: &str, count: usize) -> Result<()> {
        self.repository
            .upsert_sitemap_cache(kind, xml.to_string(), count as i64, self.clock.now())
            .await
    }

    /// Cached XML if it is younger than `max_age_hours`.
    pub async fn get_cached_sitemap(
        &self,
        kind: SitemapKind,
        max_age_hours: i64,
    ) -> Result<Option<String>> {
        let Some(cached) = self.repository.get_sitemap_cache(kind).await? else {
            return Ok(None);
        };

        let age = self.clock.now() - cached.generated_at;
        if age < Duration::hours(max_age_hours) {
            Ok(Some(cached.xml))
        } else {
            tracing::debug!(
                sitemap = %kind,
                age_minutes = age.num_minutes(),
                "Cached sitemap expired"
            );
            Ok(None)
        }
    }

    /// Cache-first read: regenerate and store on a miss.
    pub async fn get_sitemap(&self, kind: SitemapKind) -> Result<String> {
        if let Some(xml) = self.get_cached_sitemap(kind, self.max_age_hours).await? {
            return Ok(xml);
        }

        let document = self.generate(kind).await?;
        self.cache_sitemap(kind, &document.xml, document.count).await?;
        tracing::info!(
            sitemap = %kind,
            urls = document.count,
            generations = self.generation_count(),
            "Generated sitemap"
        );
        Ok(document.xml)
    }

    pub async fn invalidate_cache(&self, target: CacheTarget) -> Result<usize> {
        let removed = match target {
            CacheTarget::All => self.repository.delete_sitemap_cache(None).await?,
            CacheTarget::Kind(kind) => self.repository.delete_sitemap_cache(Some(kind)).await?,
        };
        tracing::debug!(?target, removed, "Invalidated sitemap cache");
        Ok(removed)
    }

    pub async fn cache_stats(&self) -> Result<Vec<SitemapCacheStat>> {
        self.repository.sitemap_cache_stats().await
    }

    pub fn robots_txt(&self) -> String {
        generate_robots_txt(&self.base_url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ManualClock;
    use crate::test_utils::{item, record, BASE_URL};
    use chrono::TimeZone;

    async fn service() -> (SitemapService, Arc<ManualClock>, Arc<Repository>) {
        let repo = Arc::new(Repository::in_memory().await.unwrap());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let service = SitemapService::new(repo.clone(), clock.clone(), BASE_URL, 24);
        (service, clock, repo)
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<x>"), "&lt;x&gt;");
        assert_eq!(escape_xml("it's \"q\""), "it&apos;s &quot;q&quot;");
    }

    #[test]
    fn test_urlset_structure() {
        let xml = urlset_xml(&[UrlEntry {
            loc: "https://pharmacy.example/search?q=a&b=c".into(),
            lastmod: Some("2026-03-01".into()),
            changefreq: Some(ChangeFreq::Weekly),
            priority: Some(0.8),
        }]);

        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert!(lines[1].starts_with("<urlset"));
        assert_eq!(lines.last().unwrap().trim(), "</urlset>");
        assert!(xml.contains("<loc>https://pharmacy.example/search?q=a&amp;b=c</loc>"));
        assert!(xml.contains("<lastmod>2026-03-01</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.8</priority>"));
    }

    #[test]
    fn test_urlset_empty() {
        let xml = urlset_xml(&[]);
        assert!(xml.contains("</urlset>"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_content_entries_defaults_and_filter() {
        let mut tuned = item(1, "Tuned", "BP101T", Some("1st-year"), Some(1));
        tuned.priority = Some(0.6);
        tuned.changefreq = Some(ChangeFreq::Yearly);
        let plain = item(2, "Plain", "BP101T", Some("1st-year"), Some(2));
        let mut hidden = item(3, "Hidden", "BP101T", Some("1st-year"), Some(3));
        hidden.is_indexable = false;

        let entries = content_entries(&[tuned, plain, hidden], BASE_URL);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].priority, Some(0.6));
        assert_eq!(entries[0].changefreq, Some(ChangeFreq::Yearly));
        assert_eq!(entries[1].priority, Some(0.8));
        assert_eq!(entries[1].changefreq, Some(ChangeFreq::Monthly));
        assert_eq!(
            entries[1].loc,
            "https://pharmacy.example/bpharm/1st-year/bp101t/plain"
        );
        assert_eq!(entries[1].lastmod.as_deref(), Some("2026-01-01"));
    }

    #[test]
    fn test_robots_txt() {
        let robots = generate_robots_txt(BASE_URL);
        assert!(robots.contains("Disallow: /admin\n"));
        assert!(robots.contains("Disallow: /api/\n"));
        assert!(robots.contains("Sitemap: https://pharmacy.example/sitemap-index.xml"));
    }

    #[tokio::test]
    async fn test_index_lists_child_sitemaps() {
        let (service, _, _) = service().await;
        let doc = service.generate_sitemap_index();
        assert_eq!(doc.count, 2);
        assert!(doc.xml.contains("<sitemapindex"));
        assert!(doc
            .xml
            .contains("<loc>https://pharmacy.example/sitemap-core.xml</loc>"));
        assert!(doc
            .xml
            .contains("<loc>https://pharmacy.example/sitemap-content.xml</loc>"));
        assert!(doc.xml.contains("<lastmod>2026-03-01</lastmod>"));
    }

    #[tokio::test]
    async fn test_get_sitemap_uses_cache_within_window() {
        let (service, clock, _) = service().await;

        let first = service.get_sitemap(SitemapKind::Core).await.unwrap();
        clock.advance(Duration::hours(23));
        let second = service.get_sitemap(SitemapKind::Core).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(service.generation_count(), 1);
    }

    #[tokio::test]
    async fn test_get_sitemap_regenerates_after_expiry() {
        let (service, clock, _) = service().await;

        service.get_sitemap(SitemapKind::Core).await.unwrap();
        clock.advance(Duration::hours(24));
        let refreshed = service.get_sitemap(SitemapKind::Core).await.unwrap();

        assert_eq!(service.generation_count(), 2);
        assert!(refreshed.contains("<lastmod>2026-03-02</lastmod>"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_regeneration() {
        let (service, _, repo) = service().await;

        let empty = service.get_sitemap(SitemapKind::Content).await.unwrap();
        assert!(!empty.contains("<url>"));

        repo.insert_content(record("Cell Basics", "BP101T", Some("1st-year"), Some(1)))
            .await
            .unwrap();
        // still cached
        assert_eq!(service.get_sitemap(SitemapKind::Content).await.unwrap(), empty);

        assert_eq!(service.invalidate_cache(CacheTarget::All).await.unwrap(), 1);
        let fresh = service.get_sitemap(SitemapKind::Content).await.unwrap();
        assert!(fresh.contains("/bpharm/1st-year/bp101t/cell-basics</loc>"));
        assert_eq!(service.generation_count(), 2);

        let stats = service.cache_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].kind, SitemapKind::Content);
        assert_eq!(stats[0].url_count, 1);
    }

    #[tokio::test]
    async fn test_invalidate_single_kind() {
        let (service, _, _) = service().await;
        service.get_sitemap(SitemapKind::Core).await.unwrap();
        service.get_sitemap(SitemapKind::Index).await.unwrap();

        let removed = service
            .invalidate_cache(CacheTarget::Kind(SitemapKind::Core))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(service
            .get_cached_sitemap(SitemapKind::Index, 24)
            .await
            .unwrap()
            .is_some());
        assert!(service
            .get_cached_sitemap(SitemapKind::Core, 24)
            .await
            .unwrap()
            .is_none());
    }
}
