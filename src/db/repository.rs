use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    CachedSitemap, ContentItem, ContentRecord, ContentSummary, KeywordMapping, KeywordMappingRow,
    KeywordPriority, LinkBundle, NewKeywordMapping, SitemapCacheStat, SitemapKind,
};

use super::schema::SCHEMA;

const CONTENT_COLUMNS: &str = "id, subject_id, title, slug, blog_content, youtube_id, quiz_data, faqs, \
     primary_keyword, target_keywords, year_slug, unit_number, canonical_url, breadcrumb_path, \
     internal_links, word_count, reading_time_minutes, is_indexable, priority, changefreq, \
     created_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, title, slug, subject_id, year_slug, unit_number, word_count, canonical_url";

const MAPPING_COLUMNS: &str = "m.id, m.keyword, m.url, m.content_id, m.priority, m.search_volume, \
     m.is_active, m.created_at, m.updated_at";

/// Outcome of [`Repository::claim_keyword_mapping`].
#[derive(Debug)]
pub enum KeywordClaim {
    Saved(KeywordMapping),
    /// Another content id already holds the keyword; nothing was written.
    Held(KeywordMapping),
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Content operations

    pub async fn insert_content(&self, record: ContentRecord) -> Result<i64> {
        let encoded = EncodedRecord::new(record)?;
        let id = self
            .conn
            .call(move |conn| {
                let r = encoded;
                conn.execute(
                    r#"INSERT INTO content (subject_id, title, slug, blog_content, youtube_id, quiz_data,
                           faqs, primary_keyword, target_keywords, year_slug, unit_number, canonical_url,
                           breadcrumb_path, word_count, reading_time_minutes, is_indexable, priority, changefreq)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"#,
                    params![
                        r.record.subject_id,
                        r.record.title,
                        r.record.slug,
                        r.record.blog_content,
                        r.record.youtube_id,
                        r.quiz_data,
                        r.faqs,
                        r.record.primary_keyword,
                        r.target_keywords,
                        r.record.year_slug,
                        r.record.unit_number,
                        r.record.canonical_url,
                        r.breadcrumb_path,
                        r.record.word_count,
                        r.record.reading_time_minutes,
                        r.record.is_indexable,
                        r.record.priority,
                        r.record.changefreq.map(|c| c.as_str()),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Overwrite every editorial and derived column except the link bundle.
    pub async fn update_content(&self, id: i64, record: ContentRecord) -> Result<bool> {
        let encoded = EncodedRecord::new(record)?;
        let changed = self
            .conn
            .call(move |conn| {
                let r = encoded;
                let rows = conn.execute(
                    r#"UPDATE content SET subject_id = ?1, title = ?2, slug = ?3, blog_content = ?4,
                           youtube_id = ?5, quiz_data = ?6, faqs = ?7, primary_keyword = ?8,
                           target_keywords = ?9, year_slug = ?10, unit_number = ?11, canonical_url = ?12,
                           breadcrumb_path = ?13, word_count = ?14, reading_time_minutes = ?15,
                           is_indexable = ?16, priority = ?17, changefreq = ?18,
                           updated_at = datetime('now')
                       WHERE id = ?19"#,
                    params![
                        r.record.subject_id,
                        r.record.title,
                        r.record.slug,
                        r.record.blog_content,
                        r.record.youtube_id,
                        r.quiz_data,
                        r.faqs,
                        r.record.primary_keyword,
                        r.target_keywords,
                        r.record.year_slug,
                        r.record.unit_number,
                        r.record.canonical_url,
                        r.breadcrumb_path,
                        r.record.word_count,
                        r.record.reading_time_minutes,
                        r.record.is_indexable,
                        r.record.priority,
                        r.record.changefreq.map(|c| c.as_str()),
                        id,
                    ],
                )?;
                Ok(rows > 0)
            })
            .await?;
        Ok(changed)
    }

    pub async fn delete_content(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let rows = conn.execute("DELETE FROM content WHERE id = ?1", params![id])?;
                Ok(rows > 0)
            })
            .await?;
        Ok(deleted)
    }

    pub async fn get_content(&self, id: i64) -> Result<Option<ContentItem>> {
        let item = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM content WHERE id = ?1",
                    CONTENT_COLUMNS
                ))?;
                let item = stmt
                    .query_row(params![id], |row| content_from_row(row))
                    .optional()?;
                Ok(item)
            })
            .await?;
        Ok(item)
    }

    pub async fn get_all_content(&self) -> Result<Vec<ContentItem>> {
        let items = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM content ORDER BY id", CONTENT_COLUMNS))?;
                let items = stmt
                    .query_map([], |row| content_from_row(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    /// Listing order: subject, then unit (unnumbered last), then creation.
    pub async fn list_content(&self) -> Result<Vec<ContentSummary>> {
        self.query_summaries(
            "ORDER BY subject_id, unit_number IS NULL, unit_number, created_at, id",
        )
        .await
    }

    pub async fn get_content_ids(&self) -> Result<Vec<i64>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM content ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<i64>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    pub async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let slug = slug.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM content WHERE slug = ?1 AND (?2 IS NULL OR id != ?2)",
                    params![slug, exclude_id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    pub async fn save_internal_links(&self, id: i64, bundle: &LinkBundle) -> Result<bool> {
        let bundle_json = serde_json::to_string(bundle)?;
        let saved = self
            .conn
            .call(move |conn| {
                let rows = conn.execute(
                    "UPDATE content SET internal_links = ?1 WHERE id = ?2",
                    params![bundle_json, id],
                )?;
                Ok(rows > 0)
            })
            .await?;
        Ok(saved)
    }

    pub async fn get_indexable_content(&self) -> Result<Vec<ContentItem>> {
        let items = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM content WHERE is_indexable = 1 ORDER BY id",
                    CONTENT_COLUMNS
                ))?;
                let items = stmt
                    .query_map([], |row| content_from_row(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    pub async fn count_content(&self) -> Result<usize> {
        self.count_where("1 = 1").await
    }

    pub async fn count_indexable(&self) -> Result<usize> {
        self.count_where("is_indexable = 1").await
    }

    pub async fn content_missing_primary_keyword(&self) -> Result<Vec<ContentSummary>> {
        self.query_summaries(
            "WHERE primary_keyword IS NULL OR TRIM(primary_keyword) = '' ORDER BY id",
        )
        .await
    }

    pub async fn content_below_word_count(&self, threshold: i64) -> Result<Vec<ContentSummary>> {
        let summaries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM content WHERE word_count < ?1 ORDER BY id",
                    SUMMARY_COLUMNS
                ))?;
                let summaries = stmt
                    .query_map(params![threshold], |row| summary_from_row(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await?;
        Ok(summaries)
    }

    pub async fn content_missing_canonical(&self) -> Result<Vec<ContentSummary>> {
        self.query_summaries("WHERE canonical_url IS NULL OR canonical_url = '' ORDER BY id")
            .await
    }

    async fn query_summaries(&self, clause: &'static str) -> Result<Vec<ContentSummary>> {
        let summaries = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM content {}", SUMMARY_COLUMNS, clause))?;
                let summaries = stmt
                    .query_map([], |row| summary_from_row(row))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await?;
        Ok(summaries)
    }

    async fn count_where(&self, clause: &'static str) -> Result<usize> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM content WHERE {}", clause),
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as usize)
    }

    // Keyword mapping operations

    /// Active mapping for an already-normalised keyword, ignoring `exclude_content_id`.
    pub async fn find_active_mapping(
        &self,
        keyword: &str,
        exclude_content_id: Option<i64>,
    ) -> Result<Option<KeywordMapping>> {
        let keyword = keyword.to_string();
        let mapping = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"SELECT {} FROM keyword_mappings m
                       WHERE m.keyword = ?1 AND m.is_active = 1
                         AND (?2 IS NULL OR m.content_id != ?2)"#,
                    MAPPING_COLUMNS
                ))?;
                let mapping = stmt
                    .query_row(params![keyword, exclude_content_id], |row| {
                        mapping_from_row(row)
                    })
                    .optional()?;
                Ok(mapping)
            })
            .await?;
        Ok(mapping)
    }

    /// Insert or refresh the mapping for `mapping.keyword` unless another content
    /// id actively holds it. The ownership check and the write share one transaction.
    pub async fn claim_keyword_mapping(&self, mapping: NewKeywordMapping) -> Result<KeywordClaim> {
        let claim = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let holder = tx
                    .query_row(
                        &format!(
                            r#"SELECT {} FROM keyword_mappings m
                               WHERE m.keyword = ?1 AND m.is_active = 1 AND m.content_id != ?2"#,
                            MAPPING_COLUMNS
                        ),
                        params![mapping.keyword, mapping.content_id],
                        |row| mapping_from_row(row),
                    )
                    .optional()?;
                if let Some(holder) = holder {
                    return Ok(KeywordClaim::Held(holder));
                }

                tx.execute(
                    r#"INSERT INTO keyword_mappings (keyword, url, content_id, priority, search_volume, is_active)
                       VALUES (?1, ?2, ?3, ?4, ?5, 1)
                       ON CONFLICT(keyword) DO UPDATE SET
                           url = excluded.url,
                           content_id = excluded.content_id,
                           priority = excluded.priority,
                           search_volume = excluded.search_volume,
                           is_active = 1,
                           updated_at = datetime('now')"#,
                    params![
                        mapping.keyword,
                        mapping.url,
                        mapping.content_id,
                        mapping.priority.as_str(),
                        mapping.search_volume,
                    ],
                )?;
                let saved = tx.query_row(
                    &format!(
                        "SELECT {} FROM keyword_mappings m WHERE m.keyword = ?1",
                        MAPPING_COLUMNS
                    ),
                    params![mapping.keyword],
                    |row| mapping_from_row(row),
                )?;
                tx.commit()?;
                Ok(KeywordClaim::Saved(saved))
            })
            .await?;
        Ok(claim)
    }

    pub async fn get_keyword_mappings(&self) -> Result<Vec<KeywordMappingRow>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"SELECT {}, c.title, c.slug
                       FROM keyword_mappings m
                       JOIN content c ON m.content_id = c.id
                       ORDER BY m.keyword"#,
                    MAPPING_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(KeywordMappingRow {
                            mapping: mapping_from_row(row)?,
                            content_title: row.get(9)?,
                            content_slug: row.get(10)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    // Sitemap cache operations

    pub async fn upsert_sitemap_cache(
        &self,
        kind: SitemapKind,
        xml: String,
        url_count: i64,
        generated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO sitemap_cache (sitemap_type, xml, url_count, generated_at)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(sitemap_type) DO UPDATE SET
                           xml = excluded.xml,
                           url_count = excluded.url_count,
                           generated_at = excluded.generated_at"#,
                    params![kind.as_str(), xml, url_count, generated_at.to_rfc3339()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_sitemap_cache(&self, kind: SitemapKind) -> Result<Option<CachedSitemap>> {
        let cached = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT xml, url_count, generated_at FROM sitemap_cache WHERE sitemap_type = ?1",
                )?;
                let cached = stmt
                    .query_row(params![kind.as_str()], |row| {
                        Ok(CachedSitemap {
                            kind,
                            xml: row.get(0)?,
                            url_count: row.get(1)?,
                            generated_at: timestamp_column(row, 2)?,
                        })
                    })
                    .optional()?;
                Ok(cached)
            })
            .await?;
        Ok(cached)
    }

    /// Delete one cache row, or every row when `kind` is None. Returns rows removed.
    pub async fn delete_sitemap_cache(&self, kind: Option<SitemapKind>) -> Result<usize> {
        let removed = self
            .conn
            .call(move |conn| {
                let rows = match kind {
                    Some(kind) => conn.execute(
                        "DELETE FROM sitemap_cache WHERE sitemap_type = ?1",
                        params![kind.as_str()],
                    )?,
                    None => conn.execute("DELETE FROM sitemap_cache", [])?,
                };
                Ok(rows)
            })
            .await?;
        Ok(removed)
    }

    pub async fn sitemap_cache_stats(&self) -> Result<Vec<SitemapCacheStat>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT sitemap_type, url_count, generated_at FROM sitemap_cache ORDER BY sitemap_type",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        let kind: String = row.get(0)?;
                        Ok((kind, row.get::<_, i64>(1)?, timestamp_column(row, 2)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(kind, url_count, generated_at)| {
                kind.parse::<SitemapKind>().ok().map(|kind| SitemapCacheStat {
                    kind,
                    url_count,
                    generated_at,
                })
            })
            .collect())
    }
}

/// Serialised JSON columns, computed before entering the connection thread.
struct EncodedRecord {
    record: ContentRecord,
    quiz_data: String,
    faqs: String,
    target_keywords: String,
    breadcrumb_path: String,
}

impl EncodedRecord {
    fn new(record: ContentRecord) -> Result<Self> {
        Ok(Self {
            quiz_data: serde_json::to_string(&record.quiz_data)?,
            faqs: serde_json::to_string(&record.faqs)?,
            target_keywords: serde_json::to_string(&record.target_keywords)?,
            breadcrumb_path: serde_json::to_string(&record.breadcrumb_path)?,
            record,
        })
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

/// Decode a JSON text column. NULL or blank yields the empty value; malformed JSON is an error.
fn json_column<T: DeserializeOwned + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        _ => Ok(T::default()),
    }
}

fn content_from_row(row: &Row) -> rusqlite::Result<ContentItem> {
    Ok(ContentItem {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        blog_content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        youtube_id: row.get(5)?,
        quiz_data: json_column(row, 6)?,
        faqs: json_column(row, 7)?,
        primary_keyword: row.get(8)?,
        target_keywords: json_column(row, 9)?,
        year_slug: row.get(10)?,
        unit_number: row.get(11)?,
        canonical_url: row.get(12)?,
        breadcrumb_path: json_column(row, 13)?,
        internal_links: json_column(row, 14)?,
        word_count: row.get(15)?,
        reading_time_minutes: row.get(16)?,
        is_indexable: row.get::<_, i64>(17)? != 0,
        priority: row.get(18)?,
        changefreq: row
            .get::<_, Option<String>>(19)?
            .and_then(|s| s.parse().ok()),
        created_at: timestamp_column(row, 20)?,
        updated_at: timestamp_column(row, 21)?,
    })
}

fn summary_from_row(row: &Row) -> rusqlite::Result<ContentSummary> {
    Ok(ContentSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        subject_id: row.get(3)?,
        year_slug: row.get(4)?,
        unit_number: row.get(5)?,
        word_count: row.get(6)?,
        canonical_url: row.get(7)?,
    })
}

fn mapping_from_row(row: &Row) -> rusqlite::Result<KeywordMapping> {
    Ok(KeywordMapping {
        id: row.get(0)?,
        keyword: row.get(1)?,
        url: row.get(2)?,
        content_id: row.get(3)?,
        priority: KeywordPriority::parse(&row.get::<_, String>(4)?),
        search_volume: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
    })
}
