//! Fixtures shared by unit tests.

use chrono::{Duration, TimeZone, Utc};

use crate::config::Config;
use crate::models::{ContentItem, ContentRecord};
use crate::services::url_mapper;

pub const BASE_URL: &str = "https://pharmacy.example";

/// Config for in-memory apps; never touches the user's data directory.
pub fn test_config(admin_token: Option<&str>) -> Config {
    Config {
        db_path: ":memory:".to_string(),
        base_url: BASE_URL.to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        admin_token: admin_token.map(str::to_string),
        sitemap_max_age_hours: 24,
        event_buffer: 16,
    }
}

/// Derived-complete record for direct repository inserts.
pub fn record(
    title: &str,
    subject_id: &str,
    year_slug: Option<&str>,
    unit: Option<i64>,
) -> ContentRecord {
    let slug = url_mapper::generate_slug(title);
    ContentRecord {
        subject_id: subject_id.to_string(),
        title: title.to_string(),
        canonical_url: url_mapper::content_canonical_url(BASE_URL, year_slug, subject_id, &slug),
        slug,
        blog_content: String::new(),
        youtube_id: None,
        quiz_data: vec![],
        faqs: vec![],
        primary_keyword: None,
        target_keywords: vec![],
        year_slug: year_slug.map(str::to_string),
        unit_number: unit,
        breadcrumb_path: vec![],
        word_count: 0,
        reading_time_minutes: 0,
        is_indexable: true,
        priority: None,
        changefreq: None,
    }
}

/// In-memory item; creation time increases with `id`.
pub fn item(
    id: i64,
    title: &str,
    subject_id: &str,
    year_slug: Option<&str>,
    unit: Option<i64>,
) -> ContentItem {
    let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(id);
    let record = record(title, subject_id, year_slug, unit);
    ContentItem {
        id,
        subject_id: record.subject_id,
        title: record.title,
        slug: record.slug,
        blog_content: record.blog_content,
        youtube_id: None,
        quiz_data: vec![],
        faqs: vec![],
        primary_keyword: None,
        target_keywords: vec![],
        year_slug: record.year_slug,
        unit_number: unit,
        canonical_url: Some(record.canonical_url),
        breadcrumb_path: vec![],
        internal_links: None,
        word_count: 0,
        reading_time_minutes: 0,
        is_indexable: true,
        priority: None,
        changefreq: None,
        created_at,
        updated_at: created_at,
    }
}
