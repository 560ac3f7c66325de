pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- content table
CREATE TABLE IF NOT EXISTS content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    blog_content TEXT NOT NULL DEFAULT '',
    youtube_id TEXT,
    quiz_data TEXT,
    faqs TEXT,
    primary_keyword TEXT,
    target_keywords TEXT,
    year_slug TEXT,
    unit_number INTEGER,
    canonical_url TEXT,
    breadcrumb_path TEXT,
    internal_links TEXT,
    word_count INTEGER NOT NULL DEFAULT 0,
    reading_time_minutes INTEGER NOT NULL DEFAULT 0,
    is_indexable INTEGER NOT NULL DEFAULT 1,
    priority REAL,
    changefreq TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_content_subject_year ON content(subject_id, year_slug);
CREATE INDEX IF NOT EXISTS idx_content_primary_keyword ON content(primary_keyword);

-- keyword_mappings table
CREATE TABLE IF NOT EXISTS keyword_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    content_id INTEGER NOT NULL REFERENCES content(id) ON DELETE CASCADE,
    priority TEXT NOT NULL DEFAULT 'primary',
    search_volume INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_keyword_mappings_content_id ON keyword_mappings(content_id);

-- sitemap_cache table (one row per sitemap type)
CREATE TABLE IF NOT EXISTS sitemap_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sitemap_type TEXT NOT NULL UNIQUE,
    xml TEXT NOT NULL,
    url_count INTEGER NOT NULL DEFAULT 0,
    generated_at TEXT NOT NULL
);
"#;
