//! Pure URL and text derivations for content pages.
//!
//! Every function here is deterministic; the only input besides its
//! arguments is the site origin passed in by the caller.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Breadcrumb;

const WORDS_PER_MINUTE: i64 = 200;

/// Root path segment of the curriculum.
pub const PROGRAM_SEGMENT: &str = "bpharm";
pub const PROGRAM_TITLE: &str = "B.Pharm";

static SEPARATORS: OnceLock<Regex> = OnceLock::new();
static DISALLOWED: OnceLock<Regex> = OnceLock::new();
static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();
static HTML_TAGS: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex must compile"))
}

/// URL-safe slug: lowercase ASCII words joined by single hyphens.
///
/// Returns an empty string when nothing survives stripping; callers pick
/// their own fallback.
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let hyphenated = regex(&SEPARATORS, r"[\s_]+").replace_all(lowered.trim(), "-");
    let stripped = regex(&DISALLOWED, r"[^a-z0-9-]").replace_all(&hyphenated, "");
    let collapsed = regex(&HYPHEN_RUNS, r"-{2,}").replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Path parts of a canonical URL; absent or empty parts are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalParts<'a> {
    pub year_slug: Option<&'a str>,
    pub subject_slug: Option<&'a str>,
    pub unit_slug: Option<&'a str>,
}

/// `{base}/bpharm[/year][/subject][/unit]`
pub fn generate_canonical_url(base_url: &str, parts: CanonicalParts<'_>) -> String {
    let mut url = format!("{}/{}", base_url.trim_end_matches('/'), PROGRAM_SEGMENT);
    for segment in [parts.year_slug, parts.subject_slug, parts.unit_slug]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
    {
        url.push('/');
        url.push_str(segment);
    }
    url
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BreadcrumbInput<'a> {
    pub year_slug: Option<&'a str>,
    pub year_title: Option<&'a str>,
    pub subject_slug: Option<&'a str>,
    pub subject_title: Option<&'a str>,
    pub unit_slug: Option<&'a str>,
    pub unit_title: Option<&'a str>,
}

fn both<'a>(slug: Option<&'a str>, title: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    match (slug, title) {
        (Some(s), Some(t)) if !s.is_empty() && !t.is_empty() => Some((s, t)),
        _ => None,
    }
}

pub fn generate_breadcrumbs(base_url: &str, input: BreadcrumbInput<'_>) -> Vec<Breadcrumb> {
    let base = base_url.trim_end_matches('/');
    let mut crumbs = vec![
        Breadcrumb {
            name: "Home".to_string(),
            url: base.to_string(),
        },
        Breadcrumb {
            name: PROGRAM_TITLE.to_string(),
            url: generate_canonical_url(base, CanonicalParts::default()),
        },
    ];

    let year = both(input.year_slug, input.year_title);
    if let Some((slug, title)) = year {
        crumbs.push(Breadcrumb {
            name: title.to_string(),
            url: generate_canonical_url(
                base,
                CanonicalParts {
                    year_slug: Some(slug),
                    ..Default::default()
                },
            ),
        });
    }

    let subject = both(input.subject_slug, input.subject_title);
    if let Some((slug, title)) = subject {
        crumbs.push(Breadcrumb {
            name: title.to_string(),
            url: generate_canonical_url(
                base,
                CanonicalParts {
                    year_slug: year.map(|(s, _)| s),
                    subject_slug: Some(slug),
                    unit_slug: None,
                },
            ),
        });
    }

    if let Some((slug, title)) = both(input.unit_slug, input.unit_title) {
        crumbs.push(Breadcrumb {
            name: title.to_string(),
            url: generate_canonical_url(
                base,
                CanonicalParts {
                    year_slug: year.map(|(s, _)| s),
                    subject_slug: subject.map(|(s, _)| s),
                    unit_slug: Some(slug),
                },
            ),
        });
    }

    crumbs
}

/// Minutes to read at 200 words per minute, rounded up.
pub fn calculate_reading_time(word_count: i64) -> i64 {
    if word_count <= 0 {
        return 0;
    }
    (word_count + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
}

/// Words in an HTML fragment once tags are removed.
pub fn extract_word_count(html: &str) -> i64 {
    let text = regex(&HTML_TAGS, r"<[^>]*>").replace_all(html, " ");
    text.split_whitespace().count() as i64
}

/// `1st-year` -> `1st Year`
pub fn year_title(year_slug: &str) -> String {
    year_slug
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Subject codes display upper-cased (`bp101t` -> `BP101T`).
pub fn subject_title(subject_id: &str) -> String {
    subject_id.trim().to_uppercase()
}

pub fn subject_slug(subject_id: &str) -> String {
    generate_slug(subject_id)
}

/// Canonical URL of a content page from its stored hierarchy fields.
pub fn content_canonical_url(
    base_url: &str,
    year_slug: Option<&str>,
    subject_id: &str,
    slug: &str,
) -> String {
    let subject = subject_slug(subject_id);
    generate_canonical_url(
        base_url,
        CanonicalParts {
            year_slug,
            subject_slug: Some(&subject),
            unit_slug: Some(slug),
        },
    )
}
