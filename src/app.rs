use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    dedup_keywords, ContentItem, ContentRecord, ContentSummary, ContentUpdate, NewContent,
};
use crate::services::events::{spawn_link_subscriber, spawn_sitemap_subscriber};
use crate::services::url_mapper::{self, BreadcrumbInput};
use crate::services::{
    ContentEvent, EventBus, KeywordService, LinkingEngine, QualityReporter, SitemapService,
};

/// Slug picks per write before a UNIQUE violation is returned to the caller.
const SLUG_ATTEMPTS: u32 = 3;

pub struct App {
    pub repository: Arc<Repository>,
    pub linking: Arc<LinkingEngine>,
    pub keywords: Arc<KeywordService>,
    pub sitemaps: Arc<SitemapService>,
    pub quality: QualityReporter,
    pub events: EventBus,
    clock: Arc<dyn Clock>,
    base_url: String,
    subscribers: Vec<JoinHandle<()>>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        Ok(Self::with_repository(
            repository,
            config,
            Arc::new(SystemClock),
        ))
    }

    /// Wire services around an open repository and start the event subscribers.
    pub fn with_repository(
        repository: Repository,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let repository = Arc::new(repository);
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let linking = Arc::new(LinkingEngine::new(repository.clone(), base_url.clone()));
        let keywords = Arc::new(KeywordService::new(repository.clone()));
        let sitemaps = Arc::new(SitemapService::new(
            repository.clone(),
            clock.clone(),
            base_url.clone(),
            config.sitemap_max_age_hours,
        ));
        let quality = QualityReporter::new(
            repository.clone(),
            linking.clone(),
            keywords.clone(),
            sitemaps.clone(),
            clock.clone(),
        );

        let events = EventBus::new(config.event_buffer);
        let subscribers = vec![
            spawn_link_subscriber(linking.clone(), &events),
            spawn_sitemap_subscriber(sitemaps.clone(), &events),
        ];

        Self {
            repository,
            linking,
            keywords,
            sitemaps,
            quality,
            events,
            clock,
            base_url,
            subscribers,
        }
    }

    // Content write path

    pub async fn create_content(&self, content: NewContent) -> Result<ContentItem> {
        let draft = normalize_draft(content)?;

        // Another writer can take the slug between the lookup and the insert
        let mut attempt = 1;
        let id = loop {
            let slug = self.unique_slug(&draft.title, None).await?;
            let record = self.derive_record(draft.clone(), slug);
            match self.repository.insert_content(record).await {
                Err(AppError::Conflict(reason)) if attempt < SLUG_ATTEMPTS => {
                    tracing::debug!(attempt, %reason, "Slug taken before insert, retrying");
                    attempt += 1;
                }
                result => break result?,
            }
        };
        tracing::info!(content_id = id, "Created content");
        self.events.publish(ContentEvent::Created(id));

        self.fetch(id).await
    }

    pub async fn update_content(&self, id: i64, update: ContentUpdate) -> Result<ContentItem> {
        let existing = self.fetch(id).await?;
        let title_changed = update
            .title
            .as_deref()
            .is_some_and(|t| t.trim() != existing.title);

        let draft = normalize_draft(merge_update(&existing, update))?;

        let mut attempt = 1;
        loop {
            let slug = if title_changed {
                self.unique_slug(&draft.title, Some(id)).await?
            } else {
                existing.slug.clone()
            };
            let record = self.derive_record(draft.clone(), slug);
            match self.repository.update_content(id, record).await {
                Ok(true) => break,
                Ok(false) => return Err(AppError::not_found(format!("Content {} not found", id))),
                Err(AppError::Conflict(reason)) if title_changed && attempt < SLUG_ATTEMPTS => {
                    tracing::debug!(attempt, %reason, "Slug taken before update, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(content_id = id, "Updated content");
        self.events.publish(ContentEvent::Updated(id));

        self.fetch(id).await
    }

    pub async fn delete_content(&self, id: i64) -> Result<()> {
        if !self.repository.delete_content(id).await? {
            return Err(AppError::not_found(format!("Content {} not found", id)));
        }
        tracing::info!(content_id = id, "Deleted content");
        self.events.publish(ContentEvent::Deleted(id));
        Ok(())
    }

    pub async fn get_content(&self, id: i64) -> Result<ContentItem> {
        self.fetch(id).await
    }

    pub async fn list_content(&self) -> Result<Vec<ContentSummary>> {
        self.repository.list_content().await
    }

    async fn fetch(&self, id: i64) -> Result<ContentItem> {
        self.repository
            .get_content(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Content {} not found", id)))
    }

    /// First free slug among `{slug}`, `{slug}-{millis}`, `{slug}-{millis}-2`, ...
    /// An empty title slug starts from `content-{millis}`.
    async fn unique_slug(&self, title: &str, exclude_id: Option<i64>) -> Result<String> {
        let slug = url_mapper::generate_slug(title);
        if !slug.is_empty() && !self.repository.slug_exists(&slug, exclude_id).await? {
            return Ok(slug);
        }

        let stamp = self.clock.now().timestamp_millis();
        let stamped = if slug.is_empty() {
            format!("content-{}", stamp)
        } else {
            format!("{}-{}", slug, stamp)
        };
        let mut candidate = stamped.clone();
        let mut n = 1;
        while self.repository.slug_exists(&candidate, exclude_id).await? {
            n += 1;
            candidate = format!("{}-{}", stamped, n);
        }
        if !slug.is_empty() {
            tracing::debug!(%slug, disambiguated = %candidate, "Slug collision");
        }
        Ok(candidate)
    }

    fn derive_record(&self, draft: NewContent, slug: String) -> ContentRecord {
        let year = draft.year_slug.as_deref();
        let year_title = year.map(url_mapper::year_title);
        let subject_slug = url_mapper::subject_slug(&draft.subject_id);
        let subject_title = url_mapper::subject_title(&draft.subject_id);

        let canonical_url =
            url_mapper::content_canonical_url(&self.base_url, year, &draft.subject_id, &slug);
        let breadcrumb_path = url_mapper::generate_breadcrumbs(
            &self.base_url,
            BreadcrumbInput {
                year_slug: year,
                year_title: year_title.as_deref(),
                subject_slug: Some(&subject_slug),
                subject_title: Some(&subject_title),
                unit_slug: Some(&slug),
                unit_title: Some(&draft.title),
            },
        );
        let word_count = url_mapper::extract_word_count(&draft.blog_content);

        ContentRecord {
            canonical_url,
            breadcrumb_path,
            word_count,
            reading_time_minutes: url_mapper::calculate_reading_time(word_count),
            is_indexable: draft.is_indexable.unwrap_or(true),
            subject_id: draft.subject_id,
            title: draft.title,
            slug,
            blog_content: draft.blog_content,
            youtube_id: draft.youtube_id,
            quiz_data: draft.quiz_data,
            faqs: draft.faqs,
            primary_keyword: draft.primary_keyword,
            target_keywords: draft.target_keywords,
            year_slug: draft.year_slug,
            unit_number: draft.unit_number,
            priority: draft.priority,
            changefreq: draft.changefreq,
        }
    }

    /// Stop the background subscribers once queued events are handled.
    pub async fn shutdown(self) {
        let App {
            events,
            subscribers,
            ..
        } = self;
        drop(events);
        for handle in subscribers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Event subscriber ended abnormally");
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim and validate editorial input.
fn normalize_draft(mut draft: NewContent) -> Result<NewContent> {
    draft.title = draft.title.trim().to_string();
    draft.subject_id = draft.subject_id.trim().to_string();
    if draft.title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    if draft.subject_id.is_empty() {
        return Err(AppError::bad_request("subjectId must not be empty"));
    }
    if let Some(priority) = draft.priority {
        if !(0.0..=1.0).contains(&priority) {
            return Err(AppError::bad_request("priority must be between 0.0 and 1.0"));
        }
    }

    draft.year_slug = non_empty(draft.year_slug)
        .map(|y| url_mapper::generate_slug(&y))
        .filter(|y| !y.is_empty());
    draft.youtube_id = non_empty(draft.youtube_id);
    draft.primary_keyword = non_empty(draft.primary_keyword);
    draft.target_keywords = dedup_keywords(draft.target_keywords);
    Ok(draft)
}

fn merge_update(existing: &ContentItem, update: ContentUpdate) -> NewContent {
    NewContent {
        subject_id: update.subject_id.unwrap_or_else(|| existing.subject_id.clone()),
        title: update.title.unwrap_or_else(|| existing.title.clone()),
        blog_content: update
            .blog_content
            .unwrap_or_else(|| existing.blog_content.clone()),
        youtube_id: update.youtube_id.or_else(|| existing.youtube_id.clone()),
        quiz_data: update.quiz_data.unwrap_or_else(|| existing.quiz_data.clone()),
        faqs: update.faqs.unwrap_or_else(|| existing.faqs.clone()),
        primary_keyword: update
            .primary_keyword
            .or_else(|| existing.primary_keyword.clone()),
        target_keywords: update
            .target_keywords
            .unwrap_or_else(|| existing.target_keywords.clone()),
        year_slug: update.year_slug.or_else(|| existing.year_slug.clone()),
        unit_number: update.unit_number.or(existing.unit_number),
        is_indexable: Some(update.is_indexable.unwrap_or(existing.is_indexable)),
        priority: update.priority.or(existing.priority),
        changefreq: update.changefreq.or(existing.changefreq),
    }
}
