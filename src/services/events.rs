//! Content change events and their background subscribers.
//!
//! Writes publish a [`ContentEvent`] once the row is committed; link
//! regeneration and sitemap invalidation run in their own tasks, so derived
//! data may lag a write briefly. Subscriber failures are logged only. A
//! subscriber that falls behind the bus rebuilds everything it owns.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::CacheTarget;

use super::linking::LinkingEngine;
use super::sitemap::SitemapService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEvent {
    Created(i64),
    Updated(i64),
    Deleted(i64),
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ContentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: ContentEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(?event, "No subscribers for content event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.tx.subscribe()
    }
}

/// What a subscriber task receives from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Event(ContentEvent),
    /// The receiver fell behind and this many events were dropped.
    Lagged(u64),
}

/// Drain `rx` until the bus closes, handing each delivery to `handle`.
fn spawn_subscriber<F, Fut>(
    name: &'static str,
    mut rx: broadcast::Receiver<ContentEvent>,
    mut handle: F,
) -> JoinHandle<()>
where
    F: FnMut(Delivery) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handle(Delivery::Event(event)).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = name, skipped, "Content event subscriber lagged");
                    handle(Delivery::Lagged(skipped)).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!(subscriber = name, "Content event bus closed");
                    break;
                }
            }
        }
    })
}

pub async fn handle_link_event(engine: &LinkingEngine, event: ContentEvent) {
    match event {
        ContentEvent::Created(id) | ContentEvent::Updated(id) => {
            if let Err(e) = engine.generate_links(id).await {
                tracing::warn!(content_id = id, error = %e, "Background link generation failed");
            }
        }
        // other bundles keep their references until their next regeneration
        ContentEvent::Deleted(_) => {}
    }
}

/// Dropped events name unknown ids, so every bundle is rebuilt.
pub async fn resync_links(engine: &LinkingEngine, skipped: u64) {
    tracing::info!(skipped, "Regenerating all link bundles after lag");
    match engine.regenerate_all_links().await {
        Ok(summary) if summary.failed > 0 => {
            tracing::warn!(
                failed = summary.failed,
                "Some bundles failed after lag; run --regenerate-links to retry"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Link resync failed; run --regenerate-links to recover"
            );
        }
    }
}

/// Any delivery, lagged or not, drops every cached sitemap.
pub async fn handle_sitemap_event(sitemaps: &SitemapService, delivery: Delivery) {
    if let Err(e) = sitemaps.invalidate_cache(CacheTarget::All).await {
        tracing::warn!(?delivery, error = %e, "Background sitemap invalidation failed");
    }
}

pub fn spawn_link_subscriber(engine: Arc<LinkingEngine>, bus: &EventBus) -> JoinHandle<()> {
    spawn_subscriber("links", bus.subscribe(), move |delivery| {
        let engine = engine.clone();
        async move {
            match delivery {
                Delivery::Event(event) => handle_link_event(&engine, event).await,
                Delivery::Lagged(skipped) => resync_links(&engine, skipped).await,
            }
        }
    })
}

pub fn spawn_sitemap_subscriber(sitemaps: Arc<SitemapService>, bus: &EventBus) -> JoinHandle<()> {
    spawn_subscriber("sitemap", bus.subscribe(), move |delivery| {
        let sitemaps = sitemaps.clone();
        async move { handle_sitemap_event(&sitemaps, delivery).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::db::Repository;
    use crate::models::SitemapKind;
    use crate::test_utils::{record, BASE_URL};
    use std::time::Duration;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(ContentEvent::Created(1)), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.publish(ContentEvent::Updated(7)), 2);
        assert_eq!(a.recv().await.unwrap(), ContentEvent::Updated(7));
        assert_eq!(b.recv().await.unwrap(), ContentEvent::Updated(7));
    }

    #[tokio::test]
    async fn test_link_event_for_missing_content_is_swallowed() {
        let repo = Arc::new(Repository::in_memory().await.unwrap());
        let engine = LinkingEngine::new(repo, BASE_URL);
        // must not panic or propagate
        handle_link_event(&engine, ContentEvent::Created(404)).await;
    }

    #[tokio::test]
    async fn test_subscribers_eventually_apply_changes() {
        let repo = Arc::new(Repository::in_memory().await.unwrap());
        let engine = Arc::new(LinkingEngine::new(repo.clone(), BASE_URL));
        let sitemaps = Arc::new(SitemapService::new(
            repo.clone(),
            Arc::new(SystemClock),
            BASE_URL,
            24,
        ));
        let bus = EventBus::new(8);
        let links = spawn_link_subscriber(engine, &bus);
        let invalidator = spawn_sitemap_subscriber(sitemaps.clone(), &bus);

        sitemaps.get_sitemap(SitemapKind::Core).await.unwrap();
        let id = repo
            .insert_content(record("Unit One", "BP101T", Some("1st-year"), Some(1)))
            .await
            .unwrap();
        assert_eq!(bus.publish(ContentEvent::Created(id)), 2);

        let mut applied = false;
        for _ in 0..100 {
            let item = repo.get_content(id).await.unwrap().unwrap();
            let cache_empty = sitemaps.cache_stats().await.unwrap().is_empty();
            if item.internal_links.is_some() && cache_empty {
                applied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(applied, "subscribers did not apply the event in time");

        drop(bus);
        links.await.unwrap();
        invalidator.await.unwrap();
    }

    #[tokio::test]
    async fn test_lagged_link_subscriber_regenerates_everything() {
        let repo = Arc::new(Repository::in_memory().await.unwrap());
        let engine = Arc::new(LinkingEngine::new(repo.clone(), BASE_URL));
        let mut ids = Vec::new();
        for (title, unit) in [("Unit One", 1), ("Unit Two", 2), ("Unit Three", 3)] {
            let id = repo
                .insert_content(record(title, "BP101T", Some("1st-year"), Some(unit)))
                .await
                .unwrap();
            ids.push(id);
        }

        // The current-thread runtime does not poll the subscriber until we
        // await, so a one-slot bus overflows and only the last event survives.
        let bus = EventBus::new(1);
        let links = spawn_link_subscriber(engine, &bus);
        for id in &ids {
            bus.publish(ContentEvent::Created(*id));
        }

        let mut applied = false;
        for _ in 0..100 {
            let items = repo.get_all_content().await.unwrap();
            if items.iter().all(|item| item.internal_links.is_some()) {
                applied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(applied, "skipped items never got a link bundle");

        drop(bus);
        links.await.unwrap();
    }
}
