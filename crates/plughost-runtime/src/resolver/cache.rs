//! Content cache in front of [`ContentResolver`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::{debug, warn};

use plughost_core::config::content::ContentConfig;
use plughost_core::events::DomainEvent;

use super::{ContentResolver, ContentSource, ResolveError, ResolvedContent};
use crate::bus::{EventBus, EventHandler};
use crate::registry::ExtensionStatus;

/// `(extension id, activation time, path)`.
type CacheKey = (String, Option<DateTime<Utc>>, String);

type ContentCache = Cache<CacheKey, ResolvedContent>;

/// Events after which an extension's cached content is dropped.
const INVALIDATING_EVENTS: [&str; 4] = [
    "plugin:activated",
    "plugin:deactivated",
    "theme:activated",
    "theme:deactivated",
];

/// Caches resolved files per activation of an extension.
///
/// The record status is checked on every call, so a deactivated extension
/// stops serving immediately even before its entries are invalidated. Keys
/// carry the record's `activated_at`, so a read that finishes after a
/// reactivation is stored under the old activation and never served.
#[derive(Debug, Clone)]
pub struct CachedContentResolver {
    inner: ContentResolver,
    cache: ContentCache,
}

impl CachedContentResolver {
    /// Wraps `inner` and subscribes the invalidation handler on `bus`.
    pub async fn new(inner: ContentResolver, bus: &EventBus, config: &ContentConfig) -> Self {
        let cache: ContentCache = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .support_invalidation_closures()
            .build();

        let invalidator: Arc<dyn EventHandler> = Arc::new(CacheInvalidator {
            cache: cache.clone(),
        });
        for event in INVALIDATING_EVENTS.iter().chain(&["system:booting"]) {
            bus.subscribe(event, Arc::clone(&invalidator)).await;
        }

        Self { inner, cache }
    }

    /// Number of cached entries (approximate).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Drops every cached file of one extension.
    pub fn invalidate_extension(&self, id: &str) {
        invalidate(&self.cache, id);
    }
}

#[async_trait]
impl ContentSource for CachedContentResolver {
    async fn resolve(&self, id: &str, relative_path: &str) -> Result<ResolvedContent, ResolveError> {
        let record = self
            .inner
            .registry()
            .get(id)
            .await
            .ok_or_else(|| ResolveError::NotFound { id: id.to_string() })?;
        if record.status != ExtensionStatus::Active {
            return Err(ResolveError::Inactive {
                id: id.to_string(),
                status: record.status,
            });
        }

        let key = (id.to_string(), record.activated_at, relative_path.to_string());
        if let Some(hit) = self.cache.get(&key).await {
            debug!(extension_id = %id, "Content cache hit");
            return Ok(hit);
        }

        let content = self.inner.resolve(id, relative_path).await?;
        self.cache.insert(key, content.clone()).await;
        Ok(content)
    }
}

fn invalidate(cache: &ContentCache, id: &str) {
    let owner = id.to_string();
    if let Err(e) = cache.invalidate_entries_if(move |(key_id, _, _), _| *key_id == owner) {
        warn!(extension_id = %id, error = %e, "Failed to invalidate cached content");
    }
}

#[derive(Debug)]
struct CacheInvalidator {
    cache: ContentCache,
}

#[async_trait]
impl EventHandler for CacheInvalidator {
    fn name(&self) -> &str {
        "content-cache-invalidator"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), String> {
        if event.name == "system:booting" {
            self.cache.invalidate_all();
            return Ok(());
        }
        match event.payload_str("id") {
            Some(id) => {
                invalidate(&self.cache, id);
                Ok(())
            }
            None => Err(format!("event '{}' carries no extension id", event.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use plughost_core::config::extensions::ExtensionsConfig;
    use plughost_core::types::ExtensionKind;

    use super::*;
    use crate::catalog::ExtensionCatalog;
    use crate::manifest::ManifestLoader;
    use crate::registry::Registry;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        std::fs::write(path, body).expect("write");
    }

    #[tokio::test]
    async fn test_read_from_previous_activation_is_never_served() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("oauth");
        write(
            &root,
            "plugin.json",
            r#"{"id": "oauth", "version": "1.0.0", "main": "index.js"}"#,
        );
        write(&root, "components/Button.jsx", "v1");

        let bus = EventBus::new();
        let registry = Arc::new(Registry::new(
            Arc::new(ExtensionCatalog::new()),
            bus.clone(),
            &ExtensionsConfig::default(),
        ));
        let manifest = ManifestLoader::load(&root, ExtensionKind::Plugin)
            .await
            .expect("manifest");
        registry.register(manifest).await.expect("register");
        let first = registry.activate("oauth").await.expect("activate");

        let cached = CachedContentResolver::new(
            ContentResolver::new(Arc::clone(&registry), 1024),
            &bus,
            &ContentConfig::default(),
        )
        .await;
        let stale = cached
            .resolve("oauth", "components/Button.jsx")
            .await
            .expect("v1");

        registry.deactivate("oauth").await.expect("deactivate");
        write(&root, "components/Button.jsx", "v2");
        registry.activate("oauth").await.expect("reactivate");

        // A read begun before the update lands after the invalidations.
        cached
            .cache
            .insert(
                (
                    "oauth".to_string(),
                    first.activated_at,
                    "components/Button.jsx".to_string(),
                ),
                stale,
            )
            .await;

        let fresh = cached
            .resolve("oauth", "components/Button.jsx")
            .await
            .expect("v2");
        assert_eq!(&fresh.content[..], b"v2");
    }
}
