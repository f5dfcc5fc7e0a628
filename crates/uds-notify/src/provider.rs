//! # Mapping Providers
//!
//! Where the rule document comes from. The engine asks a provider on every
//! event; the cached provider makes that cheap while still picking up
//! operator edits within the TTL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::mapping::MappingCatalog;
use crate::NotifyError;

/// A source of the current rule document.
pub trait MappingProvider: Send + Sync {
    /// The catalog to route with right now.
    fn catalog(&self) -> Result<MappingCatalog, NotifyError>;
}

/// A fixed in-memory catalog. Tests and embedded deployments.
#[derive(Debug, Clone)]
pub struct StaticMappingProvider {
    catalog: MappingCatalog,
}

impl StaticMappingProvider {
    /// Wrap a catalog.
    pub fn new(catalog: MappingCatalog) -> Self {
        Self { catalog }
    }
}

impl MappingProvider for StaticMappingProvider {
    fn catalog(&self) -> Result<MappingCatalog, NotifyError> {
        Ok(self.catalog.clone())
    }
}

/// Re-reads a YAML or JSON rule document from disk on every call.
#[derive(Debug, Clone)]
pub struct FileMappingProvider {
    path: PathBuf,
}

impl FileMappingProvider {
    /// Provider over a rule document on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MappingProvider for FileMappingProvider {
    fn catalog(&self) -> Result<MappingCatalog, NotifyError> {
        MappingCatalog::from_path(&self.path)
    }
}

/// Caches another provider's catalog for a TTL.
///
/// A load failure after a successful load serves the stale catalog and logs,
/// rather than silencing notifications because an operator saved a broken
/// edit mid-deploy.
pub struct CachedMappingProvider {
    inner: Arc<dyn MappingProvider>,
    ttl: Duration,
    cache: Mutex<Option<(Instant, MappingCatalog)>>,
}

impl CachedMappingProvider {
    /// Cache `inner` for `ttl` per load.
    pub fn new(inner: Arc<dyn MappingProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(None),
        }
    }
}

impl MappingProvider for CachedMappingProvider {
    fn catalog(&self) -> Result<MappingCatalog, NotifyError> {
        let mut cache = self.cache.lock();
        if let Some((loaded_at, catalog)) = cache.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(catalog.clone());
            }
        }
        match self.inner.catalog() {
            Ok(fresh) => {
                *cache = Some((Instant::now(), fresh.clone()));
                Ok(fresh)
            }
            Err(err) => match cache.take() {
                Some((_, stale)) => {
                    tracing::warn!(error = %err, "mapping reload failed; serving stale catalog");
                    *cache = Some((Instant::now(), stale.clone()));
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        loads: AtomicUsize,
        fail: bool,
    }

    impl MappingProvider for CountingProvider {
        fn catalog(&self) -> Result<MappingCatalog, NotifyError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Validation("boom".to_string()))
            } else {
                Ok(MappingCatalog::default())
            }
        }
    }

    #[test]
    fn cache_serves_within_ttl_without_reloading() {
        let inner = Arc::new(CountingProvider {
            loads: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedMappingProvider::new(inner.clone(), Duration::from_secs(60));
        cached.catalog().unwrap();
        cached.catalog().unwrap();
        cached.catalog().unwrap();
        assert_eq!(inner.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_cache_reloads() {
        let inner = Arc::new(CountingProvider {
            loads: AtomicUsize::new(0),
            fail: false,
        });
        let cached = CachedMappingProvider::new(inner.clone(), Duration::ZERO);
        cached.catalog().unwrap();
        cached.catalog().unwrap();
        assert_eq!(inner.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_load_failure_surfaces() {
        let inner = Arc::new(CountingProvider {
            loads: AtomicUsize::new(0),
            fail: true,
        });
        let cached = CachedMappingProvider::new(inner, Duration::from_secs(60));
        assert!(cached.catalog().is_err());
    }

    #[test]
    fn file_provider_reads_yaml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.yaml");
        std::fs::write(
            &path,
            "- mappingId: m1\n  eventType: ENTITY_SUBMITTED\n  recipients:\n    - strategy: requestor\n  channels: [email]\n  templateKey: t\n",
        )
        .unwrap();
        let provider = FileMappingProvider::new(&path);
        let catalog = provider.catalog().unwrap();
        assert_eq!(catalog.mappings.len(), 1);
        assert_eq!(catalog.mappings[0].mapping_id, "m1");
    }
}
