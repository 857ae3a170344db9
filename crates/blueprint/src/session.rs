//! Memoised reads of remote state.
//!
//! A planning pass reads the session context once and describes each
//! desired object once. Both reads are cached per connection identity and
//! stay cached until explicitly invalidated: [`ObservationCache::cache_clear`]
//! drops session reads, [`ObservationCache::reset_cache`] drops catalog
//! reads. A caller that applies a plan and wants the next plan to see the
//! result must reset the catalog cache in between.

use crate::connection::{Connection, Descriptor, SessionContext};
use crate::error::Result;
use crate::kind::ResourceKind;
use crate::resource::{Location, Urn};
use ddl::Identifier;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session context per connection identity.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<String, SessionContext>>,
}

impl SessionCache {
    pub fn fetch(&self, conn: &dyn Connection) -> Result<SessionContext> {
        let key = conn.identity();
        if let Some(session) = lock(&self.entries).get(&key) {
            debug!("Session cache hit for {key}");
            return Ok(session.clone());
        }

        let session = conn.session()?;
        debug!(
            "Fetched session for {key}: edition {}",
            session.account_edition
        );
        lock(&self.entries).insert(key, session.clone());
        Ok(session)
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type ListingKey = (String, ResourceKind, Location);

/// Describe and list results per connection identity.
#[derive(Debug, Default)]
pub struct CatalogCache {
    describes: Mutex<HashMap<(String, Urn), Option<Descriptor>>>,
    listings: Mutex<HashMap<ListingKey, Vec<Identifier>>>,
}

impl CatalogCache {
    pub fn describe(&self, conn: &dyn Connection, urn: &Urn) -> Result<Option<Descriptor>> {
        let key = (conn.identity(), urn.clone());
        if let Some(found) = lock(&self.describes).get(&key) {
            return Ok(found.clone());
        }

        let found = conn.describe(urn)?;
        debug!(
            "Described {urn}: {}",
            if found.is_some() { "exists" } else { "absent" }
        );
        lock(&self.describes).insert(key, found.clone());
        Ok(found)
    }

    pub fn list(&self, conn: &dyn Connection, kind: ResourceKind, location: &Location) -> Result<Vec<Identifier>> {
        let key = (conn.identity(), kind, location.clone());
        if let Some(names) = lock(&self.listings).get(&key) {
            return Ok(names.clone());
        }

        let names = conn.list(kind, location)?;
        debug!("Listed {} {kind} object(s) in {location}", names.len());
        lock(&self.listings).insert(key, names.clone());
        Ok(names)
    }

    pub fn reset(&self) {
        lock(&self.describes).clear();
        lock(&self.listings).clear();
    }
}

/// Session and catalog caches, shared between blueprints with `Arc`.
#[derive(Debug, Default)]
pub struct ObservationCache {
    pub session: SessionCache,
    pub catalog: CatalogCache,
}

impl ObservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached session contexts.
    pub fn cache_clear(&self) {
        self.session.clear();
    }

    /// Forget cached describe and list results.
    pub fn reset_cache(&self) {
        self.catalog.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Edition;
    use crate::memory::MemoryConnection;
    use crate::resource::Resource;

    #[test]
    fn test_session_read_once_until_cleared() {
        let conn = MemoryConnection::new("acme", Edition::Standard);
        let cache = ObservationCache::new();

        cache.session.fetch(&conn).unwrap();
        cache.session.fetch(&conn).unwrap();
        assert_eq!(conn.session_reads(), 1);

        cache.cache_clear();
        cache.session.fetch(&conn).unwrap();
        assert_eq!(conn.session_reads(), 2);
    }

    #[test]
    fn test_session_cache_keyed_by_identity() {
        let a = MemoryConnection::new("a", Edition::Standard);
        let b = MemoryConnection::new("b", Edition::Enterprise);
        let cache = SessionCache::default();

        assert_eq!(cache.fetch(&a).unwrap().account_edition, Edition::Standard);
        assert_eq!(cache.fetch(&b).unwrap().account_edition, Edition::Enterprise);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_catalog_cache_is_stale_until_reset() {
        let mut conn = MemoryConnection::new("acme", Edition::Standard);
        let cache = ObservationCache::new();
        let wh = Resource::new(ResourceKind::Warehouse, "wh").unwrap();

        assert_eq!(cache.catalog.describe(&conn, &wh.urn()).unwrap(), None);
        conn.seed(&Location::account(), &wh.create_sql(false)).unwrap();
        assert_eq!(cache.catalog.describe(&conn, &wh.urn()).unwrap(), None);
        assert_eq!(conn.describe_reads(), 1);

        cache.reset_cache();
        assert!(cache.catalog.describe(&conn, &wh.urn()).unwrap().is_some());
        assert_eq!(conn.describe_reads(), 2);
    }
}
