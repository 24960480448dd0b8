use crate::core::io::loader::{self, LoadError};
use crate::core::models::molecule::Molecule;
use crate::core::models::template::MoleculeTemplate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Identifies a point set by the pair of files it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub geometry: PathBuf,
    pub features: PathBuf,
}

impl SourceKey {
    /// Paths are canonicalized when they exist so that different spellings of
    /// the same file share an entry.
    pub fn new(geometry: &Path, features: &Path) -> Self {
        Self {
            geometry: canonical(geometry),
            features: canonical(features),
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Fixed-capacity least-recently-used cache of loaded point sets.
#[derive(Debug)]
pub struct SourceCache<V> {
    capacity: usize,
    clock: u64,
    entries: HashMap<SourceKey, (Arc<V>, u64)>,
}

impl<V> SourceCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            clock: 0,
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &SourceKey) -> bool {
        self.entries.contains_key(key)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn get(&mut self, key: &SourceKey) -> Option<Arc<V>> {
        let now = self.tick();
        self.entries.get_mut(key).map(|(value, last_used)| {
            *last_used = now;
            Arc::clone(value)
        })
    }

    pub fn insert(&mut self, key: SourceKey, value: V) -> Arc<V> {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }
        let now = self.tick();
        let value = Arc::new(value);
        self.entries.insert(key, (Arc::clone(&value), now));
        value
    }

    pub fn get_or_try_load<E>(
        &mut self,
        key: SourceKey,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.get(&key) {
            trace!(geometry = %key.geometry.display(), "Cache hit");
            return Ok(hit);
        }
        trace!(geometry = %key.geometry.display(), "Cache miss");
        let value = load()?;
        Ok(self.insert(key, value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (_, last_used))| *last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            trace!(geometry = %key.geometry.display(), "Evicting cache entry");
            self.entries.remove(&key);
        }
    }
}

/// Loaded molecules and templates, keyed by their source files.
#[derive(Debug)]
pub struct MoleculeCache {
    molecules: SourceCache<Molecule>,
    templates: SourceCache<MoleculeTemplate>,
}

impl Default for MoleculeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl MoleculeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            molecules: SourceCache::new(capacity),
            templates: SourceCache::new(capacity),
        }
    }

    pub fn molecule(
        &mut self,
        geometry: &Path,
        features: &Path,
    ) -> Result<Arc<Molecule>, LoadError> {
        self.molecules
            .get_or_try_load(SourceKey::new(geometry, features), || {
                loader::load_molecule(geometry, features)
            })
    }

    pub fn template(
        &mut self,
        geometry: &Path,
        features: &Path,
    ) -> Result<Arc<MoleculeTemplate>, LoadError> {
        self.templates
            .get_or_try_load(SourceKey::new(geometry, features), || {
                loader::load_template(geometry, features)
            })
    }

    pub fn molecules(&self) -> &SourceCache<Molecule> {
        &self.molecules
    }

    pub fn templates(&self) -> &SourceCache<MoleculeTemplate> {
        &self.templates
    }
}
