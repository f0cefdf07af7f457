use std::collections::HashMap;

use cogex_core::{AssetKind, AssetRequest, LoadError, StimulusLoader};
pub use string_cache::DefaultAtom as Atom;
use tracing::debug;

/// Registry of preloaded stimuli for one session.
///
/// Entries are keyed by asset kind plus content identifier (resolved path or
/// literal text). An entry is created on first reference and lives as long
/// as the catalog; nothing is ever reloaded or evicted.
#[derive(Debug)]
pub struct StimulusCatalog<H> {
    entries: HashMap<(AssetKind, Atom), H>,
}

impl<H: Clone> StimulusCatalog<H> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the existing handle for `request`, or loads it through
    /// `loader` and registers it. A load failure leaves the catalog unchanged.
    pub fn resolve_and_load<L>(&mut self, loader: &mut L, request: &AssetRequest) -> Result<H, LoadError>
    where
        L: StimulusLoader<Handle = H>,
    {
        let key = (request.kind, Atom::from(request.key.as_str()));
        if let Some(handle) = self.entries.get(&key) {
            return Ok(handle.clone());
        }
        let handle = loader.load(request)?;
        debug!(kind = %request.kind, key = %request.key, "preloaded stimulus");
        self.entries.insert(key, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, kind: AssetKind, key: &str) -> Option<&H> {
        self.entries.get(&(kind, Atom::from(key)))
    }

    pub fn contains(&self, kind: AssetKind, key: &str) -> bool {
        self.get(kind, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: Clone> Default for StimulusCatalog<H> {
    fn default() -> Self {
        Self::new()
    }
}
