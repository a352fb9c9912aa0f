// Display picture resolution against the object store.
//
// Picture lookups run after the roster renders and race with filter
// changes, so every batch is tagged with a monotonic generation; the app
// loop discards results from superseded generations instead of letting a
// stale batch overwrite newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::gateway::ObjectStore;

/// Resolved picture URLs for one batch of visible roster entries.
#[derive(Debug, Clone)]
pub struct ImageBatch {
    pub generation: u64,
    /// (roster entry id, picture URL) pairs.
    pub urls: Vec<(String, String)>,
}

pub struct ImageResolver {
    store: Arc<dyn ObjectStore>,
    /// Object-store folder holding player pictures.
    prefix: String,
    /// URL returned on any lookup failure or absence.
    placeholder_url: String,
    generation: AtomicU64,
}

impl ImageResolver {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str, placeholder_url: &str) -> Self {
        ImageResolver {
            store,
            prefix: prefix.trim_end_matches('/').to_string(),
            placeholder_url: placeholder_url.to_string(),
            generation: AtomicU64::new(0),
        }
    }

    /// Start a new batch, superseding all earlier ones.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a batch generation is still the latest one.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.current_generation()
    }

    /// Look up the picture URL for one entry's secondary identifier.
    ///
    /// Matching is a name-prefix comparison under the configured folder.
    /// Absence and store errors both degrade to the placeholder; this
    /// never returns an error and never touches selection or budget state.
    pub async fn resolve(&self, secondary_id: &str) -> String {
        if secondary_id.is_empty() {
            return self.placeholder_url.clone();
        }
        let prefix = format!("{}/{}", self.prefix, secondary_id);

        let name = match self.store.list_prefix(&prefix).await {
            Ok(names) => names.into_iter().next(),
            Err(e) => {
                debug!("picture listing failed for {}: {}", prefix, e);
                None
            }
        };

        match name {
            Some(name) => match self.store.public_url(&name).await {
                Ok(url) => url,
                Err(e) => {
                    debug!("picture URL resolution failed for {}: {}", name, e);
                    self.placeholder_url.clone()
                }
            },
            None => self.placeholder_url.clone(),
        }
    }

    /// Resolve pictures for a batch of (entry id, secondary id) pairs,
    /// tagged with the given generation.
    pub async fn resolve_batch(
        &self,
        generation: u64,
        entries: &[(String, String)],
    ) -> ImageBatch {
        let mut urls = Vec::with_capacity(entries.len());
        for (entry_id, secondary_id) in entries {
            urls.push((entry_id.clone(), self.resolve(secondary_id).await));
        }
        ImageBatch { generation, urls }
    }
}
