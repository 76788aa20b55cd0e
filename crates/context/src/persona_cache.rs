//! Persona render cache.
//!
//! Keyed by persona id plus a fingerprint of the card and the variables it
//! was rendered with, so concurrent calls with different personas (or
//! different variables for the same persona) never see each other's output.
//! The cache is shareable across assemblers through an `Arc`.

use dashmap::DashMap;
use loreweave_core::{
    CollaboratorError, Persona, PersonaId, PersonaRenderer, RenderedPersona, Variables,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    persona: PersonaId,
    fingerprint: u64,
}

impl CacheKey {
    fn new(persona: &Persona, variables: &Variables) -> Self {
        let mut hasher = DefaultHasher::new();
        persona.hash(&mut hasher);
        variables.hash(&mut hasher);
        Self {
            persona: persona.id.clone(),
            fingerprint: hasher.finish(),
        }
    }
}

struct CacheEntry {
    rendered: Arc<RenderedPersona>,
    inserted: u64,
}

/// Thread-safe cache of rendered personas.
pub struct PersonaCache {
    capacity: usize,
    entries: DashMap<CacheKey, CacheEntry>,
    clock: AtomicU64,
}

impl PersonaCache {
    /// Create a cache holding at most `capacity` renders. A capacity of 0
    /// disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Return the cached render for `(persona, variables)` or render it.
    ///
    /// Two concurrent misses on the same key may both render; the last
    /// insert wins and both callers get identical output.
    pub async fn get_or_render(
        &self,
        persona: &Persona,
        variables: &Variables,
        renderer: &dyn PersonaRenderer,
    ) -> Result<Arc<RenderedPersona>, CollaboratorError> {
        let key = CacheKey::new(persona, variables);
        let cached = self.entries.get(&key).map(|entry| Arc::clone(&entry.rendered));
        if let Some(rendered) = cached {
            debug!(persona = %persona.id, "Persona cache hit");
            return Ok(rendered);
        }

        let rendered = Arc::new(renderer.render(persona, variables).await?);
        if self.capacity == 0 {
            return Ok(rendered);
        }

        self.enforce_capacity();
        let inserted = self.clock.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key,
            CacheEntry {
                rendered: Arc::clone(&rendered),
                inserted,
            },
        );
        debug!(persona = %persona.id, entries = self.entries.len(), "Persona rendered and cached");
        Ok(rendered)
    }

    /// Evict oldest insertions until there is room for one more entry.
    fn enforce_capacity(&self) {
        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().inserted)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl Default for PersonaCache {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::CountingRenderer;

    fn persona(id: &str) -> Persona {
        Persona {
            description: format!("{id} is a character."),
            ..Persona::new(id, id)
        }
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let cache = PersonaCache::new(8);
        let renderer = CountingRenderer::default();
        let vars = Variables::new();

        let a = cache.get_or_render(&persona("aria"), &vars, &renderer).await.unwrap();
        let b = cache.get_or_render(&persona("aria"), &vars, &renderer).await.unwrap();

        assert_eq!(renderer.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_variables_render_separately() {
        let cache = PersonaCache::new(8);
        let renderer = CountingRenderer::default();
        let mut vars = Variables::new();
        cache.get_or_render(&persona("aria"), &vars, &renderer).await.unwrap();
        vars.insert("user".into(), "Sam".into());
        cache.get_or_render(&persona("aria"), &vars, &renderer).await.unwrap();

        assert_eq!(renderer.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn edited_card_is_not_served_stale() {
        let cache = PersonaCache::new(8);
        let renderer = CountingRenderer::default();
        let vars = Variables::new();
        let mut card = persona("aria");
        cache.get_or_render(&card, &vars, &renderer).await.unwrap();
        card.description = "Aria has changed.".into();
        let out = cache.get_or_render(&card, &vars, &renderer).await.unwrap();

        assert_eq!(renderer.calls(), 2);
        assert_eq!(out.messages[0].content, "Aria has changed.");
    }

    #[tokio::test]
    async fn evicts_oldest_at_capacity() {
        let cache = PersonaCache::new(2);
        let renderer = CountingRenderer::default();
        let vars = Variables::new();
        for id in ["a", "b", "c"] {
            cache.get_or_render(&persona(id), &vars, &renderer).await.unwrap();
        }
        assert_eq!(cache.len(), 2);

        // "a" was evicted, "c" is still cached.
        cache.get_or_render(&persona("c"), &vars, &renderer).await.unwrap();
        assert_eq!(renderer.calls(), 3);
        cache.get_or_render(&persona("a"), &vars, &renderer).await.unwrap();
        assert_eq!(renderer.calls(), 4);
    }

    #[tokio::test]
    async fn zero_capacity_disables_caching() {
        let cache = PersonaCache::new(0);
        let renderer = CountingRenderer::default();
        let vars = Variables::new();
        cache.get_or_render(&persona("a"), &vars, &renderer).await.unwrap();
        cache.get_or_render(&persona("a"), &vars, &renderer).await.unwrap();
        assert_eq!(renderer.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_personas_do_not_collide() {
        let cache = Arc::new(PersonaCache::new(8));
        let renderer = Arc::new(CountingRenderer::default());

        let mut handles = Vec::new();
        for id in ["knight", "witch", "bard", "knight", "witch"] {
            let cache = Arc::clone(&cache);
            let renderer = Arc::clone(&renderer);
            handles.push(tokio::spawn(async move {
                let out = cache
                    .get_or_render(&persona(id), &Variables::new(), renderer.as_ref())
                    .await
                    .unwrap();
                (id, out.messages[0].content.clone())
            }));
        }
        for handle in handles {
            let (id, content) = handle.await.unwrap();
            assert_eq!(content, format!("{id} is a character."));
        }
        assert_eq!(cache.len(), 3);
    }
}
