// ── Reactive keyed collection ──
//
// Concurrent storage keyed by numeric id, with a secondary alias index
// and push-based change notification via a `watch` channel.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection for one entity type.
///
/// Entries are keyed by numeric id and optionally reachable through a
/// string alias. Every replacement rebuilds the id-ordered snapshot that
/// subscribers receive.
pub(crate) struct KeyedCollection<T: Send + Sync + 'static> {
    by_id: DashMap<u64, Arc<T>>,

    /// Secondary index: alias -> numeric id.
    alias_to_id: DashMap<String, u64>,

    /// Reverse of `alias_to_id` for efficient removal.
    id_to_alias: DashMap<u64, String>,

    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> KeyedCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            alias_to_id: DashMap::new(),
            id_to_alias: DashMap::new(),
            snapshot,
        }
    }

    /// Replace the whole collection. Subscribers see a single change.
    ///
    /// New entries are written over the old ones before ids missing from
    /// `entries` are pruned, so a concurrent reader never sees a retained
    /// entry as absent.
    pub(crate) fn replace_all(&self, entries: impl IntoIterator<Item = (u64, Option<String>, T)>) {
        let mut keep = HashSet::new();
        for (id, alias, entity) in entries {
            keep.insert(id);
            self.insert_quiet(id, alias, entity);
        }

        let stale: Vec<u64> = self
            .by_id
            .iter()
            .map(|r| *r.key())
            .filter(|id| !keep.contains(id))
            .collect();
        for id in stale {
            self.by_id.remove(&id);
            if let Some((_, alias)) = self.id_to_alias.remove(&id) {
                self.alias_to_id.remove_if(&alias, |_, owner| *owner == id);
            }
        }

        self.rebuild_snapshot();
    }

    /// Look up by alias first, then by numeric id.
    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        if let Some(id) = self.alias_to_id.get(key).map(|r| *r.value()) {
            return self.get_by_id(id);
        }
        key.parse().ok().and_then(|id| self.get_by_id(id))
    }

    pub(crate) fn get_by_id(&self, id: u64) -> Option<Arc<T>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    /// Number of entries in the latest snapshot.
    pub(crate) fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Write one entry in place. The entity is swapped before the alias
    /// index changes, and an unchanged alias is never unmapped.
    fn insert_quiet(&self, id: u64, alias: Option<String>, entity: T) {
        self.by_id.insert(id, Arc::new(entity));

        let old = match alias {
            Some(alias) => {
                self.alias_to_id.insert(alias.clone(), id);
                self.id_to_alias
                    .insert(id, alias.clone())
                    .filter(|old| *old != alias)
            }
            None => self.id_to_alias.remove(&id).map(|(_, old)| old),
        };
        if let Some(old) = old {
            self.alias_to_id.remove_if(&old, |_, owner| *owner == id);
        }
    }

    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(u64, Arc<T>)> = self
            .by_id
            .iter()
            .map(|r| (*r.key(), Arc::clone(r.value())))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        let values = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}
