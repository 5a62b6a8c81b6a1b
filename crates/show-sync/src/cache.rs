//! Label cache
//!
//! The local mirror of console object labels: per category, a mapping from
//! upper-cased label to device id. The receive path writes it, the command
//! path reads it.
//!
//! Within one category a device id is bound to at most one label and a label
//! to at most one id. A re-label removes the stale binding and inserts the
//! new one under a single write lock, so readers never see the pair half
//! applied.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use show_protocol::{normalize_label, Category, DeviceId};

#[derive(Debug, Default, Clone)]
struct Bindings {
    by_label: HashMap<String, DeviceId>,
    by_id: HashMap<DeviceId, String>,
}

impl Bindings {
    /// Bind `label` to `id`; returns the label `id` carried before, if any
    fn upsert(&mut self, label: String, id: DeviceId) -> Option<String> {
        let previous = self.by_id.remove(&id);
        if let Some(old_label) = &previous {
            self.by_label.remove(old_label);
        }

        // a label taken over from another object unbinds that object
        if let Some(old_id) = self.by_label.insert(label.clone(), id.clone()) {
            if old_id != id {
                self.by_id.remove(&old_id);
            }
        }
        self.by_id.insert(id, label);
        previous
    }

    fn delete_by_id(&mut self, id: &DeviceId) -> Option<String> {
        let label = self.by_id.remove(id)?;
        self.by_label.remove(&label);
        Some(label)
    }

    fn delete_by_label(&mut self, label: &str) -> Option<DeviceId> {
        let id = self.by_label.remove(label)?;
        self.by_id.remove(&id);
        Some(id)
    }
}

/// Thread-safe label → device id mirror, partitioned by category
#[derive(Debug, Default)]
pub struct LabelCache {
    categories: RwLock<HashMap<Category, Bindings>>,
}

impl LabelCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Category, Bindings>> {
        self.categories.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Category, Bindings>> {
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `label` to `id` in `category`
    ///
    /// If `id` already carries a different label, that label is removed first.
    /// Returns the label `id` carried before this call.
    pub fn upsert(&self, category: Category, label: &str, id: DeviceId) -> Option<String> {
        self.write()
            .entry(category)
            .or_default()
            .upsert(normalize_label(label), id)
    }

    /// Remove whatever label is bound to `id`; a missing id is not an error
    pub fn delete_by_id(&self, category: Category, id: &DeviceId) -> Option<String> {
        self.write()
            .get_mut(&category)
            .and_then(|bindings| bindings.delete_by_id(id))
    }

    /// Remove the binding for `label`
    pub fn delete_by_label(&self, category: Category, label: &str) -> Option<DeviceId> {
        self.write()
            .get_mut(&category)
            .and_then(|bindings| bindings.delete_by_label(&normalize_label(label)))
    }

    /// Look up the id bound to `label` (case-insensitive)
    pub fn lookup(&self, category: Category, label: &str) -> Option<DeviceId> {
        self.read()
            .get(&category)
            .and_then(|bindings| bindings.by_label.get(&normalize_label(label)))
            .cloned()
    }

    /// Label currently bound to `id`
    pub fn label_of(&self, category: Category, id: &DeviceId) -> Option<String> {
        self.read()
            .get(&category)
            .and_then(|bindings| bindings.by_id.get(id))
            .cloned()
    }

    /// Drop every binding in `category`
    pub fn clear(&self, category: Category) {
        self.write().remove(&category);
    }

    /// Drop every binding in every category
    pub fn clear_all(&self) {
        self.write().clear();
    }

    /// Copy of one category's bindings, sorted by label
    pub fn snapshot(&self, category: Category) -> BTreeMap<String, DeviceId> {
        self.read()
            .get(&category)
            .map(|bindings| {
                bindings
                    .by_label
                    .iter()
                    .map(|(label, id)| (label.clone(), id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of labels known in `category`
    pub fn len(&self, category: Category) -> usize {
        self.read()
            .get(&category)
            .map_or(0, |bindings| bindings.by_label.len())
    }

    /// Whether `category` has no labels
    pub fn is_empty(&self, category: Category) -> bool {
        self.len(category) == 0
    }
}
