use indexmap::IndexMap;

use crate::value::{FormValues, Value};

/// Last values of fields that unmounted while their form persists values. Lives exactly as long
/// as the owning form.
#[derive(Clone, Debug, Default)]
pub(crate) struct PersistedValues {
    values: IndexMap<String, Value>,
}

impl PersistedValues {
    pub(crate) fn save(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Hands the stored value back to a re-registering field; it is never restored twice.
    pub(crate) fn take(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    /// Persisted values under `live`; live entries win on collisions.
    pub(crate) fn merged_under(&self, live: FormValues) -> FormValues {
        let mut merged = self.values.clone();
        for (name, value) in live {
            merged.insert(name, value);
        }
        merged
    }
}
