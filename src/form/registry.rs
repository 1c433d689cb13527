use indexmap::IndexMap;

use crate::contracts::SharedHandle;
use crate::value::{ErrorMessage, FormValues};

/// Name-keyed field handles in registration order.
#[derive(Clone, Default)]
pub struct Registry {
    handles: IndexMap<String, SharedHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handle`, returning the handle it replaced under the same name. A replaced
    /// handle keeps its original position.
    pub fn insert(&mut self, handle: SharedHandle) -> Option<SharedHandle> {
        self.handles.insert(handle.name().to_owned(), handle)
    }

    pub fn remove(&mut self, name: &str) -> Option<SharedHandle> {
        self.handles.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&SharedHandle> {
        self.handles.get(name)
    }

    pub fn first(&self) -> Option<&SharedHandle> {
        self.handles.first().map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    pub fn handles(&self) -> impl Iterator<Item = &SharedHandle> {
        self.handles.values()
    }

    pub fn gather_values(&self) -> FormValues {
        gather_values(self.handles())
    }

    pub fn gather_errors(&self, update_errors: bool) -> Vec<ErrorMessage> {
        gather_errors(self.handles(), update_errors)
    }
}

/// Maps every handle to its current value.
pub fn gather_values<'a>(handles: impl IntoIterator<Item = &'a SharedHandle>) -> FormValues {
    handles
        .into_iter()
        .map(|handle| (handle.name().to_owned(), handle.get_value()))
        .collect()
}

/// Validates every handle against its own value and concatenates the errors in order.
pub fn gather_errors<'a>(
    handles: impl IntoIterator<Item = &'a SharedHandle>,
    update_errors: bool,
) -> Vec<ErrorMessage> {
    handles
        .into_iter()
        .flat_map(|handle| {
            let value = handle.get_value();
            handle.validate(&value, update_errors)
        })
        .filter(|error| !error.is_empty())
        .collect()
}
