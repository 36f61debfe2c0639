//! Read-through cache of sender display names.
//!
//! One resolver belongs to one message stream for its whole lifetime. Entries
//! are never evicted or removed; a later `put` for the same sender replaces
//! the name.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use kindred_core::UserId;

/// Cache of `sender id -> display name`.
#[derive(Debug, Default)]
pub struct SenderNameResolver {
    names: RwLock<HashMap<UserId, String>>,
}

impl SenderNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached name for `id`, if any.
    pub fn get(&self, id: &UserId) -> Option<String> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Record a resolved name. Visible to every later `get`, from any task.
    pub fn put(&self, id: UserId, name: impl Into<String>) {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, name.into());
    }

    /// Record many names at once, e.g. from a bulk load.
    pub fn seed<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (UserId, String)>,
    {
        let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
        names.extend(entries);
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
