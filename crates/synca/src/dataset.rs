//! A collection with multiple-reader / single-writer access.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// `Dataset` shares an ordered collection between actors: any number of
/// readers at once, or one writer alone.
///
/// A writer waits for current readers to release and keeps new readers out
/// until it is done, so readers only ever observe the state left by a
/// completed write.
///
/// Fairness is whatever [`std::sync::RwLock`] gives on the host platform.
/// Under a continuous stream of readers a writer may starve; that is
/// acceptable for the demonstration workloads this type serves.
pub struct Dataset<T> {
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T> Default for Dataset<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: fmt::Debug> fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dataset").field(&*self.read_guard()).finish()
    }
}

impl<T> Dataset<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// `read_with` runs `f` while holding the shared lock.
    pub fn read_with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let guard = self.read_guard();
        f(&guard)
    }

    /// `write` appends `value` under the exclusive lock.
    pub fn write(&self, value: T) {
        self.write_guard().push(value);
    }

    /// `write_with` runs `f` while holding the exclusive lock; no reader sees
    /// any of its intermediate states.
    pub fn write_with<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let mut guard = self.write_guard();
        f(&mut guard)
    }

    /// `replace` swaps in `items` and returns the previous contents.
    pub fn replace(&self, items: Vec<T>) -> Vec<T> {
        std::mem::replace(&mut *self.write_guard(), items)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<T>> {
        match self.items.read() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        match self.items.write() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

impl<T: Clone> Dataset<T> {
    /// `read` returns a snapshot taken under the shared lock.
    #[must_use]
    pub fn read(&self) -> Vec<T> {
        self.read_guard().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_appends_and_read_snapshots() {
        let data = Dataset::new(vec![1, 2, 3, 4, 5]);
        data.write(6);

        let snapshot = data.read();
        data.write(7);

        assert_eq!(snapshot, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(data.len(), 7);
    }

    #[test]
    fn replace_returns_previous_items() {
        let data = Dataset::new(vec!["a"]);
        let previous = data.replace(vec!["b", "c"]);

        assert_eq!(previous, vec!["a"]);
        assert_eq!(data.read_with(|items| items.len()), 2);
    }

    #[test]
    fn clones_share_the_same_items() {
        let data: Dataset<u8> = Dataset::default();
        let other = data.clone();
        other.write(1);

        assert!(!data.is_empty());
        assert_eq!(data.read(), vec![1]);
    }
}
