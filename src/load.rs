// src/load.rs
//
// Ordered destination for decoded characters.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Append-only sink for decoded characters.
///
/// Insertion order is arrival order of frames. Implementations must not
/// reorder or deduplicate.
pub trait LoadSequence {
    fn append(&mut self, c: char);
}

impl LoadSequence for Vec<char> {
    fn append(&mut self, c: char) {
        self.push(c);
    }
}

impl LoadSequence for String {
    fn append(&mut self, c: char) {
        self.push(c);
    }
}

/// In-memory load list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadList {
    items: Vec<char>,
}

impl LoadList {
    pub fn new() -> Self {
        LoadList::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &char> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.items
    }

    /// The decoded characters joined in arrival order.
    pub fn message(&self) -> String {
        self.items.iter().collect()
    }
}

impl LoadSequence for LoadList {
    fn append(&mut self, c: char) {
        self.items.push(c);
    }
}

/// Load list shared across threads. The mutex around `append` is the only
/// synchronisation point; readers take a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedLoadList {
    inner: Arc<Mutex<LoadList>>,
}

impl SharedLoadList {
    pub fn new() -> Self {
        SharedLoadList::default()
    }

    // A panic while holding the lock cannot leave a half-appended list, so a
    // poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, LoadList> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LoadList {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl LoadSequence for SharedLoadList {
    fn append(&mut self, c: char) {
        self.lock().append(c);
    }
}
