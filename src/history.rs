//! Bounded, newest-first record of received events.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::display_item::DisplayItem;

/// Everything received so far, capped at `capacity`. Index 0 is the newest item.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    items: VecDeque<Arc<DisplayItem>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { items: VecDeque::with_capacity(capacity.min(4096)), capacity }
    }

    /// Prepends `item`, returning the evicted oldest item when the cap is exceeded.
    pub fn push(&mut self, item: Arc<DisplayItem>) -> Option<Arc<DisplayItem>> {
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            return self.items.pop_back();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Arc<DisplayItem>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DisplayItem>> {
        self.items.iter()
    }

    /// Copy of the current contents, newest first.
    pub fn snapshot(&self) -> Vec<Arc<DisplayItem>> {
        self.items.iter().cloned().collect()
    }
}
