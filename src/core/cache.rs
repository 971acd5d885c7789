//! In-memory image cache
//! Bounded map from photo id to decoded image; oldest insertions go first

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::DynamicImage;

#[derive(Default)]
struct Entries {
    images: HashMap<String, Arc<DynamicImage>>,
    order: VecDeque<String>,
}

/// Image cache
pub struct ImageCache {
    entries: Mutex<Entries>,
    capacity: usize,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, photo_id: &str) -> Option<Arc<DynamicImage>> {
        self.entries().images.get(photo_id).cloned()
    }

    pub fn contains(&self, photo_id: &str) -> bool {
        self.entries().images.contains_key(photo_id)
    }

    pub fn insert(&self, photo_id: impl Into<String>, image: Arc<DynamicImage>) {
        if self.capacity == 0 {
            return;
        }

        let photo_id = photo_id.into();
        let mut entries = self.entries();

        if entries.images.insert(photo_id.clone(), image).is_some() {
            return;
        }
        entries.order.push_back(photo_id);

        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                entries.images.remove(&evicted);
                tracing::debug!("image cache evicted {}", evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.images.clear();
        entries.order.clear();
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(100)
    }
}
