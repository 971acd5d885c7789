//! Gallery service
//! Presenter-side bookkeeping for a scrolling grid or a paged detail view:
//! image cache, in-flight fetches, prefetch and cancellation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use image::DynamicImage;
use tracing::{debug, info};

use super::photos::{ImageTask, PhotoManager};
use super::session::SessionManager;
use crate::core::cache::ImageCache;
use crate::core::models::{AppConfig, ImageSize, LoadFailurePolicy, Photo};
use crate::error::AppResult;

type ReadyCallback = Box<dyn FnOnce(&str, Arc<DynamicImage>) + Send + 'static>;

/// Callbacks waiting on one fetch; `None` once that fetch has completed
type Waiters = Arc<Mutex<Option<Vec<ReadyCallback>>>>;

fn lock_waiters(waiters: &Waiters) -> MutexGuard<'_, Option<Vec<ReadyCallback>>> {
    waiters.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One tracked fetch. Cells asking for the same photo share it.
struct Slot {
    generation: u64,
    task: ImageTask,
    waiters: Waiters,
}

/// Outcome of asking for the image at an index
#[derive(Debug, Clone)]
pub enum ImageRequest {
    /// Already cached; nothing was started
    Cached(Arc<DynamicImage>),
    /// A fetch is running; the callback fires if it succeeds
    Loading,
    /// No photo at that index
    OutOfRange,
}

/// Gallery
pub struct Gallery {
    manager: Arc<PhotoManager>,
    size: ImageSize,
    cache: Arc<ImageCache>,
    tasks: Arc<DashMap<String, Slot>>,
    generation: AtomicU64,
    policy: LoadFailurePolicy,
    session: Option<Arc<SessionManager>>,
    start_index: usize,
}

impl Gallery {
    fn with_size(
        manager: Arc<PhotoManager>,
        config: &AppConfig,
        size: ImageSize,
        start_index: usize,
    ) -> Self {
        Self {
            manager,
            size,
            cache: Arc::new(ImageCache::new(config.image_cache_capacity)),
            tasks: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            policy: config.load_failure_policy,
            session: None,
            start_index,
        }
    }

    /// Thumbnail grid
    pub fn grid(manager: Arc<PhotoManager>, config: &AppConfig) -> Self {
        Self::with_size(manager, config, ImageSize::Thumbnail, 0)
    }

    /// Full-size pager opened at `index`
    pub fn detail(manager: Arc<PhotoManager>, config: &AppConfig, index: usize) -> Self {
        Self::with_size(manager, config, ImageSize::Standard, index)
    }

    /// Session to log out of when the failure policy asks for it
    pub fn with_session(mut self, session: Arc<SessionManager>) -> Self {
        self.session = Some(session);
        self
    }

    /// Open the detail pager for a selected grid item. It shares the photo list
    /// but keeps its own cache of the same capacity.
    pub fn open_detail(&self, index: usize) -> Gallery {
        Gallery {
            manager: self.manager.clone(),
            size: ImageSize::Standard,
            cache: Arc::new(ImageCache::new(self.cache.capacity())),
            tasks: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            policy: self.policy,
            session: self.session.clone(),
            start_index: index,
        }
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn len(&self) -> usize {
        self.manager.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn photo_at(&self, index: usize) -> Option<Arc<Photo>> {
        self.manager.photo_at(index)
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Reload the photo list; meant to run each time the view appears
    pub async fn reload(&self) -> AppResult<usize> {
        match self.manager.load_photos().await {
            Ok(photos) => Ok(photos.len()),
            Err(e) => {
                if self.policy == LoadFailurePolicy::Logout {
                    // Nothing fetched for the old session survives it
                    self.cancel_all();
                    self.cache.clear();
                    if let Some(session) = &self.session {
                        info!("Photo load failed, logging out");
                        session.logout();
                    }
                }
                Err(e)
            }
        }
    }

    /// Cached image for the photo at `index`
    pub fn image_for(&self, index: usize) -> Option<Arc<DynamicImage>> {
        let photo = self.photo_at(index)?;
        self.cache.get(&photo.id)
    }

    /// Image for a cell becoming visible. Cache hits start nothing. A fetch
    /// already running for the photo (a prefetch, say) is joined; otherwise a new
    /// one starts. `on_ready(photo_id, image)` fires once it succeeds.
    /// Callers compare `photo_id` with what the cell currently shows.
    pub fn request_image<F>(&self, index: usize, on_ready: F) -> ImageRequest
    where
        F: FnOnce(&str, Arc<DynamicImage>) + Send + 'static,
    {
        let Some(photo) = self.photo_at(index) else {
            return ImageRequest::OutOfRange;
        };

        if let Some(image) = self.cache.get(&photo.id) {
            return ImageRequest::Cached(image);
        }

        let on_ready = match self.attach(&photo.id, Box::new(on_ready)) {
            Ok(()) => return ImageRequest::Loading,
            Err(on_ready) => on_ready,
        };

        // The fetch we could have joined may have finished in between
        if let Some(image) = self.cache.get(&photo.id) {
            return ImageRequest::Cached(image);
        }

        self.start_load(photo, vec![on_ready]);
        ImageRequest::Loading
    }

    /// Warm the cache for cells about to scroll into view
    pub fn prefetch(&self, indices: &[usize]) {
        for &index in indices {
            let Some(photo) = self.photo_at(index) else {
                continue;
            };
            if self.cache.contains(&photo.id) || self.is_loading(&photo.id) {
                continue;
            }
            self.start_load(photo, Vec::new());
        }
    }

    /// Cancel fetches for cells that scrolled away before their image arrived.
    /// Callbacks waiting on a cancelled fetch never fire.
    pub fn cancel_prefetch(&self, indices: &[usize]) {
        for &index in indices {
            let Some(photo) = self.photo_at(index) else {
                continue;
            };
            if let Some((_, slot)) = self.tasks.remove(&photo.id) {
                debug!("cancelling image fetch for {}", photo.id);
                slot.task.cancel();
            }
        }
    }

    /// Number of fetches still running
    pub fn in_flight(&self) -> usize {
        self.prune_finished();
        self.tasks.len()
    }

    fn is_loading(&self, photo_id: &str) -> bool {
        self.tasks
            .get(photo_id)
            .map(|slot| !slot.task.is_finished())
            .unwrap_or(false)
    }

    fn prune_finished(&self) {
        self.tasks.retain(|_, slot| !slot.task.is_finished());
    }

    fn cancel_all(&self) {
        self.tasks.retain(|photo_id, slot| {
            debug!("cancelling image fetch for {}", photo_id);
            slot.task.cancel();
            false
        });
    }

    /// Queue `on_ready` on the running fetch for `photo_id`. Hands the callback
    /// back when there is no fetch left to join.
    fn attach(&self, photo_id: &str, on_ready: ReadyCallback) -> Result<(), ReadyCallback> {
        let Some(slot) = self.tasks.get(photo_id) else {
            return Err(on_ready);
        };
        let mut waiters = lock_waiters(&slot.waiters);
        match waiters.as_mut() {
            Some(pending) => {
                debug!("joining running image fetch for {}", photo_id);
                pending.push(on_ready);
                Ok(())
            }
            None => Err(on_ready),
        }
    }

    fn start_load(&self, photo: Arc<Photo>, ready: Vec<ReadyCallback>) {
        self.prune_finished();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let waiters: Waiters = Arc::new(Mutex::new(Some(ready)));
        let cache = self.cache.clone();
        let tasks = self.tasks.clone();
        let photo_id = photo.id.clone();
        let pending = waiters.clone();

        let task = self.manager.load_image(&photo, self.size, move |image| {
            // Only clear our own slot; a newer fetch for the same photo keeps its handle
            tasks.remove_if(&photo_id, |_, slot| slot.generation == generation);

            let Some(image) = image else {
                lock_waiters(&pending).take();
                debug!("no image for photo {}", photo_id);
                return;
            };
            // Cache first so a late joiner that finds the waiters closed sees the image
            cache.insert(photo_id.clone(), image.clone());
            let ready = lock_waiters(&pending).take().unwrap_or_default();
            for on_ready in ready {
                on_ready(&photo_id, image.clone());
            }
        });

        if let Some(task) = task {
            let slot = Slot {
                generation,
                task,
                waiters,
            };
            if let Some(displaced) = self.tasks.insert(photo.id.clone(), slot) {
                displaced.task.cancel();
            }
        }
    }
}
