//! Photo service
//! Loads the photo list and fetches individual images

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::DynamicImage;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::models::{Account, ApiConfig, ImageSize, Photo, PhotosResponse};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct PhotoList {
    photos: Vec<Arc<Photo>>,
    count: usize,
}

/// Handle to one in-flight image fetch
pub struct ImageTask {
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    handle: JoinHandle<()>,
}

impl ImageTask {
    /// Stop the fetch. Its completion still runs once, with `None`, unless the
    /// response was already being delivered.
    pub fn cancel(&self) {
        let sender = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    /// True once the completion has returned
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Photo manager
pub struct PhotoManager {
    photos_url: Url,
    session: reqwest::Client,
    image_session: reqwest::Client,
    list: Mutex<PhotoList>,
}

impl PhotoManager {
    /// `session` is used for the list endpoint; images go through a plain client
    pub fn new(session: reqwest::Client, config: &ApiConfig) -> AppResult<Self> {
        Ok(Self {
            photos_url: Url::parse(&config.photos_url)?,
            session,
            image_session: reqwest::Client::new(),
            list: Mutex::new(PhotoList::default()),
        })
    }

    pub fn for_account(account: &Account, config: &ApiConfig) -> AppResult<Self> {
        Self::new(account.http_client()?, config)
    }

    fn list(&self) -> MutexGuard<'_, PhotoList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn photos(&self) -> Vec<Arc<Photo>> {
        self.list().photos.clone()
    }

    pub fn count(&self) -> usize {
        self.list().count
    }

    pub fn photo_at(&self, index: usize) -> Option<Arc<Photo>> {
        self.list().photos.get(index).cloned()
    }

    /// Fetch the photo list. On failure the previously loaded list is kept.
    pub async fn load_photos(&self) -> AppResult<Vec<Arc<Photo>>> {
        let photos = match self.fetch_photo_list().await {
            Ok(photos) => photos,
            Err(e) => {
                warn!("Failed to load photos: {}", e);
                return Err(e);
            }
        };

        {
            let mut list = self.list();
            list.count = photos.len();
            list.photos = photos.clone();
        }

        info!("Loaded {} photos", photos.len());
        Ok(photos)
    }

    async fn fetch_photo_list(&self) -> AppResult<Vec<Arc<Photo>>> {
        let response = self.session.get(self.photos_url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status(status));
        }

        let body = response.bytes().await?;
        let decoded: PhotosResponse = serde_json::from_slice(&body)?;

        Ok(decoded.photos.into_iter().map(Arc::new).collect())
    }

    /// Start fetching one rendition of `photo`.
    ///
    /// `completion` runs exactly once with the decoded image, or `None` on any
    /// failure or cancellation. When the photo carries no usable URL for `size`
    /// the completion runs immediately and no task is returned.
    /// Must be called from within a tokio runtime.
    pub fn load_image<F>(&self, photo: &Photo, size: ImageSize, completion: F) -> Option<ImageTask>
    where
        F: FnOnce(Option<Arc<DynamicImage>>) + Send + 'static,
    {
        let Some(url) = photo.image_url(size) else {
            debug!("photo {} has no valid {} url", photo.id, size);
            completion(None);
            return None;
        };

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let client = self.image_session.clone();
        let photo_id = photo.id.clone();

        let handle = tokio::spawn(async move {
            let image = tokio::select! {
                biased;
                Ok(()) = &mut cancel_rx => {
                    debug!("image fetch for {} cancelled", photo_id);
                    None
                }
                image = fetch_image(&client, url) => image,
            };
            completion(image.map(Arc::new));
        });

        Some(ImageTask {
            cancel: Mutex::new(Some(cancel_tx)),
            handle,
        })
    }

    /// Awaitable variant of [`load_image`](Self::load_image) without a handle
    pub async fn image(&self, photo: &Photo, size: ImageSize) -> Option<DynamicImage> {
        let url = photo.image_url(size)?;
        fetch_image(&self.image_session, url).await
    }
}

async fn fetch_image(client: &reqwest::Client, url: Url) -> Option<DynamicImage> {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("image request {} failed: {}", url, e);
            return None;
        }
    };

    let bytes = response.bytes().await.ok()?;
    match image::load_from_memory(&bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            debug!("image {} could not be decoded: {}", url, e);
            None
        }
    }
}
