//! Core trait definitions
//! Seams between the session/photo logic and whatever hosts it (UI, CLI, tests)

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use url::Url;

use crate::core::models::Account;
use crate::error::{AppError, AppResult};

/// Session change notifications
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn(Arc<Account>),
    LoggedOut,
}

/// Event emitter trait
/// A UI host forwards these to its own observers; the CLI subscribes to a channel
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Emitter that drops everything
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit(&self, _event: SessionEvent) {}
}

/// Broadcasts session events to any number of subscribers
#[derive(Clone)]
pub struct ChannelEmitter {
    tx: broadcast::Sender<SessionEvent>,
}

impl ChannelEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChannelEmitter {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

/// Identifies one navigation started in a web view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NavigationId(pub u64);

/// The embedded browser the login flow runs in
pub trait WebView: Send + Sync {
    /// Start loading `url`, returning the navigation that was started (if any)
    fn load(&self, url: &Url) -> Option<NavigationId>;
}

/// Web view without a renderer: records requested URLs and hands out ids.
/// The host feeds redirects back through `SessionManager::decide_policy`.
#[derive(Default)]
pub struct HeadlessWebView {
    next_id: AtomicU64,
    history: Mutex<Vec<Url>>,
}

impl HeadlessWebView {
    pub fn new() -> Self {
        Self::default()
    }

    fn urls(&self) -> MutexGuard<'_, Vec<Url>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn history(&self) -> Vec<Url> {
        self.urls().clone()
    }

    pub fn last_url(&self) -> Option<Url> {
        self.urls().last().cloned()
    }
}

impl WebView for HeadlessWebView {
    fn load(&self, url: &Url) -> Option<NavigationId> {
        self.urls().push(url.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("headless web view loading {} as navigation {}", url, id);
        Some(NavigationId(id))
    }
}

/// Storage configuration trait
/// Abstracts where the config file lives
pub trait StorageConfig: Send + Sync {
    fn data_dir(&self) -> PathBuf;

    fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.json")
    }
}

/// Default storage config (`~/.photos_viewer/`)
pub struct DefaultStorageConfig {
    data_dir: PathBuf,
}

impl DefaultStorageConfig {
    pub fn new() -> AppResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("cannot determine home directory".to_string()))?;
        Self::with_path(home.join(".photos_viewer"))
    }

    pub fn with_path(data_dir: PathBuf) -> AppResult<Self> {
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }
}

impl StorageConfig for DefaultStorageConfig {
    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_web_view_hands_out_distinct_ids() {
        let view = HeadlessWebView::new();
        let a = view.load(&Url::parse("https://a.example/").unwrap());
        let b = view.load(&Url::parse("https://b.example/").unwrap());
        assert_ne!(a, b);
        assert_eq!(view.history().len(), 2);
        assert_eq!(view.last_url().unwrap().host_str(), Some("b.example"));
    }

    #[test]
    fn headless_web_view_keeps_recording_after_a_panicked_holder() {
        let view = Arc::new(HeadlessWebView::new());
        view.load(&Url::parse("https://a.example/").unwrap());

        let poisoner = view.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.history.lock().unwrap();
            panic!("poison the history lock");
        })
        .join();
        assert!(view.history.is_poisoned());

        view.load(&Url::parse("https://b.example/").unwrap());
        assert_eq!(view.history().len(), 2);
        assert_eq!(view.last_url().unwrap().host_str(), Some("b.example"));
    }

    #[test]
    fn channel_emitter_without_subscribers_does_not_fail() {
        let emitter = ChannelEmitter::default();
        emitter.emit(SessionEvent::LoggedOut);

        let mut rx = emitter.subscribe();
        emitter.emit(SessionEvent::LoggedOut);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::LoggedOut);
    }
}
