use std::path::PathBuf;
use std::sync::Arc;

use crate::core::models::{Account, AppConfig};
use crate::core::services::{Gallery, PhotoManager, SessionManager};
use crate::core::storage::ConfigStorage;
use crate::core::traits::{ChannelEmitter, DefaultStorageConfig, HeadlessWebView};
use crate::error::AppResult;

/// Application state: config plus a session driven through a headless web view
pub struct AppState {
    pub storage: DefaultStorageConfig,
    pub config: AppConfig,
    pub emitter: ChannelEmitter,
    pub web_view: Arc<HeadlessWebView>,
    pub session: Arc<SessionManager>,
}

impl AppState {
    pub fn new() -> AppResult<Self> {
        Self::from_storage(DefaultStorageConfig::new()?)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> AppResult<Self> {
        Self::from_storage(DefaultStorageConfig::with_path(data_dir)?)
    }

    fn from_storage(storage: DefaultStorageConfig) -> AppResult<Self> {
        let mut config = ConfigStorage::load(&storage)?;
        config.apply_env_overrides();

        let emitter = ChannelEmitter::default();
        let web_view = Arc::new(HeadlessWebView::new());
        let session = Arc::new(SessionManager::new(
            &config.oauth,
            web_view.clone(),
            Arc::new(emitter.clone()),
        )?);

        Ok(Self {
            storage,
            config,
            emitter,
            web_view,
            session,
        })
    }

    pub fn photo_manager(&self, account: &Account) -> AppResult<Arc<PhotoManager>> {
        Ok(Arc::new(PhotoManager::for_account(account, &self.config.api)?))
    }

    /// Thumbnail grid for `account`, wired to this state's session
    pub fn gallery(&self, account: &Account) -> AppResult<Gallery> {
        let manager = self.photo_manager(account)?;
        Ok(Gallery::grid(manager, &self.config).with_session(self.session.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::LoginState;
    use crate::core::traits::{SessionEvent, StorageConfig};
    use url::Url;

    #[test]
    fn state_from_fresh_dir_starts_logged_out() {
        let dir = std::env::temp_dir().join(format!("photos-viewer-state-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let state = AppState::with_data_dir(dir.clone()).unwrap();
        assert!(state.storage.config_path().exists());
        assert_eq!(state.session.state(), LoginState::LoggedOut);

        let mut events = state.emitter.subscribe();
        state.session.login();
        let redirect = Url::parse(&format!("{}#id_token=abc", state.config.oauth.redirect_uri)).unwrap();
        state.session.decide_policy(&redirect);
        assert!(matches!(events.try_recv().unwrap(), SessionEvent::LoggedIn(_)));

        let _ = std::fs::remove_dir_all(dir);
    }
}
