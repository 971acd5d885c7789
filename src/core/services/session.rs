//! Session service
//! Drives the implicit-grant login/logout through a web view and owns the current account

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::oauth;
use crate::core::models::{Account, OAuthConfig};
use crate::core::traits::{EventEmitter, NavigationId, SessionEvent, WebView};
use crate::error::AppResult;

/// Login flow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    LoggingOut,
}

/// Answer to a web view asking whether a navigation may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPolicy {
    Allow,
    Cancel,
}

struct Flow {
    state: LoginState,
    current_navigation: Option<NavigationId>,
}

/// Session manager
pub struct SessionManager {
    login_url: Url,
    logout_url: Url,
    redirect_host: String,
    web_view: Arc<dyn WebView>,
    emitter: Arc<dyn EventEmitter>,
    flow: Mutex<Flow>,
    account: Mutex<Option<Arc<Account>>>,
}

impl SessionManager {
    pub fn new(
        config: &OAuthConfig,
        web_view: Arc<dyn WebView>,
        emitter: Arc<dyn EventEmitter>,
    ) -> AppResult<Self> {
        Ok(Self {
            login_url: oauth::login_url(config)?,
            logout_url: oauth::logout_url(config)?,
            redirect_host: oauth::redirect_host(config)?,
            web_view,
            emitter,
            flow: Mutex::new(Flow {
                state: LoginState::LoggedOut,
                current_navigation: None,
            }),
            account: Mutex::new(None),
        })
    }

    fn flow(&self) -> MutexGuard<'_, Flow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoginState {
        self.flow().state
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    pub fn current_account(&self) -> Option<Arc<Account>> {
        self.account
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current account.
    ///
    /// Observers hear about it only when the value actually changed: `LoggedIn`
    /// for a new account, `LoggedOut` when cleared. Emission happens after the
    /// lock is released.
    pub fn set_current_account(&self, account: Option<Arc<Account>>) {
        let old = {
            let mut guard = self.account.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, account.clone())
        };

        if old == account {
            return;
        }

        match account {
            Some(account) => self.emitter.emit(SessionEvent::LoggedIn(account)),
            None => self.emitter.emit(SessionEvent::LoggedOut),
        }
    }

    /// Start a login. Only valid while logged out; returns whether it started.
    pub fn login(&self) -> bool {
        {
            let mut flow = self.flow();
            if flow.state != LoginState::LoggedOut {
                debug!("login ignored in state {:?}", flow.state);
                return false;
            }
            flow.state = LoginState::LoggingIn;
        }

        info!("Starting login at {}", self.login_url);
        let navigation = self.web_view.load(&self.login_url);
        self.flow().current_navigation = navigation;
        true
    }

    /// Start a logout. Only valid while logged in; returns whether it started.
    pub fn logout(&self) -> bool {
        {
            let mut flow = self.flow();
            if flow.state != LoginState::LoggedIn {
                debug!("logout ignored in state {:?}", flow.state);
                return false;
            }
            flow.state = LoginState::LoggingOut;
        }

        info!("Starting logout at {}", self.logout_url);
        let navigation = self.web_view.load(&self.logout_url);
        self.flow().current_navigation = navigation;
        true
    }

    /// Inspect a navigation the web view is about to perform.
    ///
    /// Navigations to the redirect host are never loaded. While logging in, the
    /// redirect's fragment is searched for an `id_token`; a redirect without one
    /// leaves the flow in `LoggingIn`.
    pub fn decide_policy(&self, url: &Url) -> NavigationPolicy {
        if url.host_str() != Some(self.redirect_host.as_str()) {
            return NavigationPolicy::Allow;
        }

        let token = {
            let mut flow = self.flow();
            if flow.state != LoginState::LoggingIn {
                debug!("redirect intercepted in state {:?}", flow.state);
                return NavigationPolicy::Cancel;
            }

            match oauth::token_from_redirect(url) {
                Some(token) => {
                    flow.state = LoginState::LoggedIn;
                    token
                }
                None => {
                    warn!("Login redirect carried no id_token, login aborted");
                    return NavigationPolicy::Cancel;
                }
            }
        };

        let account = Arc::new(Account::new(token));
        match account.claims().as_ref().and_then(|c| c.display_name()) {
            Some(name) => info!("Logged in as {} ({})", name, account.token_preview()),
            None => info!("Logged in ({})", account.token_preview()),
        }
        self.set_current_account(Some(account));

        NavigationPolicy::Cancel
    }

    /// The web view committed to `navigation`
    pub fn did_commit(&self, navigation: NavigationId) {
        self.flow().current_navigation = Some(navigation);
    }

    /// The web view finished `navigation`; completes a pending logout
    pub fn did_finish(&self, navigation: NavigationId) {
        {
            let mut flow = self.flow();
            if flow.current_navigation != Some(navigation) || flow.state != LoginState::LoggingOut
            {
                return;
            }
            flow.state = LoginState::LoggedOut;
        }

        info!("Logged out");
        self.set_current_account(None);
    }
}
