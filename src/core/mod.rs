//! Core module
//! Session flow, photo loading and the seams the UI layer plugs into

pub mod cache;
pub mod models;
pub mod services;
pub mod storage;
pub mod traits;

pub use traits::{
    ChannelEmitter, DefaultStorageConfig, EventEmitter, HeadlessWebView, NavigationId,
    NoopEmitter, SessionEvent, StorageConfig, WebView,
};
