//! Service layer
//! Login flow, photo loading and gallery bookkeeping

pub mod gallery;
pub mod oauth;
pub mod photos;
pub mod session;

#[cfg(test)]
mod test_support;

pub use gallery::{Gallery, ImageRequest};
pub use photos::{ImageTask, PhotoManager};
pub use session::{LoginState, NavigationPolicy, SessionManager};
