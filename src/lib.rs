//! Headless photo-viewing client.
//!
//! Drives an OAuth implicit-grant login through an embedded web view, loads the
//! signed-in user's recent photos and fetches their images on demand.

pub mod core;
pub mod error;
pub mod state;

pub use error::{AppError, AppResult};
