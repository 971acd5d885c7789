//! Core data models

mod account;
mod config;
mod photo;

pub use account::{Account, IdTokenClaims};
pub use config::{ApiConfig, AppConfig, LoadFailurePolicy, OAuthConfig};
pub use photo::{ImageRef, ImageSet, ImageSize, Likes, Photo, PhotoUser, PhotosResponse};
