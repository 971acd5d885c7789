//! Photo records returned by the media endpoint

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// One of the three renditions the API serves for every photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSize {
    Thumbnail = 150,
    Low = 320,
    Standard = 640,
}

impl ImageSize {
    /// Nominal edge length in pixels
    pub fn pixels(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageSize::Thumbnail => "thumbnail",
            ImageSize::Low => "low",
            ImageSize::Standard => "standard",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "thumbnail" | "thumb" => Ok(ImageSize::Thumbnail),
            "low" | "low_resolution" | "small" => Ok(ImageSize::Low),
            "standard" | "standard_resolution" => Ok(ImageSize::Standard),
            other => Err(format!("unknown image size: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Likes {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoUser {
    pub id: String,
    pub username: String,
    #[serde(rename = "full_name")]
    pub name: String,
    pub profile_picture: String,
}

impl PhotoUser {
    pub fn profile_url(&self) -> Option<Url> {
        Url::parse(&self.profile_picture).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub height: u32,
    pub width: u32,
}

impl ImageRef {
    pub fn image_url(&self) -> Option<Url> {
        Url::parse(&self.url).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    pub thumbnail: ImageRef,
    #[serde(rename = "low_resolution")]
    pub low: ImageRef,
    #[serde(rename = "standard_resolution")]
    pub standard: ImageRef,
}

impl ImageSet {
    pub fn get(&self, size: ImageSize) -> &ImageRef {
        match size {
            ImageSize::Thumbnail => &self.thumbnail,
            ImageSize::Low => &self.low,
            ImageSize::Standard => &self.standard,
        }
    }
}

/// A single media item. Identity is `id` (`media_id` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(rename = "media_id")]
    pub id: String,
    pub user: PhotoUser,
    #[serde(rename = "user_has_liked")]
    pub liked: bool,
    pub likes: Likes,
    pub tags: Vec<String>,
    pub images: ImageSet,
}

impl Photo {
    pub fn image_url(&self, size: ImageSize) -> Option<Url> {
        self.images.get(size).image_url()
    }
}

/// Envelope of `GET /users/self/media/recent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotosResponse {
    #[serde(rename = "data")]
    pub photos: Vec<Photo>,
}
