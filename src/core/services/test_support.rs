//! In-process API server for service tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::core::models::{ApiConfig, ImageRef, ImageSet, Likes, Photo, PhotoUser};

pub const TEST_TOKEN: &str = "TOKEN";

struct ServerState {
    base: String,
    photo_count: AtomicUsize,
    bad_json: AtomicBool,
    bad_status: AtomicBool,
    image_hits: AtomicUsize,
}

pub struct TestServer {
    state: Arc<ServerState>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState {
            base: format!("http://{}", addr),
            photo_count: AtomicUsize::new(3),
            bad_json: AtomicBool::new(false),
            bad_status: AtomicBool::new(false),
            image_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/media", get(media))
            .route("/img/:name", get(serve_image))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.state.base, path)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            photos_url: self.url("/media"),
        }
    }

    pub fn set_photo_count(&self, count: usize) {
        self.state.photo_count.store(count, Ordering::SeqCst);
    }

    pub fn fail_with_bad_json(&self, fail: bool) {
        self.state.bad_json.store(fail, Ordering::SeqCst);
    }

    pub fn fail_with_status(&self, fail: bool) {
        self.state.bad_status.store(fail, Ordering::SeqCst);
    }

    pub fn image_hits(&self) -> usize {
        self.state.image_hits.load(Ordering::SeqCst)
    }
}

/// Thumbnail and low renditions answer at once; standard ones take a second
fn photo_json(base: &str, index: usize) -> serde_json::Value {
    let id = format!("m-{}", index);
    json!({
        "media_id": id.clone(),
        "user": {
            "id": "u-1",
            "username": "alice",
            "full_name": "Alice A",
            "profile_picture": format!("{}/img/avatar.png", base)
        },
        "user_has_liked": (index % 2 == 0),
        "likes": { "count": (index * 3) },
        "tags": ["test"],
        "images": {
            "thumbnail": { "url": format!("{}/img/{}-thumb.png", base, id), "height": 150, "width": 150 },
            "low_resolution": { "url": format!("{}/img/{}-low.png", base, id), "height": 320, "width": 320 },
            "standard_resolution": { "url": format!("{}/img/slow-{}-std.png", base, id), "height": 640, "width": 640 }
        }
    })
}

async fn media(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .map(|v| v.as_bytes() == TEST_TOKEN.as_bytes())
        .unwrap_or(false);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.bad_status.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if state.bad_json.load(Ordering::SeqCst) {
        return (StatusCode::OK, "{\"data\": [ {\"media_id\": 1 } ]").into_response();
    }

    let count = state.photo_count.load(Ordering::SeqCst);
    let data: Vec<_> = (0..count).map(|i| photo_json(&state.base, i)).collect();
    Json(json!({ "data": data })).into_response()
}

async fn serve_image(State(state): State<Arc<ServerState>>, Path(name): Path<String>) -> Response {
    state.image_hits.fetch_add(1, Ordering::SeqCst);

    if name.starts_with("slow") {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    if name.starts_with("broken") {
        return (StatusCode::OK, "definitely not a png").into_response();
    }

    ([(header::CONTENT_TYPE, "image/png")], png_bytes()).into_response()
}

pub fn png_bytes() -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn photo_with_urls(id: &str, thumbnail: &str, low: &str, standard: &str) -> Photo {
    let image_ref = |url: &str, edge: u32| ImageRef {
        url: url.to_string(),
        height: edge,
        width: edge,
    };
    Photo {
        id: id.to_string(),
        user: PhotoUser {
            id: "u".to_string(),
            username: "user".to_string(),
            name: "User".to_string(),
            profile_picture: String::new(),
        },
        liked: false,
        likes: Likes { count: 0 },
        tags: Vec::new(),
        images: ImageSet {
            thumbnail: image_ref(thumbnail, 150),
            low: image_ref(low, 320),
            standard: image_ref(standard, 640),
        },
    }
}
