use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use photos_viewer::core::models::{Account, ImageSize};
use photos_viewer::core::services::{ImageRequest, NavigationPolicy};
use photos_viewer::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding config.json (defaults to ~/.photos_viewer)
    #[arg(short, long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the authorization URL to open in a browser
    LoginUrl,
    /// Print the logout URL
    LogoutUrl,
    /// Complete a login from the redirect URL the browser landed on
    Capture { redirect: String },
    /// List the signed-in user's recent photos
    Photos {
        #[arg(long, env = "PHOTOS_TOKEN")]
        token: String,
    },
    /// Download one rendition of a photo
    Download {
        #[arg(long, env = "PHOTOS_TOKEN")]
        token: String,
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "thumbnail")]
        size: ImageSize,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Download every thumbnail into a directory
    Thumbnails {
        #[arg(long, env = "PHOTOS_TOKEN")]
        token: String,
        #[arg(short, long)]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let state = match args.data_dir {
        Some(dir) => AppState::with_data_dir(dir),
        None => AppState::new(),
    }
    .context("failed to initialise state")?;

    match args.command {
        Command::LoginUrl => println!("{}", state.session.login_url()),
        Command::LogoutUrl => println!("{}", state.session.logout_url()),
        Command::Capture { redirect } => capture(&state, &redirect)?,
        Command::Photos { token } => list_photos(&state, &token).await?,
        Command::Download {
            token,
            id,
            size,
            out,
        } => download(&state, &token, &id, size, &out).await?,
        Command::Thumbnails { token, out_dir } => thumbnails(&state, &token, &out_dir).await?,
    }

    Ok(())
}

fn capture(state: &AppState, redirect: &str) -> anyhow::Result<()> {
    let url = Url::parse(redirect).context("redirect is not a valid URL")?;

    state.session.login();
    if state.session.decide_policy(&url) != NavigationPolicy::Cancel {
        bail!("{} is not on the redirect host", url);
    }

    let account = state
        .session
        .current_account()
        .ok_or_else(|| anyhow!("redirect did not carry an id_token"))?;

    println!("{}", account.token());
    if let Some(claims) = account.claims() {
        if let Some(name) = claims.display_name() {
            eprintln!("signed in as {}", name);
        }
        if let Some(exp) = claims.exp.and_then(|e| chrono::DateTime::from_timestamp(e, 0)) {
            eprintln!("token expires {}", exp);
        }
    }
    Ok(())
}

async fn list_photos(state: &AppState, token: &str) -> anyhow::Result<()> {
    let manager = state.photo_manager(&Account::new(token))?;
    let photos = manager.load_photos().await?;

    for photo in photos {
        println!(
            "{}\t@{}\t{} likes{}\t{}",
            photo.id,
            photo.user.username,
            photo.likes.count,
            if photo.liked { " (liked)" } else { "" },
            photo.tags.join(",")
        );
    }
    Ok(())
}

async fn download(
    state: &AppState,
    token: &str,
    id: &str,
    size: ImageSize,
    out: &Path,
) -> anyhow::Result<()> {
    let manager = state.photo_manager(&Account::new(token))?;
    let photos = manager.load_photos().await?;
    let photo = photos
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow!("no photo with id {}", id))?;

    let image = manager
        .image(photo, size)
        .await
        .ok_or_else(|| anyhow!("could not fetch {} image for {}", size, id))?;
    image.save(out)?;
    tracing::info!("Saved {} ({}x{})", out.display(), image.width(), image.height());
    Ok(())
}

async fn thumbnails(state: &AppState, token: &str, out_dir: &Path) -> anyhow::Result<()> {
    let gallery = state.gallery(&Account::new(token))?;
    let count = gallery.reload().await?;
    std::fs::create_dir_all(out_dir)?;

    // Images are written as they arrive, so cache eviction cannot lose any
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for index in 0..count {
        let ready = tx.clone();
        let request = gallery.request_image(index, move |id, image| {
            let _ = ready.send((id.to_string(), image));
        });
        if let (ImageRequest::Cached(image), Some(photo)) = (request, gallery.photo_at(index)) {
            let _ = tx.send((photo.id.clone(), image));
        }
    }
    drop(tx);

    // Closes once every fetch has either delivered or dropped its callback
    let mut saved = 0;
    while let Some((id, image)) = rx.recv().await {
        image.save(out_dir.join(format!("{}.png", id)))?;
        saved += 1;
    }
    tracing::info!("Saved {}/{} thumbnails to {}", saved, count, out_dir.display());
    Ok(())
}
