//! Location image pipeline.
//!
//! An accepted upload is saved under a generated name, renamed after the
//! client's file, transcoded into two WebP variants and copied to object
//! storage. The local copies are a cache: when they disappear, readers are
//! pointed at the backup URLs instead.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::{DynamicImage, ImageReader, imageops::FilterType};
use sharedspace_types::api::ResolvedImages;
use sharedspace_types::models::Images;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::origin::RequestOrigin;
use crate::state::AppState;
use crate::storage::ObjectStorage;

/// Route prefix local uploads are served under.
pub const UPLOADS_ROUTE: &str = "uploads";

pub const MAIN_IMAGE_WIDTH: u32 = 1118;
pub const SMALL_IMAGE_WIDTH: u32 = 248;
pub const WEBP_QUALITY: f32 = 90.0;

const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "avif", "webp"];
const ACCEPTED_MIME_SUBTYPES: &[&str] = &["png", "jpeg", "avif", "webp"];
const SMALL_PREFIX: &str = "small-";

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("webp encode failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An image file received in a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// The two transcoded variants on local disk.
#[derive(Debug, Clone)]
pub struct DerivedImages {
    pub main: PathBuf,
    pub small: PathBuf,
}

/// Pre-upload gate: both the file name and the declared MIME type must name
/// a supported format.
pub fn check_image_format(file_name: &str, content_type: &str) -> Result<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let content_type = content_type.trim().to_ascii_lowercase();

    let extension_ok = ACCEPTED_EXTENSIONS.contains(&extension.as_str());
    let mime_ok = ACCEPTED_MIME_SUBTYPES
        .iter()
        .any(|subtype| content_type.ends_with(subtype));

    if extension_ok && mime_ok {
        Ok(())
    } else {
        Err(AppError::InvalidImageFormat(format!("{file_name} ({content_type})")))
    }
}

/// `<base>-<millis>-<nonce><ext>`, built from the last path component of the
/// client's file name. Characters outside `[A-Za-z0-9_-]` in the base become `-`.
pub fn renamed_file_name(original_name: &str, timestamp_millis: i64, nonce: u32) -> String {
    let original = Path::new(original_name);
    let base: String = original
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let base = if base.is_empty() { "image".to_string() } else { base };

    let extension = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    format!("{base}-{timestamp_millis}-{nonce:08x}{extension}")
}

/// Public, server-relative path of a file in the upload directory.
pub fn public_path(file_name: &str) -> String {
    format!("{UPLOADS_ROUTE}/{file_name}")
}

/// Write the raw upload under a generated name.
pub async fn save_upload(dir: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(Uuid::new_v4().simple().to_string());
    fs::write(&path, bytes).await?;
    Ok(path)
}

/// Move a saved upload to its final, client-derived name.
pub async fn rename_upload(dir: &Path, stored: &Path, original_name: &str) -> io::Result<PathBuf> {
    let file_name = renamed_file_name(original_name, chrono::Utc::now().timestamp_millis(), rand::random());
    let renamed = dir.join(file_name);

    fs::rename(stored, &renamed).await?;
    debug!("Renamed upload {} -> {}", stored.display(), renamed.display());
    Ok(renamed)
}

/// Decode `source` and write the main and small WebP variants next to it.
/// Blocking; run it on the blocking pool.
pub fn transcode(source: &Path) -> std::result::Result<DerivedImages, TranscodeError> {
    let image = ImageReader::open(source)?.with_guessed_format()?.decode()?;

    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let derived = DerivedImages {
        main: dir.join(format!("{stem}.webp")),
        small: dir.join(format!("{SMALL_PREFIX}{stem}.webp")),
    };

    encode_webp(&cap_width(&image, MAIN_IMAGE_WIDTH), &derived.main)?;
    encode_webp(&cap_width(&image, SMALL_IMAGE_WIDTH), &derived.small)?;

    Ok(derived)
}

/// Shrink to `max_width` keeping the aspect ratio. Never upscales.
fn cap_width(image: &DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image.clone();
    }

    let height = (f64::from(image.height()) * f64::from(max_width) / f64::from(image.width()))
        .round()
        .max(1.0) as u32;
    image.resize_exact(max_width, height, FilterType::Lanczos3)
}

fn encode_webp(image: &DynamicImage, path: &Path) -> std::result::Result<(), TranscodeError> {
    // libwebp only takes 8-bit RGB(A)
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let encoder = webp::Encoder::from_image(&rgba).map_err(|e| TranscodeError::Encode(e.to_string()))?;
    let encoded = encoder.encode(WEBP_QUALITY);

    std::fs::write(path, &*encoded)?;
    Ok(())
}

/// Upload both variants and return their public `(main, small)` URLs.
pub async fn backup_images(storage: &dyn ObjectStorage, derived: &DerivedImages) -> Result<(String, String)> {
    let main = backup_file(storage, &derived.main).await?;
    let small = backup_file(storage, &derived.small).await?;
    Ok((main, small))
}

async fn backup_file(storage: &dyn ObjectStorage, path: &Path) -> Result<String> {
    let file_name = file_name_of(path)?;
    let object = public_path(&file_name);
    let contents = fs::read(path).await?;

    storage
        .upload(&object, contents, "image/webp")
        .await
        .map_err(AppError::from)?;

    Ok(storage.public_url(&object))
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Internal(format!("no file name in {}", path.display())))
}

/// Full upload pipeline: save, rename, transcode, back up.
pub async fn process_upload(state: &AppState, upload: ImageUpload) -> Result<Images> {
    let dir = &state.config.upload_path;

    let stored = save_upload(dir, &upload.bytes).await?;
    let renamed = rename_upload(dir, &stored, &upload.file_name).await?;

    let derived = tokio::task::spawn_blocking(move || transcode(&renamed)).await??;

    let (backup, backup_small) = backup_images(state.storage.as_ref(), &derived).await?;

    let images = Images {
        image: Some(public_path(&file_name_of(&derived.main)?)),
        small: Some(public_path(&file_name_of(&derived.small)?)),
        backup: Some(backup),
        backup_small: Some(backup_small),
    };

    info!(
        "Processed upload {} ({}, {} bytes) into {:?}",
        upload.file_name,
        upload.content_type,
        upload.bytes.len(),
        images.image
    );
    Ok(images)
}

/// Client-facing URLs: the local copy when it still exists, else the backup.
pub async fn resolve_images(images: &Images, origin: &RequestOrigin, upload_dir: &Path) -> ResolvedImages {
    ResolvedImages {
        image: resolve_one(images.image.as_deref(), images.backup.as_deref(), origin, upload_dir).await,
        small: resolve_one(images.small.as_deref(), images.backup_small.as_deref(), origin, upload_dir).await,
    }
}

async fn resolve_one(
    local: Option<&str>,
    backup: Option<&str>,
    origin: &RequestOrigin,
    upload_dir: &Path,
) -> Option<String> {
    if let Some(path) = local {
        let cached = match Path::new(path).file_name() {
            Some(name) => fs::try_exists(upload_dir.join(name)).await.unwrap_or(false),
            None => false,
        };
        if cached {
            return Some(origin.url_for(path));
        }
    }

    backup.map(str::to_string)
}
