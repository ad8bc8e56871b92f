//! Avatar decoding, WebP re-encoding and storage.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 4096;

/// Directory under the static root holding avatar files.
pub const AVATAR_DIR: &str = "images/avatars";

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Uploaded file is not a valid image")]
    InvalidImage,
    #[error("Unsupported image format")]
    UnsupportedFormat(ImageFormat),
    #[error("failed to encode avatar: {0}")]
    Encode(#[source] ImageError),
}

fn is_accepted(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP
    )
}

/// Decode an uploaded JPEG, PNG or WebP and re-encode it as WebP.
///
/// CPU bound; call from `spawn_blocking`.
pub fn process_avatar(bytes: &[u8]) -> Result<Vec<u8>, AvatarError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| AvatarError::InvalidImage)?;

    let format = reader.format().ok_or(AvatarError::InvalidImage)?;
    if !is_accepted(format) {
        return Err(AvatarError::UnsupportedFormat(format));
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    reader.limits(limits);

    let image = reader.decode().map_err(|e| {
        tracing::debug!("avatar decode failed: {}", e);
        AvatarError::InvalidImage
    })?;

    // The WebP encoder only takes 8-bit buffers.
    let image = DynamicImage::ImageRgba8(image.to_rgba8());

    let mut out = Vec::new();
    image
        .write_with_encoder(WebPEncoder::new_lossless(&mut out))
        .map_err(AvatarError::Encode)?;
    Ok(out)
}

pub fn avatar_file_name(user_id: i64) -> String {
    format!("avatar-{}-su.webp", user_id)
}

/// Public URL of a user's avatar.
pub fn avatar_url(user_id: i64) -> String {
    format!("/static/{}/{}", AVATAR_DIR, avatar_file_name(user_id))
}

/// Write the encoded avatar under `static_dir`, replacing any previous one.
pub async fn save_avatar(
    static_dir: &Path,
    user_id: i64,
    webp: &[u8],
) -> std::io::Result<PathBuf> {
    let dir = static_dir.join(AVATAR_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(avatar_file_name(user_id));
    tokio::fs::write(&path, webp).await?;
    Ok(path)
}
