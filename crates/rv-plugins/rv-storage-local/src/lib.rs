//! # rv-storage-local
//! rusty-reviews/crates/rv-plugins/rv-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Features: Content-addressable storage and directory sharding.

use std::path::PathBuf;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use rv_core::traits::MediaStore;
use sha2::{Digest, Sha256};
use tokio::fs;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root_path: root, url_prefix: url_prefix.trim_end_matches('/').to_string() }
    }

    /// Generates a sharded path: "ab/cd/abcdef...hash.ext"
    fn get_sharded_path(&self, media_id: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&media_id[0..2]);
        path.push(&media_id[2..4]);
        path.push(media_id);
        path
    }
}

/// Picks a file extension for an accepted raster image type.
/// Anything else, including `image/svg+xml`, is refused.
fn image_extension(content_type: &str) -> anyhow::Result<&'static str> {
    let mime: mime::Mime = content_type
        .parse()
        .map_err(|_| anyhow!("unparseable content type '{}'", content_type))?;
    if mime.type_() != mime::IMAGE {
        bail!("'{}' is not an image", content_type);
    }

    let ext = match mime.subtype().as_str() {
        "jpeg" | "pjpeg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        "avif" => "avif",
        _ => bail!("unsupported image type '{}'", content_type),
    };
    Ok(ext)
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        if data.is_empty() {
            bail!("empty upload");
        }
        if data.len() > MAX_UPLOAD_BYTES {
            bail!("upload of {} bytes exceeds {} byte limit", data.len(), MAX_UPLOAD_BYTES);
        }
        let ext = image_extension(content_type)?;

        // 1. Calculate Hash
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let media_id = format!("{:x}.{}", hasher.finalize(), ext);

        let target_path = self.get_sharded_path(&media_id);
        let parent = target_path
            .parent()
            .ok_or_else(|| anyhow!("sharded path has no parent"))?;

        // 2. Ensure directory exists
        fs::create_dir_all(parent).await?;

        // 3. Save Original (if not exists)
        if !fs::try_exists(&target_path).await? {
            fs::write(&target_path, &data).await?;
            log::debug!("stored {} ({} bytes)", media_id, data.len());
        }

        Ok(media_id)
    }

    async fn get_url(&self, media_id: &str) -> String {
        let rel_path = format!("{}/{}/{}", &media_id[0..2], &media_id[2..4], media_id);
        format!("{}/{}", self.url_prefix, rel_path)
    }
}
