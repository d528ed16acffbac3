//! Globe texture loading.

use crate::error::{Error, Result};
use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// Texture bytes ready to serve.
#[derive(Debug, Clone)]
pub struct Texture {
    pub path: PathBuf,
    /// Shared; clones do not copy the image
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl Texture {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Guess the MIME type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Read the texture, reporting whole-percent progress as it goes.
///
/// `progress` is called with non-decreasing values and always ends at 100
/// on success.
pub async fn load_texture<F>(path: &Path, mut progress: F) -> Result<Texture>
where
    F: FnMut(u8),
{
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::Asset(format!("{}: {}", path.display(), e)))?;
    let total = file.metadata().await?.len() as usize;
    if total == 0 {
        return Err(Error::Asset(format!("{}: file is empty", path.display())));
    }

    let mut bytes = Vec::with_capacity(total);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut reported = 0u8;
    progress(0);

    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);

        let percent = ((bytes.len() * 100) / total).min(100) as u8;
        if percent > reported {
            reported = percent;
            progress(percent);
        }
    }

    if reported < 100 {
        progress(100);
    }

    tracing::info!(
        "Loaded texture {} ({:.2} MB)",
        path.display(),
        bytes.len() as f64 / 1_000_000.0
    );

    Ok(Texture {
        path: path.to_path_buf(),
        content_type: content_type(path),
        bytes: Bytes::from(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn content_types() {
        assert_eq!(content_type(Path::new("earth-4k.jpg")), "image/jpeg");
        assert_eq!(content_type(Path::new("EARTH.PNG")), "image/png");
        assert_eq!(content_type(Path::new("earth")), "application/octet-stream");
    }

    #[tokio::test]
    async fn loads_with_progress() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(&vec![7u8; CHUNK_SIZE * 3 + 17]).unwrap();

        let mut seen = Vec::new();
        let texture = load_texture(file.path(), |p| seen.push(p)).await.unwrap();

        assert_eq!(texture.len(), CHUNK_SIZE * 3 + 17);
        assert_eq!(texture.content_type, "image/jpeg");
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[1] >= w[0]));
    }

    #[tokio::test]
    async fn texture_clones_share_bytes() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[1u8; 4096]).unwrap();

        let texture = load_texture(file.path(), |_| {}).await.unwrap();
        let served = texture.clone();
        assert_eq!(served.bytes.as_ptr(), texture.bytes.as_ptr());
        assert_eq!(served.len(), 4096);
    }

    #[tokio::test]
    async fn missing_file_is_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_texture(&dir.path().join("nope.jpg"), |_| {}).await;
        assert!(matches!(result, Err(Error::Asset(_))));
    }

    #[test]
    fn empty_file_is_asset_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = tokio_test::block_on(load_texture(file.path(), |_| {}));
        assert!(matches!(result, Err(Error::Asset(_))));
    }
}
