//! Image acquisition: HTTP fetch for the scan path, local directory walk
//! for the simulation path. The orchestrator's core logic is agnostic to
//! which of these produced a given `Image`.

use crate::domain::Image;
use crate::error::{PipelineError, Result};
use std::path::Path;
use tracing::warn;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Fetches every URL in `urls` for one room, tagging each successfully
/// fetched image with `room_id` and its position in `urls`. Per-URL
/// failures (network error, non-2xx, blocked host) are logged and the
/// URL is dropped rather than failing the whole room.
pub async fn fetch_image_urls(
    client: &reqwest::Client,
    room_id: &str,
    urls: &[String],
    allow_localhost_urls: bool,
) -> Vec<Image> {
    let mut images = Vec::with_capacity(urls.len());

    for (index, url) in urls.iter().enumerate() {
        match fetch_one(client, url, allow_localhost_urls).await {
            Ok(bytes) => images.push(Image::new(bytes, Some(room_id.to_string()), index)),
            Err(err) => warn!(room_id, url, %err, "dropping image that failed to fetch"),
        }
    }

    images
}

async fn fetch_one(client: &reqwest::Client, url: &str, allow_localhost_urls: bool) -> Result<Vec<u8>> {
    let parsed = url::Url::parse(url).map_err(|e| PipelineError::InvalidInput(format!("invalid image url {url}: {e}")))?;

    if !allow_localhost_urls && is_loopback_host(&parsed) {
        return Err(PipelineError::InvalidInput(format!(
            "image url resolves to a loopback host, which is disabled: {url}"
        )));
    }

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| PipelineError::UpstreamTransient(e.to_string()))?;

    if !response.status().is_success() {
        return Err(PipelineError::UpstreamTransient(format!(
            "image fetch returned {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PipelineError::UpstreamTransient(e.to_string()))?;

    Ok(bytes.to_vec())
}

fn is_loopback_host(url: &url::Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Walks a local directory tree (already validated by the caller to be a
/// descendant of a fixed simulation base), collecting every recognized
/// image file as one `Image` tagged with `room_id`, in deterministic
/// (sorted) path order.
pub fn load_room_images_from_dir(dir: &Path, room_id: &str) -> Result<Vec<Image>> {
    let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => images.push(Image::new(bytes, Some(room_id.to_string()), index)),
            Err(err) => warn!(path = %path.display(), %err, "dropping image that failed to read"),
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts_are_detected() {
        assert!(is_loopback_host(&url::Url::parse("http://localhost:8080/a.jpg").unwrap()));
        assert!(is_loopback_host(&url::Url::parse("http://127.0.0.1/a.jpg").unwrap()));
        assert!(!is_loopback_host(&url::Url::parse("https://example.com/a.jpg").unwrap()));
    }

    #[test]
    fn loads_images_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::fs::write(dir.path().join("ignore.txt"), b"nope").unwrap();

        let images = load_room_images_from_dir(dir.path(), "kitchen").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].bytes, b"a");
        assert_eq!(images[1].bytes, b"b");
    }
}
