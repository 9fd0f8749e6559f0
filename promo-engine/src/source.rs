use std::fs::File;
use std::path::{Path, PathBuf};

use common::utils::config::AppEnv;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::SourceError;

/// One configured coupon source, fixed at engine construction.
#[derive(Debug, Clone)]
pub(crate) struct SourceDescriptor {
    /// Zero-based position in the configured list, used for logging.
    pub(crate) index: usize,
    pub(crate) url: String,
    /// Basename of the URL path, e.g. `couponbase1.gz`; the name looked up in
    /// the local coupon directory in development.
    pub(crate) file_name: String,
}

impl SourceDescriptor {
    pub(crate) fn from_urls(urls: &[String]) -> Vec<Self> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| Self {
                index,
                url: url.clone(),
                file_name: file_name_of(url),
            })
            .collect()
    }
}

fn file_name_of(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Compressed input for one source, ready for the blocking extract stage.
/// The downloaded variant owns its temp file and deletes it on drop.
pub(crate) enum SourceInput {
    Local(PathBuf),
    Downloaded(NamedTempFile),
}

impl SourceInput {
    pub(crate) fn open(&self) -> Result<File, SourceError> {
        match self {
            SourceInput::Local(path) => File::open(path).map_err(SourceError::Open),
            SourceInput::Downloaded(temp) => temp.reopen().map_err(SourceError::Scratch),
        }
    }
}

/// Resolve a source to its compressed bytes: the local coupon directory in
/// development when the file exists there, otherwise a remote download.
pub(crate) async fn acquire(
    descriptor: &SourceDescriptor,
    local_coupon_dir: &Path,
    app_env: &AppEnv,
    client: &reqwest::Client,
) -> Result<SourceInput, SourceError> {
    if *app_env == AppEnv::Development {
        let local_path = local_coupon_dir.join(&descriptor.file_name);
        if tokio::fs::try_exists(&local_path).await.unwrap_or(false) {
            info!(
                source = descriptor.index + 1,
                path = %local_path.display(),
                "Loading coupon source from local path"
            );
            return Ok(SourceInput::Local(local_path));
        }
        warn!(
            source = descriptor.index + 1,
            path = %local_path.display(),
            "Local coupon file not found, attempting remote download"
        );
    }

    download(descriptor, client).await
}

/// Stream the compressed body to a temp file chunk by chunk; nothing is held
/// whole in memory. The request deadline covers connect and body read.
async fn download(
    descriptor: &SourceDescriptor,
    client: &reqwest::Client,
) -> Result<SourceInput, SourceError> {
    info!(
        source = descriptor.index + 1,
        url = %descriptor.url,
        "Downloading coupon source"
    );

    let mut response = client.get(&descriptor.url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::FetchStatus(status));
    }

    let temp = NamedTempFile::new().map_err(SourceError::Scratch)?;
    let mut file = tokio::fs::File::create(temp.path())
        .await
        .map_err(SourceError::Scratch)?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await.map_err(SourceError::Scratch)?;
    }
    file.flush().await.map_err(SourceError::Scratch)?;

    Ok(SourceInput::Downloaded(temp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_take_file_name_from_url_path() {
        let urls = vec![
            "https://files.example.com/couponbase1.gz".to_string(),
            "https://files.example.com/nested/couponbase2.gz".to_string(),
        ];

        let descriptors = SourceDescriptor::from_urls(&urls);

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].index, 0);
        assert_eq!(descriptors[0].file_name, "couponbase1.gz");
        assert_eq!(descriptors[1].index, 1);
        assert_eq!(descriptors[1].file_name, "couponbase2.gz");
    }
}
