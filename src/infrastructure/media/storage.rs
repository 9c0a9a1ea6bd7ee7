//! Local file storage for uploaded media

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::domain::DomainError;

/// Longest media-relative name a profile can record
pub const MAX_MEDIA_NAME_LEN: usize = 100;

const RANDOM_SUFFIX_LEN: usize = 7;
const MAX_EXTENSION_LEN: usize = 10;

/// Trait for storing uploaded files
#[async_trait]
pub trait MediaStorage: Send + Sync + Debug {
    /// Store content under `dir`, returning the media-relative name actually used
    async fn save(&self, dir: &str, filename: &str, content: &[u8]) -> Result<String, DomainError>;

    /// Whether a media-relative name exists
    async fn exists(&self, name: &str) -> Result<bool, DomainError>;

    /// Remove a stored file; missing files are not an error
    async fn delete(&self, name: &str) -> Result<(), DomainError>;
}

/// Media storage rooted in a local directory
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    max_name_len: usize,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_name_len: MAX_MEDIA_NAME_LEN,
        }
    }

    /// Limit the length of returned names, directory included
    pub fn with_max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and the given subdirectories
    pub async fn ensure_dirs(&self, dirs: &[&str]) -> Result<(), DomainError> {
        for dir in std::iter::once("").chain(dirs.iter().copied()) {
            fs::create_dir_all(self.root.join(dir)).await.map_err(|e| {
                DomainError::storage(format!("Failed to create media directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// File name within `dir` whose full media name fits `max_name_len`.
    ///
    /// The stem is shortened first; the suffix and extension are kept.
    fn fit_filename(
        &self,
        dir: &str,
        stem: &str,
        suffix: Option<&str>,
        extension: &str,
    ) -> Result<String, DomainError> {
        let suffix = suffix.map(|s| format!("_{}", s)).unwrap_or_default();
        let extension_len = if extension.is_empty() { 0 } else { extension.len() + 1 };
        let reserved = dir.len() + 1 + suffix.len() + extension_len;

        let budget = self
            .max_name_len
            .checked_sub(reserved)
            .filter(|budget| *budget > 0)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Media names under '{}' cannot fit in {} characters",
                    dir, self.max_name_len
                ))
            })?;

        let stem: String = stem.chars().take(budget).collect();

        Ok(join_filename(&format!("{}{}", stem, suffix), extension))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, dir: &str, filename: &str, content: &[u8]) -> Result<String, DomainError> {
        let dir = dir.trim_matches('/');
        let dir_path = self.root.join(dir);
        fs::create_dir_all(&dir_path)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create media directory: {}", e)))?;

        let (stem, extension) = split_filename(filename);
        let mut candidate = self.fit_filename(dir, &stem, None, &extension)?;

        // Claim the name atomically; on collision retry with a random suffix
        loop {
            let path = dir_path.join(&candidate);
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match opened {
                Ok(mut file) => {
                    use tokio::io::AsyncWriteExt;
                    file.write_all(content)
                        .await
                        .map_err(|e| DomainError::storage(format!("Failed to write media: {}", e)))?;
                    file.flush()
                        .await
                        .map_err(|e| DomainError::storage(format!("Failed to write media: {}", e)))?;
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    candidate =
                        self.fit_filename(dir, &stem, Some(&random_suffix()), &extension)?;
                }
                Err(e) => {
                    return Err(DomainError::storage(format!("Failed to store media: {}", e)));
                }
            }
        }

        let name = format!("{}/{}", dir, candidate);
        debug!(name = %name, bytes = content.len(), "Media stored");

        Ok(name)
    }

    async fn exists(&self, name: &str) -> Result<bool, DomainError> {
        fs::try_exists(self.root.join(name))
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check media: {}", e)))
    }

    async fn delete(&self, name: &str) -> Result<(), DomainError> {
        match fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                debug!(name = %name, "Media deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::storage(format!("Failed to delete media: {}", e))),
        }
    }
}

/// Split a client-supplied filename into a safe stem and lowercase extension
fn split_filename(filename: &str) -> (String, String) {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (base, String::new()),
    };

    let mut stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if stem.trim_matches('_').is_empty() {
        stem = "upload".to_string();
    }

    let extension = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect();

    (stem, extension)
}

fn join_filename(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect()
}
