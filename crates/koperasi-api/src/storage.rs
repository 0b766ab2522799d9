use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Directory under the public root where uploaded documents are written.
pub const DOCUMENT_DIR: &str = "uploads/documents";

/// On-disk document storage rooted at the public directory.
///
/// Document records keep a path relative to this root (a leading `/` is
/// tolerated). Every access goes through [`Storage::resolve`], which refuses
/// anything that could leave the root.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(root.join(DOCUMENT_DIR)).await?;
        info!("Public file root: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a stored relative path to a location under the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let trimmed = relative.trim_start_matches('/');
        let path = Path::new(trimmed);
        if trimmed.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
            bail!("Path '{}' escapes the public root", relative);
        }
        Ok(self.root.join(path))
    }

    /// Write a new file. Fails if something already exists at that path.
    pub async fn write_file(&self, relative: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    /// Open a stored file for streaming, returning it with its size on disk.
    /// `Ok(None)` means the file is missing.
    pub async fn open_file(&self, relative: &str) -> Result<Option<(fs::File, u64)>> {
        let path = self.resolve(relative)?;
        match fs::File::open(&path).await {
            Ok(file) => {
                let size = file.metadata().await?.len();
                Ok(Some((file, size)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn delete_file(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File {} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
