//! Terminal file actions: copy out to a zone, or delete

use super::Disposition;
use crate::config::{SourcePolicy, ZonesConfig};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Destination zone for released files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Safe,
    Alert,
}

/// Executes dispositions against the filesystem.
#[derive(Debug, Clone)]
pub struct FileDisposer {
    safe_dir: PathBuf,
    alert_dir: PathBuf,
    source_policy: SourcePolicy,
}

impl FileDisposer {
    /// Relative zone dirs are resolved against the working directory here,
    /// since watched paths always arrive absolute.
    pub fn new(config: &ZonesConfig) -> Self {
        Self {
            safe_dir: absolutize(&config.safe_dir),
            alert_dir: absolutize(&config.alert_dir),
            source_policy: config.source_policy,
        }
    }

    pub fn zone_dir(&self, zone: Zone) -> &Path {
        match zone {
            Zone::Safe => &self.safe_dir,
            Zone::Alert => &self.alert_dir,
        }
    }

    /// True for paths inside either destination zone.
    pub fn is_zone_path(&self, path: &Path) -> bool {
        path.starts_with(&self.safe_dir) || path.starts_with(&self.alert_dir)
    }

    /// Run `disposition` on `path`, then apply the source policy after a copy.
    pub async fn apply(&self, path: &Path, disposition: Disposition) -> Result<()> {
        let zone = match disposition {
            Disposition::CopyToSafe => Zone::Safe,
            Disposition::CopyToAlert => Zone::Alert,
            Disposition::Delete => return self.delete(path).await,
            Disposition::NoAction => return Ok(()),
        };

        self.copy_to(zone, path).await?;
        if self.source_policy == SourcePolicy::RemoveAfterCopy {
            self.delete(path).await?;
        }
        Ok(())
    }

    /// Copy `src` into `zone` under its original file name.
    ///
    /// The bytes land in a uniquely named staging file first and are renamed
    /// over the destination, so concurrent copies of the same name never
    /// interleave and an existing file is only replaced by a complete one.
    pub async fn copy_to(&self, zone: Zone, src: &Path) -> Result<PathBuf> {
        let dir = self.zone_dir(zone);
        let name = src
            .file_name()
            .ok_or_else(|| Error::Disposal(format!("{} has no file name", src.display())))?;

        tokio::fs::create_dir_all(dir).await?;

        let dest = dir.join(name);
        let staging = dir.join(format!(
            ".{}.{}.partial",
            name.to_string_lossy(),
            uuid::Uuid::new_v4().simple()
        ));

        if let Err(e) = tokio::fs::copy(src, &staging).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(Error::Disposal(format!(
                "Failed to copy {} to {}: {}",
                src.display(),
                dir.display(),
                e
            )));
        }

        if let Err(e) = tokio::fs::rename(&staging, &dest).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(Error::Disposal(format!(
                "Failed to move {} into place: {}",
                dest.display(),
                e
            )));
        }

        Ok(dest)
    }

    /// Remove `path`. A file that is already gone is not an error.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "File already gone");
                Ok(())
            }
            Err(e) => Err(Error::Disposal(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot resolve relative zone directory");
            path.to_path_buf()
        }
    }
}
