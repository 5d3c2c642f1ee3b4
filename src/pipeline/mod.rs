//! File event processing pipeline
//!
//! Every file created on a watched volume flows through:
//!
//! ```text
//! FileEvent → Category (by extension)
//!    ├─ Document → DocumentExtractor → classifier ─┐
//!    ├─ Image    → OcrExtractor      → classifier ─┼─ sensitive → ApprovalClient
//!    ├─ Archive  ─────────────────────────────────────────────→ ApprovalClient
//!    └─ Other                                          │
//!                                                      ↓
//!                          FileDisposer: CopyToSafe | CopyToAlert | Delete
//! ```
//!
//! Anything that does not end in `Delete` or `CopyToAlert` is copied to the
//! safe zone. Failures before approval fail open to the safe zone; approval
//! failures fail closed to deletion.

mod disposer;
mod processor;

pub use disposer::{FileDisposer, Zone};
pub use processor::{FilePipeline, ProcessReport};

use crate::device::Volume;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// File category, derived from the extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// .txt, .doc, .docx, .ppt, .pptx
    Document,
    /// .zip, .rar
    Archive,
    /// .jpg, .jpeg, .png
    Image,
    /// Anything else
    Other,
}

impl Category {
    pub fn from_path(path: &Path) -> Self {
        match lowercase_extension(path).as_deref() {
            Some("txt" | "doc" | "docx" | "ppt" | "pptx") => Self::Document,
            Some("zip" | "rar") => Self::Archive,
            Some("jpg" | "jpeg" | "png") => Self::Image,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Document => "document",
            Self::Archive => "archive",
            Self::Image => "image",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Final action taken on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Released to the safe zone
    CopyToSafe,
    /// Sensitive but approved; released to the alert zone
    CopyToAlert,
    /// Removed from the volume
    Delete,
    /// Nothing could be done (file vanished before processing)
    NoAction,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CopyToSafe => "copy_to_safe",
            Self::CopyToAlert => "copy_to_alert",
            Self::Delete => "delete",
            Self::NoAction => "no_action",
        };
        f.write_str(s)
    }
}

/// A single file-creation notification.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// Path as reported at creation time
    pub path: PathBuf,
    /// Volume the file was created on
    pub volume: Volume,
    /// When the watcher saw the event
    pub detected_at: DateTime<Utc>,
}

impl FileEvent {
    pub fn new(path: PathBuf, volume: Volume) -> Self {
        Self {
            path,
            volume,
            detected_at: Utc::now(),
        }
    }
}

/// Extension of `path`, lowercased, without the dot.
pub(crate) fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_table() {
        let cases = [
            ("a.txt", Category::Document),
            ("a.doc", Category::Document),
            ("a.docx", Category::Document),
            ("a.ppt", Category::Document),
            ("a.pptx", Category::Document),
            ("a.zip", Category::Archive),
            ("a.rar", Category::Archive),
            ("a.jpg", Category::Image),
            ("a.jpeg", Category::Image),
            ("a.png", Category::Image),
            ("a.pdf", Category::Other),
            ("a.tar.gz", Category::Other),
            ("README", Category::Other),
        ];
        for (name, expected) in cases {
            assert_eq!(Category::from_path(Path::new(name)), expected, "{}", name);
        }
    }

    #[test]
    fn test_category_is_case_insensitive() {
        assert_eq!(Category::from_path(Path::new("/media/usb/SCAN.PNG")), Category::Image);
        assert_eq!(Category::from_path(Path::new("Plans.DocX")), Category::Document);
        assert_eq!(Category::from_path(Path::new("BACKUP.Zip")), Category::Archive);
    }

    #[test]
    fn test_dotfile_without_extension() {
        assert_eq!(Category::from_path(Path::new(".txt")), Category::Other);
    }

    #[test]
    fn test_event_carries_owning_volume() {
        let volume = Volume::new("/media/usb");
        let event = FileEvent::new(PathBuf::from("/media/usb/a.txt"), volume.clone());
        assert_eq!(event.volume, volume);
        assert!(event.path.starts_with(event.volume.mount_point()));
    }
}
