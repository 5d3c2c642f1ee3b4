//! DriveWarden - Removable Media Data-Loss-Prevention Agent
//!
//! DriveWarden watches removable drives (USB sticks, SD cards, external
//! disks) and screens every file written to them. Harmless files are copied
//! to a safe zone; sensitive content is held until a remote approval service
//! releases it to an alert zone, or it is deleted from the medium.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Device Lifecycle Manager                     │
//! │  poll removable volumes ─▶ reconcile ─▶ one watcher per volume    │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ attach / detach
//! ┌──────────────────────────────▼───────────────────────────────────┐
//! │                          Volume Watcher                           │
//! │  OS file notifications ─▶ bounded queue ─▶ serial dispatch task   │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ FileEvent
//! ┌──────────────────────────────▼───────────────────────────────────┐
//! │                        File Event Pipeline                        │
//! │  ┌────────────┐   ┌────────────┐   ┌─────────────────────────┐   │
//! │  │  Category  │──▶│  Extract   │──▶│  Keyword classifier     │   │
//! │  │  by ext.   │   │  docx/OCR  │   │  ─▶ approval service    │   │
//! │  └────────────┘   └────────────┘   └────────────┬────────────┘   │
//! └─────────────────────────────────────────────────┼────────────────┘
//!                                                   │ Disposition
//! ┌─────────────────────────────────────────────────▼────────────────┐
//! │                          File Disposer                            │
//! │         copy to safe zone │ copy to alert zone │ delete           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`device`]: Removable volume tracking and per-volume watchers
//! - [`pipeline`]: Categorization, screening and disposal of new files
//! - [`extract`]: Text extraction from documents and images
//! - [`classifier`]: Sensitive content detection
//! - [`approval`]: Remote approval requests
//! - [`config`]: Configuration management

pub mod approval;
pub mod classifier;
pub mod config;
pub mod device;
pub mod error;
pub mod extract;
pub mod pipeline;

pub use config::AgentConfig;
pub use error::{Error, Result};
