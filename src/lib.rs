/// Video Locator
///
/// Best-effort discovery of playable videos in an already-rendered document:
/// platform playlist and grid entries, native `<video>` elements and embedded
/// player frames, merged into one deduplicated list.

pub mod autorun;
pub mod config;
pub mod locator;
pub mod messaging;
pub mod page;

// Re-export main types for easy access
pub use crate::autorun::{spawn_auto_detect, DetectionSlot, DetectionSnapshot};
pub use crate::config::{ConfigBuilder, LocatorConfig};
pub use crate::locator::{ContextTag, VideoKind, VideoLocator, VideoRecord};
pub use crate::messaging::{MessageHandler, Request, Response};
pub use crate::page::{DocumentHost, MutationRecord, Page, PageCommand, ReadyState};

/// Result type for locator operations
pub type Result<T> = std::result::Result<T, LocatorError>;

/// Error types for locator operations
#[derive(thiserror::Error, Debug)]
pub enum LocatorError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported navigation target: {0}")]
    UnsupportedTarget(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Locator panicked: {0}")]
    Panicked(String),
}
