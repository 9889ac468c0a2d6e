/// Video locator engine
///
/// Classifies the page, runs the selector cascades that apply to it, extracts
/// title/URL records from the matched elements, waits for late content when a
/// platform page has not rendered its entries yet, and merges everything into one
/// deduplicated list.

pub mod cascade;
pub mod context;
pub mod dedup;
pub mod extract;
pub mod facade;
pub mod title;
pub mod watcher;

// Re-export main types
pub use cascade::{Cascade, SelectorCascadeResolver};
pub use context::{ContextTag, PageContextClassifier};
pub use dedup::Deduplicator;
pub use extract::VideoRecordExtractor;
pub use facade::VideoLocator;
pub use title::TitleNormalizer;
pub use watcher::{DynamicContentWatcher, WatchOutcome};

use serde::{Deserialize, Serialize};

/// Where a record came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VideoKind {
    /// Entry of a platform playlist view
    #[serde(rename = "youtube-playlist")]
    PlaylistEntry,
    /// Entry of a platform home, search, channel or watch page
    #[serde(rename = "youtube-home")]
    PlatformHomeEntry,
    /// Native `<video>` element
    #[serde(rename = "html5")]
    NativeElement,
    /// Embedded player frame
    #[serde(rename = "embedded")]
    EmbeddedFrame,
}

/// A single located video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoRecord {
    /// Whitespace-normalized, never empty
    pub title: String,
    /// Absolute URL, unique within one locate result
    pub url: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    /// Position within the query pass that produced the record
    #[serde(rename = "index")]
    pub ordinal: usize,
}
