/// Page-scoped detection cache and the auto-run that fills it
///
/// When the locator is installed it runs once, shortly after the page becomes
/// ready, and leaves its result in the page's [`DetectionSlot`]. The slot is a
/// convenience only: it is overwritten by every `locate()` and may be stale by
/// the time anyone reads it. Requests for videos always run a fresh locate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AutoRunConfig;
use crate::locator::{VideoLocator, VideoRecord};
use crate::page::ReadyState;

/// Result of one `locate()` run, as cached on the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionSnapshot {
    pub page_url: String,
    pub videos: Vec<VideoRecord>,
    pub captured_at: DateTime<Utc>,
}

/// Latest detection result for one page. Empty until the first `locate()`.
#[derive(Debug, Default)]
pub struct DetectionSlot {
    latest: RwLock<Option<DetectionSnapshot>>,
}

impl DetectionSlot {
    /// Replace the cached result.
    pub fn store(&self, page_url: String, videos: Vec<VideoRecord>) {
        *self.latest.write() = Some(DetectionSnapshot {
            page_url,
            videos,
            captured_at: Utc::now(),
        });
    }

    /// Last stored result, if any. Not guaranteed to match the current document.
    pub fn latest(&self) -> Option<DetectionSnapshot> {
        self.latest.read().clone()
    }
}

/// Run the locator once after the page is ready and the settle delay has passed.
///
/// Returns `None` when auto-run is disabled. Must be called from within a tokio
/// runtime.
pub fn spawn_auto_detect(locator: Arc<VideoLocator>, config: &AutoRunConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        debug!("Auto-run disabled");
        return None;
    }

    let settle_delay = Duration::from_millis(config.settle_delay_ms);
    Some(tokio::spawn(async move {
        let mut ready = locator.host().ready_state();
        let loaded = ready.wait_for(|state| *state != ReadyState::Loading).await.is_ok();
        if !loaded {
            warn!("Page went away before it finished loading, skipping auto-run");
            return;
        }

        tokio::time::sleep(settle_delay).await;

        match locator.locate().await {
            Ok(videos) => info!("🎬 Auto-run detected {} videos", videos.len()),
            Err(e) => warn!("Auto-run detection failed: {}", e),
        }
    }))
}
