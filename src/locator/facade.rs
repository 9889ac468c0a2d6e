use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LocatorConfig;
use crate::page::{DocumentHost, DocumentQuery, PageCommand, QuerySpec, ScrollAlignment, ScrollBehavior};
use crate::{LocatorError, Result};

use super::title::DEFAULT_MAX_TITLE_CHARS;
use super::{
    Cascade, ContextTag, Deduplicator, DynamicContentWatcher, PageContextClassifier, SelectorCascadeResolver,
    TitleNormalizer, VideoKind, VideoRecord, VideoRecordExtractor,
};

const NATIVE_VIDEO_SELECTOR: &str = "video";

/// Everything found without waiting.
struct SynchronousPass {
    context: ContextTag,
    platform: Vec<VideoRecord>,
    native: Vec<VideoRecord>,
    embedded: Vec<VideoRecord>,
}

/// Single entry point of the locator, installed on one page.
///
/// Keeps the records of the most recent [`locate`](Self::locate) call; they are
/// replaced wholesale by the next call.
pub struct VideoLocator {
    host: Arc<dyn DocumentHost>,
    config: Arc<LocatorConfig>,
    classifier: PageContextClassifier,
    extractor: VideoRecordExtractor,
    watcher: DynamicContentWatcher,
    playlist_cascade: Cascade,
    home_cascade: Cascade,
    embed_specs: Vec<QuerySpec>,
    last_records: Mutex<Vec<VideoRecord>>,
}

impl VideoLocator {
    pub fn new(host: Arc<dyn DocumentHost>, config: Arc<LocatorConfig>) -> Self {
        let platform = &config.platform;
        Self {
            classifier: PageContextClassifier::new(platform),
            extractor: VideoRecordExtractor::new(
                TitleNormalizer::new(config.locator.title_max_chars.min(DEFAULT_MAX_TITLE_CHARS)),
                platform.watch_path_marker.clone(),
            ),
            watcher: DynamicContentWatcher::new(Duration::from_millis(config.watcher.timeout_ms)),
            playlist_cascade: Cascade::playlist(&platform.extra_playlist_selectors),
            home_cascade: Cascade::platform_home(&platform.extra_home_selectors),
            embed_specs: config
                .embeds
                .hosts
                .iter()
                .map(|host| QuerySpec::new(format!("iframe[src*=\"{}\"]", host)))
                .collect(),
            last_records: Mutex::new(Vec::new()),
            host,
            config,
        }
    }

    /// Install a locator on `host`, unless one is already installed there.
    pub fn install(host: Arc<dyn DocumentHost>, config: Arc<LocatorConfig>) -> Option<Arc<Self>> {
        if !host.claim_injection() {
            debug!("Locator already installed on {}", host.location());
            return None;
        }
        Some(Arc::new(Self::new(host, config)))
    }

    pub fn host(&self) -> &Arc<dyn DocumentHost> {
        &self.host
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Records produced by the most recent `locate()`.
    pub fn last_records(&self) -> Vec<VideoRecord> {
        self.last_records.lock().clone()
    }

    /// Find every video on the page.
    ///
    /// Platform entries come first, then native elements, then embedded frames,
    /// deduplicated by URL. On a platform page whose entries have not rendered yet
    /// this waits (bounded by the watcher timeout) for them to appear.
    pub async fn locate(&self) -> Result<Vec<VideoRecord>> {
        let started = Instant::now();
        // Subscribe before the first pass so no batch slips in between.
        let mutations = self.host.subscribe_mutations();
        let pass = self.synchronous_pass()?;
        info!(
            "🔍 {:?}: {} platform, {} native, {} embedded candidates",
            pass.context,
            pass.platform.len(),
            pass.native.len(),
            pass.embedded.len()
        );

        let mut platform = pass.platform;
        if platform.is_empty() && pass.context.expects_async_content() && self.config.watcher.enabled {
            platform = self
                .watcher
                .watch_and_retry(mutations, || self.platform_home_pass())
                .await?;
        }

        let videos = Deduplicator::merge([platform, pass.native, pass.embedded]);
        info!("✅ Located {} videos in {:.2?}", videos.len(), started.elapsed());

        *self.last_records.lock() = videos.clone();
        self.host
            .detection_slot()
            .store(self.host.location().to_string(), videos.clone());
        Ok(videos)
    }

    /// Navigate to `url`: same-document redirect for known platform URLs, a new
    /// browsing context otherwise. The target need not be one of the last located
    /// records. Failures are logged and absorbed.
    pub fn navigate(&self, url: &str) {
        match self.navigation_command(url) {
            Ok(command) => {
                info!("➡️ Navigating: {:?}", command);
                self.host.dispatch(command);
            }
            Err(e) => warn!("Failed to navigate to video '{}': {}", url, e),
        }
    }

    /// Scroll the `index`-th `<video>` currently in the document into view and
    /// focus it. Out-of-range indices are ignored.
    pub fn focus(&self, index: usize) {
        let count = match self.native_element_count() {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to focus video {}: {}", index, e);
                return;
            }
        };
        if index >= count {
            debug!("Focus index {} out of range ({} video elements)", index, count);
            return;
        }

        self.host.dispatch(PageCommand::ScrollIntoView {
            index,
            behavior: ScrollBehavior::Smooth,
            block: ScrollAlignment::Center,
            inline: ScrollAlignment::Center,
        });
        self.host.dispatch(PageCommand::Focus { index });
    }

    fn synchronous_pass(&self) -> Result<SynchronousPass> {
        let document = self.host.snapshot()?;
        let document = document.as_ref();
        let context = self.classifier.classify(document.location());

        let platform = match context {
            ContextTag::PlaylistContext => self.playlist_records(document)?,
            ContextTag::PlatformHomeContext => self.platform_home_records(document)?,
            ContextTag::Unclassified => Vec::new(),
        };

        Ok(SynchronousPass {
            context,
            platform,
            native: self.native_records(document)?,
            embedded: self.embedded_records(document)?,
        })
    }

    fn platform_home_pass(&self) -> Result<Vec<VideoRecord>> {
        let document = self.host.snapshot()?;
        self.platform_home_records(document.as_ref())
    }

    fn playlist_records(&self, document: &dyn DocumentQuery) -> Result<Vec<VideoRecord>> {
        let candidates = SelectorCascadeResolver::resolve(document, &self.playlist_cascade)?;
        Ok(candidates
            .iter()
            .enumerate()
            .filter_map(|(ordinal, candidate)| {
                self.extractor
                    .extract(document, candidate, ordinal, VideoKind::PlaylistEntry)
            })
            .collect())
    }

    fn platform_home_records(&self, document: &dyn DocumentQuery) -> Result<Vec<VideoRecord>> {
        SelectorCascadeResolver::first_yielding(document, &self.home_cascade, |_, candidates| {
            candidates
                .iter()
                .enumerate()
                .filter_map(|(ordinal, candidate)| {
                    self.extractor
                        .extract(document, candidate, ordinal, VideoKind::PlatformHomeEntry)
                })
                .collect()
        })
    }

    fn native_records(&self, document: &dyn DocumentQuery) -> Result<Vec<VideoRecord>> {
        let candidates = document.query(&QuerySpec::from(NATIVE_VIDEO_SELECTOR))?;
        Ok(candidates
            .iter()
            .enumerate()
            .filter_map(|(ordinal, candidate)| {
                self.extractor
                    .extract(document, candidate, ordinal, VideoKind::NativeElement)
            })
            .collect())
    }

    fn embedded_records(&self, document: &dyn DocumentQuery) -> Result<Vec<VideoRecord>> {
        let mut records = Vec::new();
        for spec in &self.embed_specs {
            let candidates = document.query(spec)?;
            records.extend(candidates.iter().enumerate().filter_map(|(ordinal, candidate)| {
                self.extractor
                    .extract(document, candidate, ordinal, VideoKind::EmbeddedFrame)
            }));
        }
        Ok(records)
    }

    fn native_element_count(&self) -> Result<usize> {
        let document = self.host.snapshot()?;
        Ok(document.query(&QuerySpec::from(NATIVE_VIDEO_SELECTOR))?.len())
    }

    fn navigation_command(&self, raw: &str) -> Result<PageCommand> {
        let target = self.host.location().join(raw.trim())?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(LocatorError::UnsupportedTarget(target.to_string()));
        }

        let url = String::from(target.clone());
        Ok(if self.is_platform_target(&target) {
            PageCommand::Redirect { url }
        } else {
            PageCommand::OpenInNewContext { url }
        })
    }

    fn is_platform_target(&self, target: &Url) -> bool {
        self.classifier.is_platform_url(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    fn locator(url: &str, html: &str) -> (Arc<Page>, VideoLocator) {
        let page = Arc::new(Page::new(Url::parse(url).unwrap(), html));
        let locator = VideoLocator::new(page.clone(), Arc::new(LocatorConfig::default()));
        (page, locator)
    }

    #[tokio::test]
    async fn test_unclassified_page_merges_native_then_embedded() {
        let (page, locator) = locator(
            "https://blog.example.com/post",
            r#"<html><head><title>Post</title></head><body>
               <iframe src="https://www.youtube.com/embed/xyz" title="Embedded talk"></iframe>
               <video src="/media/intro.mp4" title="Intro"></video>
               <iframe src="https://player.vimeo.com/video/42"></iframe>
               </body></html>"#,
        );

        let videos = locator.locate().await.unwrap();
        let summary: Vec<_> = videos.iter().map(|v| (v.title.as_str(), v.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("Intro", VideoKind::NativeElement),
                ("Embedded talk", VideoKind::EmbeddedFrame),
                ("Embedded Video 1", VideoKind::EmbeddedFrame),
            ]
        );
        assert_eq!(locator.last_records(), videos);
        let snapshot = page.detection_slot().latest().unwrap();
        assert_eq!(snapshot.videos, videos);
        assert_eq!(snapshot.page_url, "https://blog.example.com/post");
    }

    #[tokio::test]
    async fn test_home_cascade_falls_through_non_watch_links() {
        let (_page, locator) = locator(
            "https://www.youtube.com/",
            r#"<ytd-rich-grid-media><a id="video-title-link" href="/@channel">Channel</a></ytd-rich-grid-media>
               <ytd-video-renderer><a id="video-title" href="/watch?v=1">First</a></ytd-video-renderer>
               <ytd-video-renderer><a id="video-title" href="/watch?v=2">Second</a></ytd-video-renderer>"#,
        );

        let videos = locator.locate().await.unwrap();
        assert_eq!(videos.len(), 2);
        assert!(videos.iter().all(|v| v.kind == VideoKind::PlatformHomeEntry));
        assert_eq!(videos[1].ordinal, 1);
    }

    #[test]
    fn test_navigate_routes_by_domain() {
        let (page, locator) = locator("https://www.youtube.com/", "");

        locator.navigate("/watch?v=1");
        locator.navigate("https://vimeo.com/42");
        locator.navigate("javascript:alert(1)");
        locator.navigate("http://[::1");

        assert_eq!(
            page.drain_commands(),
            vec![
                PageCommand::Redirect {
                    url: "https://www.youtube.com/watch?v=1".to_string()
                },
                PageCommand::OpenInNewContext {
                    url: "https://vimeo.com/42".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_navigate_accepts_targets_outside_last_set() {
        let (page, locator) = locator("https://example.com/", "<video src=\"/a.mp4\"></video>");
        locator.locate().await.unwrap();

        locator.navigate("https://vimeo.com/7");
        assert_eq!(
            page.drain_commands(),
            vec![PageCommand::OpenInNewContext {
                url: "https://vimeo.com/7".to_string()
            }]
        );
        assert!(matches!(
            locator.navigation_command("ftp://example.com/a.mp4"),
            Err(LocatorError::UnsupportedTarget(_))
        ));
    }

    #[test]
    fn test_focus_targets_live_video_elements() {
        let (page, locator) = locator("https://example.com/", "<video></video><video></video>");

        locator.focus(1);
        locator.focus(5);

        let commands = page.drain_commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], PageCommand::ScrollIntoView { index: 1, .. }));
        assert_eq!(commands[1], PageCommand::Focus { index: 1 });
    }

    #[test]
    fn test_install_is_refused_twice() {
        let page: Arc<dyn DocumentHost> =
            Arc::new(Page::new(Url::parse("https://example.com/").unwrap(), ""));
        let config = Arc::new(LocatorConfig::default());

        assert!(VideoLocator::install(page.clone(), config.clone()).is_some());
        assert!(VideoLocator::install(page, config).is_none());
    }
}
