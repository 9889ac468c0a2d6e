/// Document host abstraction
///
/// A [`Page`] stands in for the rendered browser document the locator runs inside:
/// it owns the current markup and location, publishes structural mutations, tracks
/// the ready state and records the commands (redirects, focus changes) that the
/// locator issues back into the page.

pub mod document;

pub use document::{Candidate, DocumentQuery, HtmlDocument, QuerySpec};

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use scraper::Html;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;
use url::Url;

use crate::autorun::DetectionSlot;
use crate::Result;

const MUTATION_CHANNEL_CAPACITY: usize = 64;

/// One batch of structural changes to the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub added_nodes: usize,
    pub removed_nodes: usize,
}

/// Document loading progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlignment {
    Start,
    Center,
    End,
    Nearest,
}

/// A write action the locator asks the host page to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PageCommand {
    /// Same-document navigation
    Redirect { url: String },
    /// Open the URL in a new browsing context
    OpenInNewContext { url: String },
    /// Scroll the `index`-th native video element into view
    ScrollIntoView {
        index: usize,
        behavior: ScrollBehavior,
        block: ScrollAlignment,
        inline: ScrollAlignment,
    },
    /// Give input focus to the `index`-th native video element
    Focus { index: usize },
}

/// Everything the locator needs from the page it is installed in.
pub trait DocumentHost: Send + Sync {
    /// Current location of the page.
    fn location(&self) -> Url;

    /// Parse the current markup into an immutable document.
    fn snapshot(&self) -> Result<Box<dyn DocumentQuery>>;

    /// Register for mutation batches from this point on.
    fn subscribe_mutations(&self) -> broadcast::Receiver<MutationRecord>;

    fn ready_state(&self) -> watch::Receiver<ReadyState>;

    /// Fire-and-forget write into the page.
    fn dispatch(&self, command: PageCommand);

    /// Claim the page for a locator. Returns `false` if one was already installed.
    fn claim_injection(&self) -> bool;

    /// Page-scoped cache of the latest detection result.
    fn detection_slot(&self) -> &DetectionSlot;
}

struct PageState {
    location: Url,
    html: String,
}

/// In-memory document host.
pub struct Page {
    state: RwLock<PageState>,
    mutations: broadcast::Sender<MutationRecord>,
    ready: watch::Sender<ReadyState>,
    commands: Mutex<Vec<PageCommand>>,
    injected: AtomicBool,
    slot: DetectionSlot,
}

impl Page {
    /// Create a fully loaded page.
    pub fn new(location: Url, html: impl Into<String>) -> Self {
        Self::with_ready_state(location, html, ReadyState::Complete)
    }

    pub fn with_ready_state(location: Url, html: impl Into<String>, ready_state: ReadyState) -> Self {
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        let (ready, _) = watch::channel(ready_state);
        Self {
            state: RwLock::new(PageState {
                location,
                html: html.into(),
            }),
            mutations,
            ready,
            commands: Mutex::new(Vec::new()),
            injected: AtomicBool::new(false),
            slot: DetectionSlot::default(),
        }
    }

    pub fn html(&self) -> String {
        self.state.read().html.clone()
    }

    pub fn set_location(&self, location: Url) {
        self.state.write().location = location;
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.ready.send_replace(ready_state);
    }

    /// Replace the whole document.
    ///
    /// Every element of the new markup without an identical element in the old one
    /// counts as added, and the reverse as removed, so swapping content for the same
    /// number of different elements still reports additions.
    pub fn set_html(&self, html: impl Into<String>) {
        let html = html.into();
        let after = document::element_fingerprints(&Html::parse_document(&html));
        let before = {
            let mut state = self.state.write();
            let before = document::element_fingerprints(&Html::parse_document(&state.html));
            state.html = html;
            before
        };

        self.publish(MutationRecord {
            added_nodes: document::unmatched_elements(&before, &after),
            removed_nodes: document::unmatched_elements(&after, &before),
        });
    }

    /// Insert `fragment` at the end of `<body>`.
    pub fn append_to_body(&self, fragment: &str) {
        // The fragment parser wraps its content in a synthetic root element.
        let added_nodes = document::count_elements(&Html::parse_fragment(fragment)).saturating_sub(1);
        {
            let mut state = self.state.write();
            match state.html.to_ascii_lowercase().rfind("</body>") {
                Some(at) => state.html.insert_str(at, fragment),
                None => state.html.push_str(fragment),
            }
        }

        self.publish(MutationRecord {
            added_nodes,
            removed_nodes: 0,
        });
    }

    /// Take every command dispatched so far, oldest first.
    pub fn drain_commands(&self) -> Vec<PageCommand> {
        std::mem::take(&mut *self.commands.lock())
    }

    fn publish(&self, record: MutationRecord) {
        // No receivers just means nobody is observing right now.
        if self.mutations.send(record).is_err() {
            debug!("Mutation batch dropped, no observers: {:?}", record);
        }
    }
}

impl DocumentHost for Page {
    fn location(&self) -> Url {
        self.state.read().location.clone()
    }

    fn snapshot(&self) -> Result<Box<dyn DocumentQuery>> {
        let state = self.state.read();
        Ok(Box::new(HtmlDocument::parse(&state.html, state.location.clone())))
    }

    fn subscribe_mutations(&self) -> broadcast::Receiver<MutationRecord> {
        self.mutations.subscribe()
    }

    fn ready_state(&self) -> watch::Receiver<ReadyState> {
        self.ready.subscribe()
    }

    fn dispatch(&self, command: PageCommand) {
        debug!("Page command: {:?}", command);
        self.commands.lock().push(command);
    }

    fn claim_injection(&self) -> bool {
        !self.injected.swap(true, Ordering::SeqCst)
    }

    fn detection_slot(&self) -> &DetectionSlot {
        &self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page::new(Url::parse("https://example.com/").unwrap(), html)
    }

    #[test]
    fn test_append_inserts_inside_body() {
        let page = page("<html><body><p>a</p></body></html>");
        page.append_to_body("<video src=\"/x.mp4\"></video>");
        assert_eq!(
            page.html(),
            "<html><body><p>a</p><video src=\"/x.mp4\"></video></body></html>"
        );
    }

    #[tokio::test]
    async fn test_mutations_report_added_nodes() {
        let page = page("<html><body></body></html>");
        let mut mutations = page.subscribe_mutations();

        page.append_to_body("<div><a href=\"/watch?v=1\">x</a></div>");
        let record = mutations.recv().await.unwrap();
        assert_eq!(record.added_nodes, 2);
        assert_eq!(record.removed_nodes, 0);

        // html and body change; div and a go away.
        page.set_html("<html><body></body></html>");
        let record = mutations.recv().await.unwrap();
        assert_eq!(record.added_nodes, 2);
        assert_eq!(record.removed_nodes, 4);

        page.set_html("<html><body></body></html>");
        let record = mutations.recv().await.unwrap();
        assert_eq!(record.added_nodes, 0);
        assert_eq!(record.removed_nodes, 0);
    }

    #[tokio::test]
    async fn test_same_size_replacement_reports_added_nodes() {
        let page = page(r#"<html><body><div class="spinner"><span></span></div></body></html>"#);
        let mut mutations = page.subscribe_mutations();

        page.set_html(r#"<html><body><ytd-rich-grid-media><a href="/watch?v=1">x</a></ytd-rich-grid-media></body></html>"#);
        let record = mutations.recv().await.unwrap();
        // html, body, ytd-rich-grid-media and a are new.
        assert_eq!(record.added_nodes, 4);
        assert_eq!(record.removed_nodes, 4);
    }

    #[test]
    fn test_injection_can_only_be_claimed_once() {
        let page = page("");
        assert!(page.claim_injection());
        assert!(!page.claim_injection());
    }

    #[test]
    fn test_commands_drain_in_order() {
        let page = page("");
        page.dispatch(PageCommand::Focus { index: 1 });
        page.dispatch(PageCommand::Redirect {
            url: "https://www.youtube.com/watch?v=1".to_string(),
        });
        let commands = page.drain_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], PageCommand::Focus { index: 1 });
        assert!(page.drain_commands().is_empty());
    }
}
