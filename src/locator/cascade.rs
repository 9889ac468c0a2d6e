use tracing::debug;

use crate::page::{Candidate, DocumentQuery, QuerySpec};
use crate::Result;

/// Playlist layouts, most specific first
const PLAYLIST_SELECTORS: &[&str] = &[
    "ytd-playlist-video-renderer #video-title",
    "ytd-playlist-video-list-renderer #video-title",
    "ytd-playlist-panel-video-renderer #video-title",
    "#contents ytd-playlist-video-renderer a#thumbnail + #meta #video-title",
];

/// Home grid, search results, channel grid, sidebar and watch-page suggestions,
/// then loose fallbacks
const PLATFORM_HOME_SELECTORS: &[&str] = &[
    "ytd-rich-grid-media #video-title-link",
    "ytd-rich-grid-video #video-title-link",
    "ytd-video-renderer #video-title",
    "ytd-grid-video-renderer #video-title",
    "ytd-compact-video-renderer #video-title",
    "ytd-compact-autoplay-renderer #video-title",
    "a#video-title-link",
    "a#video-title",
];

/// An ordered list of structural queries, tried until one matches.
#[derive(Debug, Clone)]
pub struct Cascade {
    name: &'static str,
    specs: Vec<QuerySpec>,
}

impl Cascade {
    pub fn new(name: &'static str, specs: Vec<QuerySpec>) -> Self {
        Self { name, specs }
    }

    /// Built-in playlist cascade with `extra` selectors tried first.
    pub fn playlist(extra: &[String]) -> Self {
        Self::new("playlist", Self::with_builtin(extra, PLAYLIST_SELECTORS))
    }

    /// Built-in platform home cascade with `extra` selectors tried first.
    pub fn platform_home(extra: &[String]) -> Self {
        Self::new("platform-home", Self::with_builtin(extra, PLATFORM_HOME_SELECTORS))
    }

    /// Put a more specific layout in front of the existing ones.
    pub fn prepend(&mut self, spec: impl Into<QuerySpec>) {
        self.specs.insert(0, spec.into());
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn specs(&self) -> &[QuerySpec] {
        &self.specs
    }

    fn with_builtin(extra: &[String], builtin: &[&str]) -> Vec<QuerySpec> {
        extra
            .iter()
            .map(|s| QuerySpec::from(s.as_str()))
            .chain(builtin.iter().map(|s| QuerySpec::from(*s)))
            .collect()
    }
}

/// First-match-wins evaluation of a [`Cascade`].
pub struct SelectorCascadeResolver;

impl SelectorCascadeResolver {
    /// Match set of the first spec that matches anything; later specs are never
    /// evaluated. An exhausted cascade yields an empty set.
    pub fn resolve(document: &dyn DocumentQuery, cascade: &Cascade) -> Result<Vec<Candidate>> {
        Self::first_yielding(document, cascade, |_, candidates| candidates)
    }

    /// Like [`resolve`](Self::resolve), but the stopping condition is a non-empty
    /// output of `accept` rather than a non-empty match set. Used where a loose
    /// selector may match elements that all get rejected downstream.
    ///
    /// Known tradeoff: a page mixing several layouts only reports the first one
    /// that produces output.
    pub fn first_yielding<T, F>(document: &dyn DocumentQuery, cascade: &Cascade, mut accept: F) -> Result<Vec<T>>
    where
        F: FnMut(&QuerySpec, Vec<Candidate>) -> Vec<T>,
    {
        for spec in cascade.specs() {
            let candidates = document.query(spec)?;
            if candidates.is_empty() {
                continue;
            }

            let matched = candidates.len();
            let accepted = accept(spec, candidates);
            if !accepted.is_empty() {
                debug!(
                    "Cascade '{}' resolved by '{}' ({} matched, {} kept)",
                    cascade.name(),
                    spec,
                    matched,
                    accepted.len()
                );
                return Ok(accepted);
            }
            debug!("Cascade '{}': '{}' matched {} but none kept", cascade.name(), spec, matched);
        }

        debug!("Cascade '{}' exhausted", cascade.name());
        Ok(Vec::new())
    }
}
