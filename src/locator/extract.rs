use crate::page::{Candidate, DocumentQuery};

use super::{TitleNormalizer, VideoKind, VideoRecord};

/// One step of a fallback chain. Returning `None` moves on to the next step.
type Rule = fn(&Candidate, &dyn DocumentQuery) -> Option<String>;

const LINK_TITLE_RULES: &[Rule] = &[text_content, title_attribute, aria_label];

const NATIVE_TITLE_RULES: &[Rule] = &[
    title_attribute,
    aria_label,
    data_title,
    alt_text,
    ancestor_data_title,
    article_heading,
    figure_caption,
    document_title,
];

const FRAME_TITLE_RULES: &[Rule] = &[
    title_attribute,
    aria_label,
    data_title,
    article_heading,
    figure_caption,
];

const NATIVE_URL_RULES: &[Rule] = &[current_source, declared_source, document_location];

fn text_content(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    Some(candidate.text.clone())
}

fn title_attribute(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.attr("title").map(str::to_string)
}

fn aria_label(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.attr("aria-label").map(str::to_string)
}

fn data_title(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.attr("data-title").map(str::to_string)
}

fn alt_text(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.attr("alt").map(str::to_string)
}

fn ancestor_data_title(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.ancestor_data_title.clone()
}

fn article_heading(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.article_heading.clone()
}

fn figure_caption(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.figure_caption.clone()
}

fn document_title(_: &Candidate, document: &dyn DocumentQuery) -> Option<String> {
    document.title()
}

fn current_source(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.current_src.clone()
}

fn declared_source(candidate: &Candidate, _: &dyn DocumentQuery) -> Option<String> {
    candidate.src.clone()
}

fn document_location(_: &Candidate, document: &dyn DocumentQuery) -> Option<String> {
    Some(document.location().to_string())
}

/// Turns matched elements into [`VideoRecord`]s.
#[derive(Debug, Clone)]
pub struct VideoRecordExtractor {
    normalizer: TitleNormalizer,
    watch_marker: String,
}

impl VideoRecordExtractor {
    /// `watch_marker` is the URL fragment a platform home entry must contain to
    /// count as a video link.
    pub fn new(normalizer: TitleNormalizer, watch_marker: impl Into<String>) -> Self {
        Self {
            normalizer,
            watch_marker: watch_marker.into(),
        }
    }

    /// Extract a record, or `None` if the candidate is rejected.
    pub fn extract(
        &self,
        document: &dyn DocumentQuery,
        candidate: &Candidate,
        ordinal: usize,
        kind: VideoKind,
    ) -> Option<VideoRecord> {
        match kind {
            VideoKind::PlaylistEntry | VideoKind::PlatformHomeEntry => {
                self.extract_link(document, candidate, ordinal, kind)
            }
            VideoKind::NativeElement => Some(self.extract_native(document, candidate, ordinal)),
            VideoKind::EmbeddedFrame => self.extract_frame(document, candidate, ordinal),
        }
    }

    fn extract_link(
        &self,
        document: &dyn DocumentQuery,
        candidate: &Candidate,
        ordinal: usize,
        kind: VideoKind,
    ) -> Option<VideoRecord> {
        let title = self.first_title(LINK_TITLE_RULES, candidate, document)?;
        let url = candidate.href.clone().filter(|url| !url.is_empty())?;
        if kind == VideoKind::PlatformHomeEntry && !url.contains(&self.watch_marker) {
            return None;
        }

        Some(VideoRecord { title, url, kind, ordinal })
    }

    fn extract_native(&self, document: &dyn DocumentQuery, candidate: &Candidate, ordinal: usize) -> VideoRecord {
        let title = self
            .first_title(NATIVE_TITLE_RULES, candidate, document)
            .unwrap_or_else(|| format!("Video {}", ordinal + 1));
        let url = NATIVE_URL_RULES
            .iter()
            .find_map(|rule| rule(candidate, document).filter(|url| !url.is_empty()))
            .unwrap_or_else(|| document.location().to_string());

        VideoRecord {
            title,
            url,
            kind: VideoKind::NativeElement,
            ordinal,
        }
    }

    fn extract_frame(&self, document: &dyn DocumentQuery, candidate: &Candidate, ordinal: usize) -> Option<VideoRecord> {
        let url = candidate.src.clone()?;
        let title = self
            .first_title(FRAME_TITLE_RULES, candidate, document)
            .unwrap_or_else(|| format!("Embedded Video {}", ordinal + 1));

        Some(VideoRecord {
            title,
            url,
            kind: VideoKind::EmbeddedFrame,
            ordinal,
        })
    }

    fn first_title(&self, rules: &[Rule], candidate: &Candidate, document: &dyn DocumentQuery) -> Option<String> {
        rules.iter().find_map(|rule| {
            rule(candidate, document)
                .map(|raw| self.normalizer.normalize(&raw))
                .filter(|title| !title.is_empty())
        })
    }
}

impl Default for VideoRecordExtractor {
    fn default() -> Self {
        Self::new(TitleNormalizer::default(), "/watch")
    }
}
