//! Parsed document snapshots and the query seam used by the locator.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{LocatorError, Result};

/// A structural query against a document, expressed as a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySpec(String);

impl QuerySpec {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the selector, mapping parse failures to [`LocatorError::InvalidSelector`].
    pub fn compile(&self) -> Result<Selector> {
        Selector::parse(&self.0).map_err(|e| LocatorError::InvalidSelector {
            selector: self.0.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuerySpec {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

impl From<String> for QuerySpec {
    fn from(selector: String) -> Self {
        Self(selector)
    }
}

/// Owned snapshot of one matched element.
///
/// Everything the extractor may need is captured up front, so a candidate never
/// observes later changes to the document it came from. URLs are already resolved
/// against the document base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Lower-case tag name
    pub tag: String,
    /// Concatenated descendant text
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Resolved `href` attribute
    pub href: Option<String>,
    /// Resolved media source the element would play (`src`, else first `<source src>`)
    pub current_src: Option<String>,
    /// Resolved `src` attribute
    pub src: Option<String>,
    /// `data-title` of the element or its nearest ancestor carrying one
    pub ancestor_data_title: Option<String>,
    /// First heading inside the enclosing `<article>`
    pub article_heading: Option<String>,
    /// First `<figcaption>` inside the enclosing `<figure>`
    pub figure_caption: Option<String>,
}

impl Candidate {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read-only view of a document.
///
/// Implemented by [`HtmlDocument`]; tests substitute instrumented documents to count
/// queries or inject faults.
pub trait DocumentQuery {
    /// The document's own URL (`window.location` equivalent).
    fn location(&self) -> &Url;

    /// The document title, if one is set and not blank.
    fn title(&self) -> Option<String>;

    /// All elements matching `spec`, in document order.
    fn query(&self, spec: &QuerySpec) -> Result<Vec<Candidate>>;
}

/// An immutable parse of one page snapshot.
pub struct HtmlDocument {
    html: Html,
    location: Url,
    base: Url,
}

impl HtmlDocument {
    /// Parse `source` as a full document located at `location`.
    ///
    /// A `<base href>` element, when present, becomes the base for resolving
    /// relative URLs.
    pub fn parse(source: &str, location: Url) -> Self {
        let html = Html::parse_document(source);
        let base = Selector::parse("base[href]")
            .ok()
            .and_then(|selector| {
                html.select(&selector)
                    .next()
                    .and_then(|base| base.value().attr("href"))
                    .and_then(|href| location.join(href.trim()).ok())
            })
            .unwrap_or_else(|| location.clone());

        Self { html, location, base }
    }

    /// Number of element nodes in the parse tree.
    pub fn element_count(&self) -> usize {
        count_elements(&self.html)
    }

    fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.base.join(raw).ok().map(String::from)
    }

    fn snapshot_element(&self, element: ElementRef<'_>) -> Candidate {
        let value = element.value();
        let attributes = value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let src = value.attr("src").and_then(|raw| self.resolve(raw));
        let current_src = src.clone().or_else(|| {
            Selector::parse("source[src]").ok().and_then(|selector| {
                element
                    .select(&selector)
                    .filter_map(|source| source.value().attr("src"))
                    .find_map(|raw| self.resolve(raw))
            })
        });

        let closest = |name: &str| {
            element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| ancestor.value().name() == name)
        };

        let ancestor_data_title = std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .find_map(|node| node.value().attr("data-title"))
            .map(str::to_string);

        let article_heading = closest("article")
            .and_then(|article| first_text(article, "h1, h2, h3, h4, h5, h6"));
        let figure_caption =
            closest("figure").and_then(|figure| first_text(figure, "figcaption"));

        Candidate {
            tag: value.name().to_string(),
            text: element.text().collect(),
            attributes,
            href: value.attr("href").and_then(|raw| self.resolve(raw)),
            current_src,
            src,
            ancestor_data_title,
            article_heading,
            figure_caption,
        }
    }
}

impl DocumentQuery for HtmlDocument {
    fn location(&self) -> &Url {
        &self.location
    }

    fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let title: String = self.html.select(&selector).next()?.text().collect();
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    fn query(&self, spec: &QuerySpec) -> Result<Vec<Candidate>> {
        let selector = spec.compile()?;
        Ok(self
            .html
            .select(&selector)
            .map(|element| self.snapshot_element(element))
            .collect())
    }
}

fn first_text(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .next()
        .map(|element| element.text().collect())
}

pub(crate) fn count_elements(html: &Html) -> usize {
    html.tree.nodes().filter(|node| node.value().is_element()).count()
}

/// Outer HTML of every element, with multiplicity.
pub(crate) fn element_fingerprints(html: &Html) -> HashMap<String, usize> {
    let mut fingerprints = HashMap::new();
    for element in html.tree.nodes().filter_map(ElementRef::wrap) {
        *fingerprints.entry(element.html()).or_insert(0) += 1;
    }
    fingerprints
}

/// Number of elements in `after` with no identical counterpart in `before`.
pub(crate) fn unmatched_elements(before: &HashMap<String, usize>, after: &HashMap<String, usize>) -> usize {
    after
        .iter()
        .map(|(outer, count)| count.saturating_sub(before.get(outer).copied().unwrap_or(0)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> HtmlDocument {
        HtmlDocument::parse(source, Url::parse("https://example.com/articles/one").unwrap())
    }

    #[test]
    fn test_relative_urls_resolve_against_location() {
        let doc = parse(r#"<a id="x" href="../watch?v=1">Clip</a>"#);
        let found = doc.query(&QuerySpec::from("a#x")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].href.as_deref(), Some("https://example.com/watch?v=1"));
        assert_eq!(found[0].text, "Clip");
    }

    #[test]
    fn test_base_element_overrides_resolution() {
        let doc = parse(
            r#"<html><head><base href="https://cdn.example.net/media/"></head>
               <body><video src="clip.mp4"></video></body></html>"#,
        );
        let found = doc.query(&QuerySpec::from("video")).unwrap();
        assert_eq!(found[0].src.as_deref(), Some("https://cdn.example.net/media/clip.mp4"));
        assert_eq!(doc.location().as_str(), "https://example.com/articles/one");
    }

    #[test]
    fn test_current_src_falls_back_to_source_children() {
        let doc = parse(
            r#"<video><source src=""><source src="/hd.webm"><source src="/sd.mp4"></video>"#,
        );
        let found = doc.query(&QuerySpec::from("video")).unwrap();
        assert_eq!(found[0].src, None);
        assert_eq!(found[0].current_src.as_deref(), Some("https://example.com/hd.webm"));
    }

    #[test]
    fn test_structural_context_is_captured() {
        let doc = parse(
            r#"<section data-title="Outer">
                 <article><h3>Heading</h3>
                   <figure><video></video><figcaption>Caption</figcaption></figure>
                 </article>
               </section>"#,
        );
        let found = doc.query(&QuerySpec::from("video")).unwrap();
        let candidate = &found[0];
        assert_eq!(candidate.ancestor_data_title.as_deref(), Some("Outer"));
        assert_eq!(candidate.article_heading.as_deref(), Some("Heading"));
        assert_eq!(candidate.figure_caption.as_deref(), Some("Caption"));
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let doc = parse("<p>hi</p>");
        let err = doc.query(&QuerySpec::from("[[[")).unwrap_err();
        assert!(matches!(err, LocatorError::InvalidSelector { .. }));
    }

    #[test]
    fn test_blank_title_is_absent() {
        assert_eq!(parse("<title>   </title>").title(), None);
        assert_eq!(parse("<title> Page </title>").title().as_deref(), Some("Page"));
    }
}
