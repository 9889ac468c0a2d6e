use url::Url;

use crate::config::PlatformConfig;

/// Kind of page the locator is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextTag {
    /// Known platform, playlist view
    PlaylistContext,
    /// Known platform, any other view
    PlatformHomeContext,
    Unclassified,
}

impl ContextTag {
    /// Whether entries for this context are typically rendered after page load.
    pub fn expects_async_content(self) -> bool {
        matches!(self, ContextTag::PlatformHomeContext)
    }
}

/// Decides which platform cascades apply to a URL.
#[derive(Debug, Clone)]
pub struct PageContextClassifier {
    domains: Vec<String>,
    playlist_query_key: String,
    playlist_path_marker: String,
}

impl PageContextClassifier {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            domains: config.domains.iter().map(|d| d.to_ascii_lowercase()).collect(),
            playlist_query_key: config.playlist_query_key.clone(),
            playlist_path_marker: config.playlist_path_marker.clone(),
        }
    }

    pub fn classify(&self, url: &Url) -> ContextTag {
        if !self.is_platform_url(url) {
            return ContextTag::Unclassified;
        }

        let playlist_query = url
            .query_pairs()
            .any(|(key, _)| key == self.playlist_query_key.as_str());
        if playlist_query || url.path().contains(&self.playlist_path_marker) {
            ContextTag::PlaylistContext
        } else {
            ContextTag::PlatformHomeContext
        }
    }

    /// Host equals a known domain or is a subdomain of one.
    pub fn is_platform_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> ContextTag {
        PageContextClassifier::new(&PlatformConfig::default()).classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_playlist_views() {
        assert_eq!(classify("https://www.youtube.com/playlist?list=PL123"), ContextTag::PlaylistContext);
        assert_eq!(classify("https://www.youtube.com/watch?v=abc&list=PL123"), ContextTag::PlaylistContext);
        assert_eq!(classify("https://m.youtube.com/playlist"), ContextTag::PlaylistContext);
    }

    #[test]
    fn test_platform_home_views() {
        assert_eq!(classify("https://www.youtube.com/"), ContextTag::PlatformHomeContext);
        assert_eq!(classify("https://www.youtube.com/results?search_query=rust"), ContextTag::PlatformHomeContext);
        assert_eq!(classify("https://youtu.be/abc"), ContextTag::PlatformHomeContext);
    }

    #[test]
    fn test_other_hosts_are_unclassified() {
        assert_eq!(classify("https://example.com/playlist?list=1"), ContextTag::Unclassified);
        assert_eq!(classify("https://notyoutube.com/watch?v=1"), ContextTag::Unclassified);
        assert_eq!(classify("file:///tmp/page.html"), ContextTag::Unclassified);
    }
}
