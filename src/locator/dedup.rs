use std::collections::HashSet;

use super::VideoRecord;

/// Merges record sources and drops repeated URLs.
pub struct Deduplicator;

impl Deduplicator {
    /// Concatenate `sources` in the order given and keep only the first record for
    /// each URL. Relative order of the survivors is preserved.
    pub fn merge<I>(sources: I) -> Vec<VideoRecord>
    where
        I: IntoIterator<Item = Vec<VideoRecord>>,
    {
        let mut seen = HashSet::new();
        sources
            .into_iter()
            .flatten()
            .filter(|record| seen.insert(record.url.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::VideoKind;

    fn record(title: &str, url: &str, kind: VideoKind) -> VideoRecord {
        VideoRecord {
            title: title.to_string(),
            url: url.to_string(),
            kind,
            ordinal: 0,
        }
    }

    #[test]
    fn test_first_occurrence_wins_across_sources() {
        let platform = vec![
            record("A", "https://www.youtube.com/watch?v=1", VideoKind::PlaylistEntry),
            record("B", "https://www.youtube.com/watch?v=2", VideoKind::PlaylistEntry),
        ];
        let native = vec![record("Local", "https://example.com/a.mp4", VideoKind::NativeElement)];
        let embedded = vec![
            record("Embed", "https://www.youtube.com/watch?v=2", VideoKind::EmbeddedFrame),
            record("Local again", "https://example.com/a.mp4", VideoKind::EmbeddedFrame),
        ];

        let merged = Deduplicator::merge(vec![platform, native, embedded]);
        let titles: Vec<_> = merged.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "Local"]);
    }

    #[test]
    fn test_same_title_different_urls_are_kept() {
        let merged = Deduplicator::merge(vec![vec![
            record("A", "https://x.test/1", VideoKind::NativeElement),
            record("A", "https://x.test/2", VideoKind::NativeElement),
        ]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_output_urls_unique_and_bounded() {
        let sources: Vec<Vec<VideoRecord>> = (0..5)
            .map(|s| {
                (0..7)
                    .map(|i| record("t", &format!("https://x.test/{}", (i * s) % 4), VideoKind::NativeElement))
                    .collect()
            })
            .collect();
        let total: usize = sources.iter().map(Vec::len).sum();

        let merged = Deduplicator::merge(sources);
        let unique: HashSet<_> = merged.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(unique.len(), merged.len());
        assert!(merged.len() <= total);
        assert!(Deduplicator::merge(Vec::<Vec<VideoRecord>>::new()).is_empty());
    }
}
