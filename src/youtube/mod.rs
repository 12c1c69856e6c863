use crate::errors::CatalogError;
use tracing::debug;
use url::Url;

const LONG_HOST_MARKER: &str = "youtube";
const SHORT_HOST: &str = "youtu.be";
const SHORTS_SEGMENT: &str = "shorts";

/// Unparseable input at least this long is assumed to be a bare id.
const MIN_FALLBACK_LEN: usize = 8;

/// Turn whatever the user pasted (watch URL, short link, shorts URL, embed
/// URL or bare id) into a YouTube video id.
///
/// Never panics. Returns `None` when nothing usable can be extracted.
pub fn extract_video_id(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    if !raw.contains(LONG_HOST_MARKER) && !raw.contains(SHORT_HOST) {
        return non_empty(raw.trim());
    }

    match Url::parse(raw) {
        Ok(url) => id_from_url(&url),
        Err(e) => {
            debug!("Input mentions YouTube but is not a URL ({}), trying bare id", e);
            let trimmed = raw.trim();
            if trimmed.chars().count() >= MIN_FALLBACK_LEN {
                Some(trimmed.to_string())
            } else {
                None
            }
        }
    }
}

/// Like [`extract_video_id`], but rejects unusable input with a validation error.
pub fn require_video_id(raw: &str) -> Result<String, CatalogError> {
    extract_video_id(raw).ok_or_else(|| CatalogError::UnresolvableIdentifier(raw.to_string()))
}

fn id_from_url(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();

    if url.host_str() == Some(SHORT_HOST) {
        return segments.first().map(|s| s.to_string());
    }

    if let Some((_, v)) = url.query_pairs().find(|(key, _)| key == "v") {
        if !v.is_empty() {
            return Some(v.into_owned());
        }
    }

    if let Some(pos) = segments.iter().position(|s| *s == SHORTS_SEGMENT) {
        if let Some(id) = segments.get(pos + 1) {
            return Some(id.to_string());
        }
    }

    segments.last().map(|s| s.to_string())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Default thumbnail for a video that has no uploaded one.
pub fn thumbnail_url(id: &str) -> String {
    if id.is_empty() {
        return String::new();
    }
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", urlencoding::encode(id))
}

/// Autoplaying embed source for the player.
pub fn embed_url(id: &str) -> String {
    format!(
        "https://www.youtube.com/embed/{}?autoplay=1&rel=0",
        urlencoding::encode(id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> Option<String> {
        extract_video_id(raw)
    }

    #[test]
    fn test_short_link() {
        assert_eq!(id("https://youtu.be/abc123"), Some("abc123".to_string()));
        assert_eq!(id("https://youtu.be/abc123?t=42"), Some("abc123".to_string()));
        assert_eq!(id("https://youtu.be/"), None);
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(
            id("https://www.youtube.com/watch?v=abc123&t=5s"),
            Some("abc123".to_string())
        );
        assert_eq!(
            id("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_empty_v_param_falls_through_to_path() {
        assert_eq!(
            id("https://www.youtube.com/embed/xyz789?v="),
            Some("xyz789".to_string())
        );
    }

    #[test]
    fn test_shorts_url() {
        assert_eq!(
            id("https://www.youtube.com/shorts/xyz789"),
            Some("xyz789".to_string())
        );
        assert_eq!(
            id("https://www.youtube.com/shorts/xyz789/extra"),
            Some("xyz789".to_string())
        );
        // Nothing after "shorts": the last segment wins
        assert_eq!(id("https://www.youtube.com/shorts/"), Some("shorts".to_string()));
    }

    #[test]
    fn test_last_segment_and_empty_path() {
        assert_eq!(
            id("https://www.youtube.com/embed/k8Fz1a2B3c4"),
            Some("k8Fz1a2B3c4".to_string())
        );
        assert_eq!(id("https://www.youtube.com/"), None);
        assert_eq!(id("https://www.youtube.com"), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(id(""), None);
        assert_eq!(id("   "), None);
    }

    #[test]
    fn test_bare_ids_pass_through_trimmed() {
        for raw in ["abc", "  dQw4w9WgXcQ  ", "x", "some id with spaces", "https://vimeo.com/123"] {
            assert_eq!(id(raw), Some(raw.trim().to_string()), "input {:?}", raw);
        }
    }

    #[test]
    fn test_unparseable_youtube_mentions_use_length_fallback() {
        assert_eq!(
            id("youtube.com/watch?v=abc"),
            Some("youtube.com/watch?v=abc".to_string())
        );
        assert_eq!(id("  youtu.be  "), Some("youtu.be".to_string()));
        assert_eq!(id(" youtube "), None);
        assert_eq!(id("youtube"), None);
    }

    #[test]
    fn test_require_video_id_reports_input() {
        assert_eq!(require_video_id("https://youtu.be/abc123"), Ok("abc123".to_string()));
        assert_eq!(
            require_video_id("youtube"),
            Err(CatalogError::UnresolvableIdentifier("youtube".to_string()))
        );
    }

    #[test]
    fn test_templates() {
        assert_eq!(thumbnail_url(""), "");
        assert_eq!(
            thumbnail_url("abc123"),
            "https://img.youtube.com/vi/abc123/hqdefault.jpg"
        );
        assert_eq!(
            embed_url("abc123"),
            "https://www.youtube.com/embed/abc123?autoplay=1&rel=0"
        );
        assert_eq!(
            thumbnail_url("a b"),
            "https://img.youtube.com/vi/a%20b/hqdefault.jpg"
        );
    }
}
