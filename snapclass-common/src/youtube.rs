//! YouTube link normalization
//!
//! Extracts the 11-character video id from watch, embed, shorts and
//! `youtu.be` links and derives the static thumbnail URL. Pure string
//! matching: nothing here checks that the video exists.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tried in order; the first capture wins.
static ID_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:\?|&|/|$)").expect("valid regex"),
        Regex::new(r"youtu\.be/([0-9A-Za-z_-]{11})").expect("valid regex"),
    ]
});

/// Scheme, optional userinfo, then a YouTube host
static YOUTUBE_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z][a-z0-9+.-]*://)?(?:[^/?#@]*@)?(?:[a-z0-9-]+\.)*(?:youtube\.com|youtube-nocookie\.com|youtu\.be)(?::\d+)?(?:[/?#]|$)",
    )
    .expect("valid regex")
});

/// Video id of a YouTube link, or `None` when none can be derived
///
/// Links on other hosts yield `None` even when their path happens to contain
/// an 11-character segment.
pub fn extract_video_id(url: &str) -> Option<&str> {
    let url = url.trim();
    if url.is_empty() || !YOUTUBE_HOST.is_match(url) {
        return None;
    }

    ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// High-quality thumbnail for a YouTube link
pub fn derive_thumbnail(url: &str) -> Option<String> {
    extract_video_id(url).map(|id| format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id))
}
