use std::sync::OnceLock;

use regex::Regex;

const VIDEO_ID_LEN: usize = 11;

fn video_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
            .expect("valid video url regex")
    })
}

/// Pulls the 11-character video id out of a YouTube link.
pub fn extract_video_id(url: &str) -> Option<&str> {
    video_url_re()
        .captures(url)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|id| id.len() == VIDEO_ID_LEN)
}

/// Accepts either a bare id or any supported link form.
pub fn normalize_video_id(input: &str) -> &str {
    let input = input.trim();
    extract_video_id(input).unwrap_or(input)
}
