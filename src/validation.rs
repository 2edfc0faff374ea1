//! Input checks for identifiers and free text arriving over HTTP

use regex::Regex;
use std::sync::OnceLock;

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid video id regex"))
}

fn playlist_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^PL[a-zA-Z0-9_-]+$").expect("valid playlist id regex"))
}

/// YouTube video ids are exactly 11 URL-safe characters
pub fn is_valid_video_id(id: &str) -> bool {
    video_id_regex().is_match(id)
}

/// User playlists start with `PL`
pub fn is_valid_playlist_id(id: &str) -> bool {
    playlist_id_regex().is_match(id)
}

/// Trim and strip angle brackets
pub fn sanitize_string(input: &str) -> String {
    input.trim().chars().filter(|c| *c != '<' && *c != '>').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_ids() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(is_valid_video_id("a_b-c_d-e_f"));
        assert!(!is_valid_video_id("dQw4w9WgXc"));
        assert!(!is_valid_video_id("dQw4w9WgXcQQ"));
        assert!(!is_valid_video_id("dQw4w9WgX Q"));
        assert!(!is_valid_video_id(""));
    }

    #[test]
    fn test_playlist_ids() {
        assert!(is_valid_playlist_id("PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG"));
        assert!(!is_valid_playlist_id("PL"));
        assert!(!is_valid_playlist_id("UUx0sYbCqOb8"));
        assert!(!is_valid_playlist_id("PL../../etc"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_string("  hello  "), "hello");
        assert_eq!(sanitize_string("<script>x</script>"), "scriptx/script");
        assert_eq!(sanitize_string(""), "");
    }
}
