//! Text normalization for post bodies and tag fields. Pure string transforms.

use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// Regex Patterns
// =============================================================================

static RE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?|ftp|file)://\S*|\bwww\.\S+").unwrap()
});
static RE_PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?|ftp|file):/*").unwrap());
static RE_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["\x{201C}\x{201D}\x{201E}\x{00AB}\x{00BB}]"#).unwrap());
static RE_NOISE_WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:RT|amp)\b").unwrap());
static RE_NON_BMP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\x{0000}-\x{FFFF}]").unwrap());
// Dingbats, enclosed M, misc symbols, variation selector, zero-width joiner.
static RE_BMP_EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{2702}-\x{27B0}\x{24C2}\x{2600}-\x{26FF}\x{FE0F}\x{200D}]").unwrap()
});
static RE_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]+").unwrap());
static RE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// =============================================================================
// Cleaning
// =============================================================================

/// Strip links, quotes, protocol prefixes, retweet markers, emoji and
/// characters outside the BMP; turn punctuation runs into spaces; collapse
/// whitespace (line breaks included).
pub fn clean_text(raw: &str) -> String {
    let text = RE_URL.replace_all(raw, "");
    let text = RE_QUOTES.replace_all(&text, "");
    let text = RE_PROTOCOL.replace_all(&text, "");
    let text = RE_NOISE_WORDS.replace_all(&text, "");
    let text = RE_NON_BMP.replace_all(&text, "");
    let text = RE_BMP_EMOJI.replace_all(&text, "");
    let text = RE_PUNCT.replace_all(&text, " ");
    RE_SPACE.replace_all(&text, " ").trim().to_string()
}

/// Clean a space-joined tag field and split it into individual tags.
/// Tags that are empty after cleaning are dropped.
pub fn clean_tags(raw: &str) -> Vec<String> {
    clean_text(raw)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_links_and_markers() {
        assert_eq!(
            clean_text("RT @someone: big news https://t.co/abc123 &amp; more"),
            "someone big news more"
        );
        assert_eq!(clean_text("see www.example.com/x now"), "see now");
        assert_eq!(clean_text("ftp://host/file and file:///tmp/x"), "and");
    }

    #[test]
    fn retweet_marker_only_removed_as_a_word() {
        assert_eq!(clean_text("ART and CAMPING"), "ART and CAMPING");
        assert_eq!(clean_text("example"), "example");
    }

    #[test]
    fn removes_emoji_and_quotes_and_collapses_whitespace() {
        assert_eq!(clean_text("\"so  good\" \u{1F600}\u{2764}\u{FE0F}\n\nyes!!"), "so good yes");
        assert_eq!(clean_text("sun\u{2600}shine"), "sunshine");
    }

    #[test]
    fn keeps_non_latin_letters() {
        assert_eq!(clean_text("東京 ニュース!"), "東京 ニュース");
        assert_eq!(clean_text("café—crème"), "café crème");
    }

    #[test]
    fn punctuation_only_becomes_empty() {
        assert_eq!(clean_text("!!! ... ???"), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn tags_are_cleaned_then_split() {
        assert_eq!(clean_tags("alpha beta"), vec!["alpha", "beta"]);
        assert_eq!(clean_tags("  Rust-Lang   #tokio "), vec!["Rust", "Lang", "tokio"]);
        assert!(clean_tags("").is_empty());
        assert!(clean_tags("\u{1F525} !!").is_empty());
    }
}
