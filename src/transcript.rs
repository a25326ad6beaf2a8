use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum cleaned text length worth sending to a synthesizer.
pub const MIN_SPEAKABLE_CHARS: usize = 3;

/// One time-coded utterance from the ASR engine. Timestamps are seconds
/// from the start of the video; gaps between segments represent silence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    /// Duration of the time slot this segment occupies.
    pub fn slot_duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Replace each segment's raw text with its sanitized form.
    pub fn sanitize(&mut self) {
        for segment in &mut self.segments {
            segment.text = sanitize(&segment.text);
        }
    }
}

static META_TOKENS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // <|en|>, <|ml|>, ... language tags
        Regex::new(r"<\|[a-z]+\|>").expect("valid regex"),
        // [Music], [Applause], ... bracketed annotations
        Regex::new(r"\[[^\]]*\]").expect("valid regex"),
        // (music), (laughter), ... parenthesized annotations
        Regex::new(r"\([^)]*\)").expect("valid regex"),
        // musical-note delimited spans
        Regex::new(r"♪[^♪]*♪").expect("valid regex"),
    ]
});

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LEADING_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[,.!?;:]+").expect("valid regex"));

/// Clean recognizer artifacts out of transcript text before it is spoken
/// or translated. Fails soft: malformed or empty input yields an empty
/// string, never an error.
pub fn sanitize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let mut cleaned = text.to_string();
    for pattern in META_TOKENS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    cleaned = MULTI_SPACE.replace_all(&cleaned, " ").into_owned();
    cleaned = LEADING_PUNCT.replace(&cleaned, "").into_owned();
    let cleaned = cleaned.trim();

    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            first.to_uppercase().collect::<String>() + chars.as_str()
        }
        Some(_) => cleaned.to_string(),
        None => String::new(),
    }
}

/// Whether sanitized text is worth synthesizing at all.
pub fn is_speakable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_SPEAKABLE_CHARS
}

/// Detect additional languages in a transcript by Unicode script range.
/// Classroom recordings mix scripts freely, so this widens the set of
/// source languages excluded from the default dub targets.
pub fn detect_script_languages(segments: &[Segment]) -> Vec<String> {
    let mut found = Vec::new();
    for segment in segments {
        for c in segment.text.chars() {
            let lang = match c {
                '\u{0D00}'..='\u{0D7F}' => Some("ml"),
                '\u{0900}'..='\u{097F}' => Some("hi"),
                '\u{0B80}'..='\u{0BFF}' => Some("ta"),
                _ => None,
            };
            if let Some(lang) = lang {
                if !found.iter().any(|f| f == lang) {
                    found.push(lang.to_string());
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_language_tags() {
        assert_eq!(sanitize("<|en|> hello there"), "Hello there");
    }

    #[test]
    fn test_sanitize_strips_bracketed_annotations() {
        assert_eq!(sanitize("[Music] welcome back"), "Welcome back");
        assert_eq!(sanitize("so we have (applause) a result"), "So we have a result");
    }

    #[test]
    fn test_sanitize_strips_music_note_spans() {
        assert_eq!(sanitize("♪ la la la ♪ now then"), "Now then");
    }

    #[test]
    fn test_sanitize_collapses_whitespace_and_leading_punctuation() {
        assert_eq!(sanitize("[noise],   so  the answer"), "So the answer");
    }

    #[test]
    fn test_sanitize_capitalizes_first_letter() {
        assert_eq!(sanitize("the quick brown fox"), "The quick brown fox");
        // Already capitalized text is left alone
        assert_eq!(sanitize("The quick brown fox"), "The quick brown fox");
    }

    #[test]
    fn test_sanitize_fails_soft_on_empty_or_annotation_only_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   "), "");
        assert_eq!(sanitize("[Music]"), "");
    }

    #[test]
    fn test_is_speakable_threshold() {
        assert!(!is_speakable(""));
        assert!(!is_speakable("ab"));
        assert!(is_speakable("abc"));
    }

    #[test]
    fn test_detect_script_languages() {
        let segments = vec![
            Segment { index: 0, start: 0.0, end: 1.0, text: "hello".to_string() },
            Segment { index: 1, start: 1.0, end: 2.0, text: "നമസ്കാരം".to_string() },
            Segment { index: 2, start: 2.0, end: 3.0, text: "नमस्ते".to_string() },
        ];
        let langs = detect_script_languages(&segments);
        assert_eq!(langs, vec!["ml".to_string(), "hi".to_string()]);
    }
}
