use whatlang::{detect, Lang, Script};

const MIN_ALPHA_CHARS: usize = 2;
const LATIN_CONFIDENCE_THRESHOLD: f64 = 0.68;
const NON_LATIN_CONFIDENCE_THRESHOLD: f64 = 0.5;

fn alphabetic_char_count(text: &str) -> usize {
    text.chars().filter(|ch| ch.is_alphabetic()).count()
}

fn language_name(lang: Lang) -> String {
    match lang {
        Lang::Cmn => "Chinese".to_string(),
        other => other.eng_name().to_string(),
    }
}

/// Best-effort detection of the language a theme was written in.
/// Returns `None` when the text is too short or detection is not
/// confident enough to act on.
pub fn detect_input_language(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || alphabetic_char_count(trimmed) < MIN_ALPHA_CHARS {
        return None;
    }

    let info = detect(trimmed)?;
    if info.is_reliable() {
        return Some(language_name(info.lang()));
    }

    let threshold = match info.script() {
        Script::Latin => LATIN_CONFIDENCE_THRESHOLD,
        _ => NON_LATIN_CONFIDENCE_THRESHOLD,
    };
    if info.confidence() >= threshold {
        return Some(language_name(info.lang()));
    }

    None
}

pub fn language_hint_or(text: &str, default_language: &str) -> String {
    detect_input_language(text).unwrap_or_else(|| default_language.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_chinese_theme_input() {
        let detected = language_hint_or("复古咖啡馆的温暖氛围", "English");
        assert_eq!(detected, "Chinese");
    }

    #[test]
    fn detects_english_theme_input() {
        let detected = language_hint_or("a sun-drenched coastal villa with rattan furniture", "Chinese");
        assert_eq!(detected, "English");
    }

    #[test]
    fn falls_back_when_no_signal_is_available() {
        let detected = language_hint_or("12345", "English");
        assert_eq!(detected, "English");
    }
}
