/// Transcript language codes: `(code, backend language tag, description)`.
pub const LANGUAGES: &[(&str, &str, &str)] = &[
    ("a", "en-us", "American English"),
    ("b", "en-gb", "British English"),
    ("e", "es", "Spanish"),
    ("f", "fr", "French"),
    ("h", "hi", "Hindi"),
    ("i", "it", "Italian"),
    ("p", "pt-br", "Brazilian Portuguese"),
    ("j", "ja", "Japanese"),
    ("z", "cmn", "Mandarin Chinese"),
];

/// Language used when none is given or the requested one is rejected.
pub const DEFAULT_LANGUAGE: &str = "a";

/// Map a one-letter language code to its language tag (e.g. `"f"` -> `"fr"`).
pub fn language_tag(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, tag, _)| *tag)
}

pub fn is_language_code(code: &str) -> bool {
    language_tag(code).is_some()
}

/// One line per language, for usage messages.
pub fn language_help() -> String {
    let mut help = String::from("Language codes:\n");
    for (code, _, name) in LANGUAGES {
        help.push_str(&format!("  {code}: {name}\n"));
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_codes_to_tags() {
        assert_eq!(language_tag("a"), Some("en-us"));
        assert_eq!(language_tag("z"), Some("cmn"));
        assert_eq!(language_tag("x"), None);
        assert_eq!(language_tag(""), None);
    }

    #[test]
    fn default_language_is_known() {
        assert!(is_language_code(DEFAULT_LANGUAGE));
    }

    #[test]
    fn help_lists_every_language() {
        let help = language_help();
        assert!(help.contains("  p: Brazilian Portuguese"));
        assert_eq!(help.lines().count(), LANGUAGES.len() + 1);
    }
}
