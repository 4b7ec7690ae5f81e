use whatlang::{Detector, Lang};

/// The two languages the relay translates between. Anything else is Unknown
/// and left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Portuguese,
}

impl Language {
    /// The language a message in this language gets translated into.
    pub fn target(self) -> Language {
        match self {
            Language::English => Language::Portuguese,
            Language::Portuguese => Language::English,
        }
    }

    /// Target code the DeepL API expects for this language.
    pub fn deepl_code(self) -> &'static str {
        match self {
            Language::English => "EN-GB",
            Language::Portuguese => "PT-PT",
        }
    }

    /// Flag emoji prefixed to replies in this language.
    pub fn flag(self) -> &'static str {
        match self {
            Language::English => "\u{1F1EC}\u{1F1E7}",
            Language::Portuguese => "\u{1F1F5}\u{1F1F9}",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Portuguese => write!(f, "Portuguese"),
        }
    }
}

/// Collapses whitespace runs and trims. Returns `None` for text that is empty
/// after cleanup.
pub fn normalize(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Classifies text as English, Portuguese, or Unknown (`None`).
///
/// Full-set detection is too noisy on short chat messages, so classification
/// runs against an allowlist of the two relay languages. A full-set pass
/// first catches text whatlang can reliably pin to a third language; scripts
/// with no allowlisted candidate (Cyrillic, CJK) fall out of the allowlist
/// detection on their own.
pub fn detect(text: &str) -> Option<Language> {
    // Detection on a handful of letters is noise
    if text.chars().filter(|c| c.is_alphabetic()).count() < 3 {
        return None;
    }

    // A reliable detection outside the relay pair is a third language, not
    // ambiguity
    if let Some(info) = whatlang::detect(text) {
        if info.is_reliable() && !matches!(info.lang(), Lang::Eng | Lang::Por) {
            return None;
        }
    }

    let info = Detector::with_allowlist(vec![Lang::Eng, Lang::Por]).detect(text)?;
    let language = match info.lang() {
        Lang::Eng => Language::English,
        Lang::Por => Language::Portuguese,
        _ => return None,
    };

    tracing::debug!(
        "Detected {} with confidence {:.2}",
        language,
        info.confidence()
    );

    Some(language)
}
