//! Unicode line breaking and locale lookup for typeatlas
//!
//! [`IcuLineBreaker`] runs the UAX #14 line segmenter from ICU4X and turns
//! its break positions into the per-byte codes the layout engine walks.
//! [`StaticLocaleTable`] knows which script and direction common locales
//! lay text out with.

mod locale;

pub use locale::StaticLocaleTable;

use icu_segmenter::{options::LineBreakOptions, LineSegmenter};
use typeatlas_core::{traits::LineBreaker, types::BreakCode};

/// Languages with tailored line-break behavior
///
/// Other languages are broken with the English rules.
pub const SUPPORTED_LANGUAGES: [&str; 8] = ["en", "de", "es", "fr", "ru", "zh", "ja", "ko"];

/// Line-break classifier backed by ICU4X
///
/// Dictionary and LSTM models for Thai, Lao, Khmer, Burmese and CJK are
/// compiled in, so breaks inside those scripts come out right without
/// spaces in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcuLineBreaker;

impl IcuLineBreaker {
    pub fn new() -> Self {
        Self
    }
}

/// Characters after which a line must end
fn is_hard_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

impl LineBreaker for IcuLineBreaker {
    fn classify(&self, text: &str, language: &str) -> Vec<BreakCode> {
        let mut codes = vec![BreakCode::InsideChar; text.len()];
        if text.is_empty() {
            return codes;
        }
        log::trace!("Classifying {} bytes of {} text", text.len(), language);

        let segmenter = LineSegmenter::new_auto(LineBreakOptions::default());
        // Positions come back ascending and include 0 and text.len().
        let mut breaks = segmenter
            .segment_str(text)
            .filter(|&position| position > 0)
            .peekable();

        for (offset, ch) in text.char_indices() {
            let end = offset + ch.len_utf8();
            while breaks.next_if(|&position| position < end).is_some() {}
            let breaks_here = breaks.next_if_eq(&end).is_some();

            codes[end - 1] = if end == text.len() || (breaks_here && is_hard_break(ch)) {
                BreakCode::MustBreak
            } else if breaks_here {
                BreakCode::AllowBreak
            } else {
                BreakCode::NoBreak
            };
        }
        codes
    }

    fn supports_language(&self, language: &str) -> bool {
        SUPPORTED_LANGUAGES.contains(&language)
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod proptests;
