//! Walking text word by word over line-break codes

use crate::types::BreakCode;

/// Yields successive word spans of a per-byte break buffer
///
/// In multi-line mode a word runs up to and including the first byte whose
/// code allows or forces a break. In single-line mode the whole buffer is
/// one word.
///
/// ```
/// use typeatlas_core::types::BreakCode::{AllowBreak, MustBreak, NoBreak};
/// use typeatlas_core::WordEnumerator;
///
/// let codes = [NoBreak, AllowBreak, NoBreak, MustBreak];
/// let mut words = WordEnumerator::new(&codes, false);
/// assert!(words.advance());
/// assert_eq!(words.current_word(), 0..2);
/// assert!(words.advance());
/// assert_eq!(words.current_word(), 2..4);
/// assert!(words.current_word_must_break());
/// assert!(!words.advance());
/// ```
#[derive(Debug, Clone)]
pub struct WordEnumerator<'a> {
    codes: &'a [BreakCode],
    single_line: bool,
    index: usize,
    length: usize,
    finished: bool,
}

impl<'a> WordEnumerator<'a> {
    pub fn new(codes: &'a [BreakCode], single_line: bool) -> Self {
        Self {
            codes,
            single_line,
            index: 0,
            length: 0,
            finished: false,
        }
    }

    /// Move to the next word; false once the buffer is exhausted
    pub fn advance(&mut self) -> bool {
        if self.single_line {
            if self.finished {
                return false;
            }
            self.finished = true;
            self.index = 0;
            self.length = self.codes.len();
            return true;
        }

        self.index += self.length;
        if self.index >= self.codes.len() {
            self.length = 0;
            return false;
        }

        let end = self.codes[self.index..]
            .iter()
            .position(|code| matches!(code, BreakCode::MustBreak | BreakCode::AllowBreak))
            .map_or(self.codes.len(), |offset| self.index + offset + 1);
        self.length = end - self.index;
        true
    }

    /// Byte offset of the current word
    pub fn word_index(&self) -> usize {
        self.index
    }

    /// Byte length of the current word
    pub fn word_length(&self) -> usize {
        self.length
    }

    pub fn current_word(&self) -> std::ops::Range<usize> {
        self.index..self.index + self.length
    }

    /// Whether the current word ends with a forced break
    pub fn current_word_must_break(&self) -> bool {
        let end = self.index + self.length;
        end > 0 && self.codes.get(end - 1) == Some(&BreakCode::MustBreak)
    }

    pub fn is_last_word(&self) -> bool {
        self.finished || self.index + self.length >= self.codes.len()
    }

    /// The break codes being walked
    pub fn codes(&self) -> &'a [BreakCode] {
        self.codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use BreakCode::*;

    fn words(codes: &[BreakCode], single_line: bool) -> Vec<std::ops::Range<usize>> {
        let mut enumerator = WordEnumerator::new(codes, single_line);
        let mut out = Vec::new();
        while enumerator.advance() {
            out.push(enumerator.current_word());
        }
        out
    }

    #[test]
    fn single_line_yields_one_span() {
        let codes = [NoBreak, AllowBreak, NoBreak, MustBreak];
        assert_eq!(words(&codes, true), vec![0..4]);
    }

    #[test]
    fn multi_line_splits_after_break_opportunities() {
        // "ab cd\nef"
        let codes = [
            NoBreak, NoBreak, AllowBreak, NoBreak, NoBreak, MustBreak, NoBreak, MustBreak,
        ];
        assert_eq!(words(&codes, false), vec![0..3, 3..6, 6..8]);
    }

    #[test]
    fn inside_char_bytes_stay_in_their_word() {
        // "é a"
        let codes = [InsideChar, AllowBreak, NoBreak, MustBreak];
        assert_eq!(words(&codes, false), vec![0..2, 2..4]);
    }

    #[test]
    fn must_break_and_last_word_are_reported() {
        let codes = [NoBreak, MustBreak, NoBreak, AllowBreak, NoBreak, MustBreak];
        let mut enumerator = WordEnumerator::new(&codes, false);
        assert!(!enumerator.current_word_must_break());

        assert!(enumerator.advance());
        assert!(enumerator.current_word_must_break());
        assert!(!enumerator.is_last_word());

        assert!(enumerator.advance());
        assert!(!enumerator.current_word_must_break());

        assert!(enumerator.advance());
        assert!(enumerator.current_word_must_break());
        assert!(enumerator.is_last_word());
    }

    #[test]
    fn empty_buffer_has_no_words_in_multi_line_mode() {
        assert!(words(&[], false).is_empty());
    }

    fn code() -> impl Strategy<Value = BreakCode> {
        prop_oneof![Just(NoBreak), Just(AllowBreak), Just(MustBreak), Just(InsideChar)]
    }

    proptest! {
        #[test]
        fn spans_tile_the_buffer(codes in prop::collection::vec(code(), 0..64)) {
            let spans = words(&codes, false);
            let mut expected_start = 0;
            for span in &spans {
                prop_assert_eq!(span.start, expected_start);
                prop_assert!(span.end > span.start);
                expected_start = span.end;
            }
            prop_assert_eq!(expected_start, codes.len());
        }

        #[test]
        fn only_the_last_byte_of_a_span_may_break(codes in prop::collection::vec(code(), 1..64)) {
            for span in words(&codes, false) {
                for &code in &codes[span.start..span.end - 1] {
                    prop_assert!(!matches!(code, MustBreak | AllowBreak));
                }
            }
        }
    }
}
