use super::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn one_code_per_byte(s in "\\PC{0,40}") {
        let codes = IcuLineBreaker::new().classify(&s, "en");
        prop_assert_eq!(codes.len(), s.len());
    }

    #[test]
    fn inside_char_marks_exactly_the_continuation_bytes(s in "\\PC{1,40}") {
        let codes = IcuLineBreaker::new().classify(&s, "en");
        for (offset, ch) in s.char_indices() {
            let last = offset + ch.len_utf8() - 1;
            for (index, code) in codes.iter().enumerate().take(last).skip(offset) {
                prop_assert_eq!(*code, BreakCode::InsideChar, "byte {}", index);
            }
            prop_assert_ne!(codes[last], BreakCode::InsideChar);
        }
        prop_assert_eq!(codes.last(), Some(&BreakCode::MustBreak));
    }

    #[test]
    fn newlines_always_force_a_break(parts in prop::collection::vec("[a-z ]{0,8}", 1..5)) {
        let text = parts.join("\n");
        let codes = IcuLineBreaker::new().classify(&text, "en");
        for (offset, ch) in text.char_indices() {
            if ch == '\n' {
                prop_assert_eq!(codes[offset], BreakCode::MustBreak);
            }
        }
    }
}
