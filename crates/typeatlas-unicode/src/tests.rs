use super::*;
use typeatlas_core::traits::LocaleTable;
use typeatlas_core::types::Direction;
use BreakCode::*;

fn classify(text: &str) -> Vec<BreakCode> {
    IcuLineBreaker::new().classify(text, "en")
}

#[test]
fn empty_text_has_no_codes() {
    assert!(classify("").is_empty());
}

#[test]
fn spaces_allow_breaks() {
    assert_eq!(
        classify("ab cd"),
        vec![NoBreak, NoBreak, AllowBreak, NoBreak, MustBreak]
    );
}

#[test]
fn newlines_force_breaks() {
    assert_eq!(classify("a\nb"), vec![NoBreak, MustBreak, MustBreak]);
}

#[test]
fn crlf_breaks_once() {
    assert_eq!(
        classify("a\r\nb"),
        vec![NoBreak, NoBreak, MustBreak, MustBreak]
    );
}

#[test]
fn continuation_bytes_are_inside_a_character() {
    // 'é' is two bytes
    assert_eq!(classify("éa"), vec![InsideChar, NoBreak, MustBreak]);
}

#[test]
fn ideographs_break_without_spaces() {
    assert_eq!(
        classify("你好"),
        vec![InsideChar, InsideChar, AllowBreak, InsideChar, InsideChar, MustBreak]
    );
}

#[test]
fn the_last_byte_always_breaks() {
    assert_eq!(classify("word").last(), Some(&MustBreak));
    assert_eq!(classify("trailing ").last(), Some(&MustBreak));
}

#[test]
fn only_tailored_languages_are_supported() {
    let breaker = IcuLineBreaker::new();
    assert!(breaker.supports_language("en"));
    assert!(breaker.supports_language("ja"));
    assert!(!breaker.supports_language("ar"));
    assert!(!breaker.supports_language(""));
}

#[test]
fn builtin_locales_know_their_direction() {
    let table = StaticLocaleTable::new();
    let arabic = table.lookup("ar").unwrap();
    assert_eq!(arabic.script, "Arab");
    assert_eq!(arabic.direction, Direction::RightToLeft);
    assert_eq!(table.lookup("he").unwrap().direction, Direction::RightToLeft);
    assert_eq!(table.lookup("en").unwrap().direction, Direction::LeftToRight);
    assert!(table.lookup("xx").is_none());
}

#[test]
fn region_tags_match_with_either_separator() {
    let table = StaticLocaleTable::new();
    assert_eq!(table.lookup("zh-TW").unwrap().script, "Hant");
    assert_eq!(table.lookup("zh_TW").unwrap().script, "Hant");
    // Regions without their own row are left to the caller's fallback.
    assert!(table.lookup("ar-EG").is_none());
}

#[test]
fn rows_can_be_added() {
    let mut table = StaticLocaleTable::empty();
    assert!(table.is_empty());
    table.insert("dv_MV", "Thaa", Direction::RightToLeft);
    assert_eq!(table.len(), 1);
    assert_eq!(table.lookup("dv-MV").unwrap().script, "Thaa");
}
