use super::*;

#[test]
fn whitespace_runs_collapse() {
    let text = NormalizedString::from_text("  a \t\n b\u{00A0}\u{00A0}c  ");
    assert_eq!(text.to_string(), "a b c");
    assert_eq!(text.length(), 5);
}

#[test]
fn blanks_are_never_doubled() {
    let mut text = NormalizedString::new();
    text.append_blank().append("a").append_blank().append_blank().append(" b");
    assert_eq!(text.to_string(), "a b");
}

#[test]
fn trailing_blank_is_not_counted() {
    let mut text = NormalizedString::new();
    text.append("ab");
    let before = text.length();
    text.append_blank();
    assert_eq!(text.length(), before);
    text.append("c");
    assert_eq!(text.length(), 4);
}

#[test]
fn substring_trims_one_blank_per_edge() {
    let text = NormalizedString::from_text("one two three");
    assert_eq!(text.substring(3, 8), "two");
    assert_eq!(text.substring(4, 7), "two");
    assert_eq!(text.substring(0, 100), "one two three");
    assert_eq!(text.substring(7, 3), "");
    assert_eq!(text.substring(3, 4), "");
}

#[test]
fn disabled_buffer_ignores_appends() {
    let mut text = NormalizedString::from_text("a");
    let saved = text.append_enabled();
    text.disable_append();
    text.append("ignored").append_blank();
    text.set_append_enabled(saved);
    text.append_blank().append("b");
    assert_eq!(text.to_string(), "a b");

    text.disable_append();
    assert!(!text.append_enabled());
    text.enable_append();
    assert!(text.append_enabled());
}
