use ironcart::io::tokenizer::{escape_field, join_fields, tokenize_line};
use std::borrow::Cow;

#[test]
fn special_fields_survive_join_and_tokenize() {
    let fields = vec![
        "plain".to_string(),
        "with, comma".to_string(),
        r#"say "hi""#.to_string(),
        "two\nlines".to_string(),
        "cr\rinside".to_string(),
        String::new(),
    ];
    let line = join_fields(&fields);
    assert_eq!(tokenize_line(&line), fields);
}

#[test]
fn unquoted_fields_are_trimmed() {
    assert_eq!(tokenize_line("  a ,\tb\t, c"), vec!["a", "b", "c"]);
}

#[test]
fn trailing_comma_adds_empty_field() {
    assert_eq!(tokenize_line("a,b,"), vec!["a", "b", ""]);
    assert_eq!(tokenize_line("a,,"), vec!["a", "", ""]);
}

#[test]
fn doubled_quotes_unescape() {
    assert_eq!(
        tokenize_line(r#""He said ""no""",x"#),
        vec![r#"He said "no""#, "x"]
    );
}

#[test]
fn quoted_field_keeps_inner_whitespace() {
    assert_eq!(tokenize_line(r#"" padded ",b"#), vec![" padded ", "b"]);
}

#[test]
fn escape_only_allocates_when_needed() {
    assert!(matches!(escape_field("abc"), Cow::Borrowed("abc")));
    assert_eq!(escape_field("a,b"), "\"a,b\"");
    assert_eq!(escape_field(r#"5" disk"#), r#""5"" disk""#);
}

#[test]
fn join_quotes_only_special_fields() {
    assert_eq!(join_fields(&["a", "b c", "d,e"]), r#"a,b c,"d,e""#);
}
