//! Single-line CSV tokenizer and the matching field serializer.
//!
//! The tokenizer follows RFC 4180 quoting, applied to one physical line at a
//! time. Quoted fields cannot span lines: a newline always ends a record.
//!
//! # Rules
//! - Leading spaces and tabs before a field are skipped.
//! - A field starting with `"` is quoted. Inside it `""` is a literal quote and
//!   a lone `"` closes the field.
//! - Unquoted fields run to the next comma and are trimmed.
//! - A trailing comma produces one extra empty field.
//!
//! Tokenizing never fails. Malformed quoting degrades to best-effort
//! extraction: an unterminated quote swallows the rest of the line, and
//! stray characters between a closing quote and the next comma are appended
//! to the field.

use std::borrow::Cow;

/// Split one physical CSV line into its fields.
///
/// # Examples
/// ```
/// use ironcart::io::tokenizer::tokenize_line;
///
/// let fields = tokenize_line(r#" a , "b, ""c""",d,"#);
/// assert_eq!(fields, vec!["a", r#"b, "c""#, "d", ""]);
/// ```
#[must_use]
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        }

        let mut field = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        break;
                    }
                } else {
                    field.push(c);
                }
            }
            // junk after the closing quote, up to the separator
            let mut tail = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                tail.push(c);
                chars.next();
            }
            field.push_str(tail.trim());
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                field.push(c);
                chars.next();
            }
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                field = trimmed.to_string();
            }
        }
        fields.push(field);

        match chars.next() {
            Some(',') => {
                if chars.peek().is_none() {
                    fields.push(String::new());
                    break;
                }
            }
            _ => break,
        }
    }

    fields
}

/// Quote a field for output when it contains a comma, a quote or a line break.
///
/// Internal quotes are doubled. Fields that need no quoting are borrowed.
#[must_use]
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Serialize a full line with [`escape_field`] applied to every field.
#[must_use]
pub fn join_fields<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}
