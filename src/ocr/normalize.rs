//! OCR text cleanup per field kind.

use regex::Regex;
use std::sync::LazyLock;

use crate::layout::FieldKind;

/// Misread repairs for name text. '0' and '1' stay: real names carry those
/// digits more often than OCR confuses them.
const NAME_MISREADS: &[(char, char)] = &[
    ('2', 'Z'),
    ('3', 'E'),
    ('4', 'A'),
    ('5', 'S'),
    ('6', 'G'),
    ('7', 'T'),
    ('8', 'B'),
    ('9', 'G'),
    ('|', 'I'),
    ('@', 'A'),
    ('$', 'S'),
    ('&', 'E'),
    ('!', 'I'),
    ('£', 'E'),
    ('€', 'E'),
];

/// A single uppercase letter tacked onto the end of a name is a recurring
/// OCR artifact ("blacksnowA").
static TRAILING_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9])([A-Z])$").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Cleans raw OCR text for the given field. `None` means nothing usable
/// survived cleanup.
pub fn clean(text: &str, field: FieldKind) -> Option<String> {
    let cleaned = match field {
        FieldKind::Name => clean_name(text),
        FieldKind::Accuracy => clean_accuracy(text),
        _ => clean_digits(text),
    };
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

fn clean_name(text: &str) -> String {
    let repaired: String = text.chars().map(repair_char).collect();
    let spaced = repaired.replace('_', " ");
    let stripped = TRAILING_UPPER.replace(&spaced, "$1");
    let collapsed = WHITESPACE_RUN.replace_all(stripped.trim(), " ");
    collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

fn repair_char(c: char) -> char {
    NAME_MISREADS
        .iter()
        .find(|(wrong, _)| *wrong == c)
        .map(|(_, right)| *right)
        .unwrap_or(c)
}

fn clean_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Keeps digits, '.', and '%', collapsing any percent signs into a single
/// trailing one.
fn clean_accuracy(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '%')
        .collect();
    let had_percent = kept.contains('%');
    let number: String = kept.chars().filter(|c| *c != '%').collect();
    if number.is_empty() {
        return String::new();
    }
    if had_percent { format!("{number}%") } else { number }
}
