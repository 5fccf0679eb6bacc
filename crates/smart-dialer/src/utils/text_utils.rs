//! Name normalization helpers

use std::borrow::Cow;
use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

pub struct TextUtils;

impl TextUtils {
    /// Remove every run of whitespace, borrowing when there is nothing to strip.
    pub fn strip_whitespace(text: &str) -> Cow<'_, str> {
        if WHITESPACE_REGEX.is_match(text) {
            WHITESPACE_REGEX.replace_all(text, "")
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Case-insensitive char equality that also handles multi-char lowercase forms
    pub fn chars_eq_ignore_case(a: char, b: char) -> bool {
        a == b || a.to_lowercase().eq(b.to_lowercase())
    }
}
