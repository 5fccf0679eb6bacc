//! Keypad matcher compiler
//!
//! Turns what was typed in the dial field into an anchored prefix matcher.
//! Each digit stands for itself plus the letters printed on its key, any other
//! character must appear literally. Letters compare case-insensitively.
//!
//! The matcher is a list of per-position segments rather than a regex, so
//! characters such as `*`, `+` or `(` never change its meaning.

use crate::utils::TextUtils;

/// Letters sharing a key with each digit, phone keypad layout.
const KEYPAD: [(char, &str); 10] = [
    ('1', "1"),
    ('2', "2abc"),
    ('3', "3def"),
    ('4', "4ghi"),
    ('5', "5jkl"),
    ('6', "6mno"),
    ('7', "7pqrs"),
    ('8', "8tuv"),
    ('9', "9wxyz"),
    ('0', "0+"),
];

/// Character class for a keypad digit, `None` for anything else.
pub fn key_class(c: char) -> Option<&'static str> {
    KEYPAD
        .iter()
        .find(|(digit, _)| *digit == c)
        .map(|(_, class)| *class)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Any character printed on the key.
    Key(&'static str),
    /// Exactly this character.
    Literal(char),
}

impl Segment {
    fn accepts(&self, c: char) -> bool {
        match self {
            Segment::Key(class) => {
                // classes are ASCII, so a non-ASCII char can only fail here
                class.contains(c.to_ascii_lowercase())
            }
            Segment::Literal(expected) => TextUtils::chars_eq_ignore_case(*expected, c),
        }
    }
}

/// Compiled query, reusable across any number of candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadMatcher {
    segments: Vec<Segment>,
}

impl KeypadMatcher {
    pub fn compile(query: &str) -> Self {
        let segments = query
            .chars()
            .map(|c| match key_class(c) {
                Some(class) => Segment::Key(class),
                None => Segment::Literal(c),
            })
            .collect();

        Self { segments }
    }

    /// An empty matcher accepts every candidate.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Anchored prefix test: the candidate must start with one char per segment.
    pub fn matches(&self, candidate: &str) -> bool {
        let mut chars = candidate.chars();
        self.segments
            .iter()
            .all(|segment| chars.next().map_or(false, |c| segment.accepts(c)))
    }
}
