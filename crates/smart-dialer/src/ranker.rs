//! Two-tier contact ranking
//!
//! Tier 1: the display name with whitespace removed matches the query.
//! Tier 2: any single identity field (given, middle, family, nickname) matches.
//!
//! Input order already encodes recency, so each tier keeps it.

use crate::contact::Contact;
use crate::keypad::KeypadMatcher;
use crate::utils::TextUtils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    DisplayName,
    NameField,
}

/// Which tier, if any, a contact falls into for this matcher.
pub fn classify(contact: &Contact, matcher: &KeypadMatcher) -> Option<MatchTier> {
    let display_name = contact.display_name();
    if matcher.matches(&TextUtils::strip_whitespace(&display_name)) {
        return Some(MatchTier::DisplayName);
    }

    contact
        .name_fields()
        .iter()
        .any(|field| matcher.matches(field))
        .then_some(MatchTier::NameField)
}

/// Rank `contacts` for `query`. An empty query returns the input unchanged.
pub fn rank<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    if query.is_empty() {
        return contacts.iter().collect();
    }

    let matcher = KeypadMatcher::compile(query);
    let mut display_matches = Vec::new();
    let mut field_matches = Vec::new();

    for contact in contacts {
        match classify(contact, &matcher) {
            Some(MatchTier::DisplayName) => display_matches.push(contact),
            Some(MatchTier::NameField) => field_matches.push(contact),
            None => {}
        }
    }

    display_matches.extend(field_matches);
    display_matches
}
