//! Contact data model
//!
//! `ContactRecord` is what the contact source hands over; `Contact` is the
//! directory's view of the same person after call statistics were merged in.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phone entry as read from the address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneEntry {
    #[serde(default)]
    pub label: String,
    pub number: String,
}

impl PhoneEntry {
    pub fn new(label: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            number: number.into(),
        }
    }
}

/// Raw contact from the external address book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRecord {
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub nickname: String,
    pub thumbnail: Option<Bytes>,
    pub phone_numbers: Vec<PhoneEntry>,
}

impl ContactRecord {
    pub fn new(given_name: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            ..Default::default()
        }
    }

    pub fn with_number(mut self, label: impl Into<String>, number: impl Into<String>) -> Self {
        self.phone_numbers.push(PhoneEntry::new(label, number));
        self
    }

    pub fn with_family_name(mut self, family_name: impl Into<String>) -> Self {
        self.family_name = family_name.into();
        self
    }

    pub fn with_middle_name(mut self, middle_name: impl Into<String>) -> Self {
        self.middle_name = middle_name.into();
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }
}

/// One phone number of a contact together with its call statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub label: String,
    pub number: String,
    pub call_count: u64,
    pub last_call_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub nickname: String,
    #[serde(skip)]
    pub image: Option<Bytes>,
    /// Unique by number, most recently called first.
    pub phone_numbers: Vec<PhoneNumber>,
    pub last_call_date: Option<DateTime<Utc>>,
    pub call_count: u64,
}

impl Contact {
    /// Build a contact with no call statistics attached; numbers keep source order.
    pub fn from_record(record: ContactRecord) -> Self {
        let mut phone_numbers: Vec<PhoneNumber> = Vec::with_capacity(record.phone_numbers.len());
        for entry in record.phone_numbers {
            // the address book may carry blank values; anything else is kept verbatim
            if entry.number.trim().is_empty()
                || phone_numbers.iter().any(|p| p.number == entry.number)
            {
                continue;
            }
            phone_numbers.push(PhoneNumber {
                label: entry.label,
                number: entry.number,
                call_count: 0,
                last_call_date: None,
            });
        }

        Self {
            given_name: record.given_name,
            middle_name: record.middle_name,
            family_name: record.family_name,
            nickname: record.nickname,
            image: record.thumbnail,
            phone_numbers,
            last_call_date: None,
            call_count: 0,
        }
    }

    /// Given, middle and family name joined by spaces, plus the nickname in quotes.
    pub fn display_name(&self) -> String {
        let mut name = [&self.given_name, &self.middle_name, &self.family_name]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let nickname = self.nickname.trim();
        if !nickname.is_empty() {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push('"');
            name.push_str(nickname);
            name.push('"');
        }

        name
    }

    /// Identity fields in tie-break order.
    pub fn name_fields(&self) -> [&str; 4] {
        [
            &self.given_name,
            &self.middle_name,
            &self.family_name,
            &self.nickname,
        ]
    }

    /// The number dialled when the contact is picked from a list.
    pub fn primary_number(&self) -> Option<&PhoneNumber> {
        self.phone_numbers.first()
    }

    pub fn owns_number(&self, number: &str) -> bool {
        self.phone_numbers.iter().any(|p| p.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(given: &str, middle: &str, family: &str, nickname: &str) -> Contact {
        Contact::from_record(ContactRecord {
            given_name: given.into(),
            middle_name: middle.into(),
            family_name: family.into(),
            nickname: nickname.into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_display_name_joins_non_empty_fields() {
        assert_eq!(contact("Ann", "", "Lee", "").display_name(), "Ann Lee");
        assert_eq!(contact("Ann", "Marie", "Lee", "").display_name(), "Ann Marie Lee");
        assert_eq!(contact("", "", "Lee", "").display_name(), "Lee");
    }

    #[test]
    fn test_display_name_quotes_nickname() {
        assert_eq!(contact("Robert", "", "Smith", "Bob").display_name(), "Robert Smith \"Bob\"");
        assert_eq!(contact("", "", "", "Bob").display_name(), "\"Bob\"");
    }

    #[test]
    fn test_display_name_tracks_identity_changes() {
        let mut c = contact("Ann", "", "", "");
        c.family_name = "Lee".into();
        assert_eq!(c.display_name(), "Ann Lee");
    }

    #[test]
    fn test_from_record_skips_empty_and_duplicate_numbers() {
        let record = ContactRecord::new("Ann")
            .with_number("mobile", "123")
            .with_number("home", "")
            .with_number("work", "123")
            .with_number("work", "456");

        let c = Contact::from_record(record);
        let numbers: Vec<_> = c.phone_numbers.iter().map(|p| p.number.as_str()).collect();

        assert_eq!(numbers, vec!["123", "456"]);
        assert_eq!(c.phone_numbers[0].label, "mobile");
        assert_eq!(c.primary_number().map(|p| p.number.as_str()), Some("123"));
    }

    #[test]
    fn test_from_record_keeps_numbers_verbatim() {
        let record = ContactRecord::new("Ann")
            .with_number("mobile", " 123")
            .with_number("home", "   ")
            .with_number("work", "123");

        let c = Contact::from_record(record);
        let numbers: Vec<_> = c.phone_numbers.iter().map(|p| p.number.as_str()).collect();

        assert_eq!(numbers, vec![" 123", "123"]);
        assert!(c.owns_number(" 123"));
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let record: ContactRecord = serde_json::from_str(
            r#"{"given_name": "Ann", "phone_numbers": [{"number": "123"}]}"#,
        )
        .unwrap();

        assert_eq!(record.given_name, "Ann");
        assert_eq!(record.family_name, "");
        assert_eq!(record.phone_numbers, vec![PhoneEntry::new("", "123")]);
    }
}
