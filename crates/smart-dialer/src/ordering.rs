//! Recency-weighted ordering
//!
//! Contacts called within the recency threshold always sort first, newest
//! call on top. Everyone else is ordered by call count, then alphabetically on
//! (given, middle, family, nickname). Phone numbers inside one contact are
//! ordered by their own last call date, uncalled numbers last in source order.
//!
//! Both comparators are pure; `sort_contacts` and `sort_numbers` apply them
//! with a stable sort.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::config::DEFAULT_RECENCY_THRESHOLD_DAYS;
use crate::contact::{Contact, PhoneNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyPolicy {
    threshold: Duration,
}

impl Default for RecencyPolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_RECENCY_THRESHOLD_DAYS)
    }
}

impl RecencyPolicy {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn from_days(days: i64) -> Self {
        Self::new(saturating_days(days))
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Fewer than `threshold` has elapsed since `last_call`.
    pub fn is_recent(&self, last_call: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_call.map_or(false, |at| now.signed_duration_since(at) < self.threshold)
    }

    /// `Less` means `a` sorts before `b`.
    pub fn compare_contacts(&self, a: &Contact, b: &Contact, now: DateTime<Utc>) -> Ordering {
        let a_recent = self.is_recent(a.last_call_date, now);
        let b_recent = self.is_recent(b.last_call_date, now);

        match (a_recent, b_recent) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            // both recent implies both dates are present
            (true, true) => {
                let by_date = b.last_call_date.cmp(&a.last_call_date);
                if by_date != Ordering::Equal {
                    return by_date;
                }
            }
            (false, false) => {}
        }

        b.call_count
            .cmp(&a.call_count)
            .then_with(|| a.name_fields().cmp(&b.name_fields()))
    }

    pub fn sort_contacts(&self, contacts: &mut [Contact], now: DateTime<Utc>) {
        contacts.sort_by(|a, b| self.compare_contacts(a, b, now));
    }
}

/// `days` as a duration, clamped to the representable range.
pub fn saturating_days(days: i64) -> Duration {
    Duration::try_days(days).unwrap_or(if days < 0 { Duration::MIN } else { Duration::MAX })
}

/// Newest call first; a number never called is older than any dated one.
pub fn compare_numbers(a: &PhoneNumber, b: &PhoneNumber) -> Ordering {
    match (a.last_call_date, b.last_call_date) {
        (Some(a_date), Some(b_date)) => b_date.cmp(&a_date),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_numbers(numbers: &mut [PhoneNumber]) {
    numbers.sort_by(compare_numbers);
}
