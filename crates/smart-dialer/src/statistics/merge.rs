//! Folding call counters into contacts
//!
//! `merge_statistics` runs once per contact when the directory is rebuilt.
//! `record_call` and `apply_call` handle a single completed call without
//! touching the rest of the directory.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{CallCounter, CallStatisticsStore};
use crate::contact::{Contact, ContactRecord};
use crate::ordering::sort_numbers;

/// Build a contact from its source record and the stored counters of its numbers.
///
/// A failed lookup counts as "never called" for that number.
pub fn merge_statistics(record: ContactRecord, store: &dyn CallStatisticsStore) -> Contact {
    let mut contact = Contact::from_record(record);

    for phone in contact.phone_numbers.iter_mut() {
        match store.get(&phone.number) {
            Ok(Some(counter)) => {
                phone.call_count = counter.call_count;
                phone.last_call_date = Some(counter.last_call_date);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Call statistics lookup failed for {}: {:#}", phone.number, e);
            }
        }
    }

    contact.call_count = contact.phone_numbers.iter().map(|p| p.call_count).sum();
    contact.last_call_date = contact
        .phone_numbers
        .iter()
        .filter_map(|p| p.last_call_date)
        .max();
    sort_numbers(&mut contact.phone_numbers);

    contact
}

/// Persist one completed call to `phone_number`.
pub fn record_call(
    phone_number: &str,
    at: DateTime<Utc>,
    store: &dyn CallStatisticsStore,
) -> anyhow::Result<CallCounter> {
    let counter = store.increment(phone_number, at)?;
    debug!(
        "Recorded call to {} (total {})",
        counter.phone_number, counter.call_count
    );
    Ok(counter)
}

/// Apply one call to the in-memory contact owning `phone_number`.
///
/// Returns false when the contact does not own the number.
pub fn apply_call(contact: &mut Contact, phone_number: &str, at: DateTime<Utc>) -> bool {
    let Some(phone) = contact
        .phone_numbers
        .iter_mut()
        .find(|p| p.number == phone_number)
    else {
        return false;
    };

    phone.call_count += 1;
    phone.last_call_date = Some(at);

    contact.call_count += 1;
    contact.last_call_date = Some(contact.last_call_date.map_or(at, |last| last.max(at)));
    sort_numbers(&mut contact.phone_numbers);
    true
}
