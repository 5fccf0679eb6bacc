// smart-dialer/crates/dialer-ffi/src/lib.rs
//
// C ABI over `ContactDirectory`. Contacts go in and ranked rows come out as
// JSON strings; every string returned here must be released with
// `smart_dialer_free_string`.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

use serde::Serialize;
use smart_dialer::{
    format_call_date_local, init_tracing, CallStatisticsStore, Contact, ContactDirectory,
    ContactRecord, DialerConfig, DialerError, InMemoryCallStore, SqliteCallStore,
    StaticContactSource,
};
use tokio::runtime::Runtime;
use tracing::{error, warn};

pub const SMART_DIALER_OK: c_int = 0;
/// The call was applied to the directory but could not be saved.
pub const SMART_DIALER_NOT_PERSISTED: c_int = 1;
pub const SMART_DIALER_INVALID_ARGUMENT: c_int = -1;
pub const SMART_DIALER_INTERNAL_ERROR: c_int = -2;

pub struct SmartDialerHandle {
    runtime: Runtime,
    source: Arc<StaticContactSource>,
    directory: ContactDirectory,
    this_week_days: i64,
}

/// One row of the dialer list as the UI renders it.
#[derive(Debug, Serialize)]
struct ContactRow<'a> {
    display_name: String,
    primary_number: Option<&'a str>,
    call_count: u64,
    last_call_label: Option<String>,
    contact: &'a Contact,
}

impl<'a> ContactRow<'a> {
    fn new(contact: &'a Contact, this_week_days: i64) -> Self {
        Self {
            display_name: contact.display_name(),
            primary_number: contact.primary_number().map(|p| p.number.as_str()),
            call_count: contact.call_count,
            last_call_label: contact
                .last_call_date
                .map(|at| format_call_date_local(at, this_week_days)),
            contact,
        }
    }
}

fn guard<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!("Panic caught at the C boundary");
        fallback
    })
}

/// Borrow a C string. Null or invalid UTF-8 yields `None`.
unsafe fn borrow_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn parse_records(json: &str) -> Option<Vec<ContactRecord>> {
    match serde_json::from_str(json) {
        Ok(records) => Some(records),
        Err(e) => {
            warn!("Rejected contact export: {}", e);
            None
        }
    }
}

fn rows_to_json(contacts: &[Contact], this_week_days: i64) -> *mut c_char {
    let rows: Vec<ContactRow<'_>> = contacts
        .iter()
        .map(|c| ContactRow::new(c, this_week_days))
        .collect();

    let json = match serde_json::to_string(&rows) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize contact rows: {}", e);
            return ptr::null_mut();
        }
    };

    match CString::new(json) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn open_store(
    db_path: Option<&str>,
    config: &DialerConfig,
) -> Option<Arc<dyn CallStatisticsStore>> {
    let Some(path) = db_path else {
        return Some(Arc::new(InMemoryCallStore::new()));
    };

    match SqliteCallStore::open(&PathBuf::from(path), config.pool_size) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            error!("Failed to open call counter database {}: {:#}", path, e);
            None
        }
    }
}

/// Install the library's log subscriber. Returns 1 when installed, 0 when a
/// subscriber was already in place.
#[no_mangle]
pub extern "C" fn smart_dialer_init_logging() -> c_int {
    guard(0, || c_int::from(init_tracing()))
}

impl SmartDialerHandle {
    fn build(
        store: Arc<dyn CallStatisticsStore>,
        records: Vec<ContactRecord>,
        config: &DialerConfig,
    ) -> Option<Self> {
        let runtime = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to start dialer runtime: {}", e);
                return None;
            }
        };

        let source = Arc::new(StaticContactSource::new(records));
        let directory = ContactDirectory::new(source.clone(), store, config.recency_policy());
        runtime.block_on(directory.refresh());

        Some(Self {
            runtime,
            source,
            directory,
            this_week_days: config.this_week_days,
        })
    }
}

/// Create a dialer. `db_path` may be null for a volatile store, `contacts_json`
/// may be null for an empty address book. Returns null on failure.
///
/// # Safety
/// Non-null arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_new(
    db_path: *const c_char,
    contacts_json: *const c_char,
) -> *mut SmartDialerHandle {
    guard(ptr::null_mut(), || {
        let config = match DialerConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid dialer configuration, using defaults: {:#}", e);
                DialerConfig::default()
            }
        };
        config.print_config();

        let records = match borrow_str(contacts_json) {
            Some(json) => match parse_records(json) {
                Some(records) => records,
                None => return ptr::null_mut(),
            },
            None => Vec::new(),
        };

        let Some(store) = open_store(borrow_str(db_path), &config) else {
            return ptr::null_mut();
        };

        match SmartDialerHandle::build(store, records, &config) {
            Some(handle) => Box::into_raw(Box::new(handle)),
            None => ptr::null_mut(),
        }
    })
}

/// # Safety
/// `handle` must come from `smart_dialer_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_free(handle: *mut SmartDialerHandle) {
    if handle.is_null() {
        return;
    }
    let handle = Box::from_raw(handle);

    guard((), move || {
        if let Err(e) = handle.runtime.block_on(handle.directory.flush()) {
            warn!("Final flush failed: {}", e);
        }
    })
}

/// Rebuild the directory. A non-null `contacts_json` replaces the address book
/// first. Returns the contact count, or a negative code.
///
/// # Safety
/// `handle` must be live; `contacts_json` null or a valid string.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_refresh(
    handle: *mut SmartDialerHandle,
    contacts_json: *const c_char,
) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return SMART_DIALER_INVALID_ARGUMENT;
    };

    guard(SMART_DIALER_INTERNAL_ERROR, || {
        if !contacts_json.is_null() {
            let Some(records) = borrow_str(contacts_json).and_then(parse_records) else {
                return SMART_DIALER_INVALID_ARGUMENT;
            };
            handle.source.replace(records);
        }

        let count = handle.runtime.block_on(handle.directory.refresh());
        c_int::try_from(count).unwrap_or(c_int::MAX)
    })
}

/// Ranked rows for `query` as a JSON array. Null on invalid arguments.
///
/// # Safety
/// `handle` must be live; `query` a valid string.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_search(
    handle: *mut SmartDialerHandle,
    query: *const c_char,
) -> *mut c_char {
    let (Some(handle), Some(query)) = (handle.as_ref(), borrow_str(query)) else {
        return ptr::null_mut();
    };

    guard(ptr::null_mut(), || {
        let ranked = handle.runtime.block_on(handle.directory.search(query));
        rows_to_json(&ranked, handle.this_week_days)
    })
}

/// Whole directory, in display order, as a JSON array.
///
/// # Safety
/// `handle` must be live.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_current_directory(
    handle: *mut SmartDialerHandle,
) -> *mut c_char {
    let Some(handle) = handle.as_ref() else {
        return ptr::null_mut();
    };

    guard(ptr::null_mut(), || {
        rows_to_json(&handle.directory.current_directory(), handle.this_week_days)
    })
}

/// Record a completed call to `phone_number`.
///
/// # Safety
/// `handle` must be live; `phone_number` a valid string.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_record_call(
    handle: *mut SmartDialerHandle,
    phone_number: *const c_char,
) -> c_int {
    let (Some(handle), Some(number)) = (handle.as_ref(), borrow_str(phone_number)) else {
        return SMART_DIALER_INVALID_ARGUMENT;
    };

    guard(SMART_DIALER_INTERNAL_ERROR, || {
        match handle.runtime.block_on(handle.directory.record_call(number)) {
            Ok(_) => SMART_DIALER_OK,
            Err(DialerError::StoreUnavailable(_)) => SMART_DIALER_NOT_PERSISTED,
            Err(DialerError::SourceUnavailable(_)) => SMART_DIALER_INTERNAL_ERROR,
        }
    })
}

/// Push call statistics to disk, e.g. when the app moves to the background.
///
/// # Safety
/// `handle` must be live.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_flush(handle: *mut SmartDialerHandle) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return SMART_DIALER_INVALID_ARGUMENT;
    };

    guard(SMART_DIALER_INTERNAL_ERROR, || {
        match handle.runtime.block_on(handle.directory.flush()) {
            Ok(()) => SMART_DIALER_OK,
            Err(_) => SMART_DIALER_NOT_PERSISTED,
        }
    })
}

/// # Safety
/// `s` must be null or a string returned by this library.
#[no_mangle]
pub unsafe extern "C" fn smart_dialer_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}
