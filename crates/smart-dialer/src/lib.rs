// smart-dialer/crates/smart-dialer/src/lib.rs

pub mod call_date;
pub mod config;
pub mod contact;
pub mod directory;
pub mod error;
pub mod keypad;
pub mod ordering;
pub mod ranker;
pub mod source;
pub mod statistics;
pub mod telemetry;
pub mod utils;

// Public API exports
pub use call_date::{format_call_date, format_call_date_local};
pub use config::DialerConfig;
pub use contact::{Contact, ContactRecord, PhoneEntry, PhoneNumber};
pub use directory::ContactDirectory;
pub use error::{DialerError, DialerResult};
pub use keypad::KeypadMatcher;
pub use ordering::RecencyPolicy;
pub use ranker::{rank, MatchTier};
pub use source::{ContactSource, JsonFileContactSource, StaticContactSource};
pub use statistics::{
    CallCounter, CallStatisticsStore, InMemoryCallStore, SqliteCallStore, StoreStats,
};
pub use telemetry::init_tracing;
