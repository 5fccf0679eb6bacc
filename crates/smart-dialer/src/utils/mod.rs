//! Utilities module - text helpers shared by matching and ranking

pub mod text_utils;

pub use text_utils::TextUtils;
