//! Small data-structure and time helpers.
//!
//! Provides:
//! - [`BoundedLog`] - capacity-bounded log used for histories
//! - [`now_millis`] - wall clock in Unix milliseconds

mod bounded;

pub use bounded::BoundedLog;

/// Current wall-clock time as Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
