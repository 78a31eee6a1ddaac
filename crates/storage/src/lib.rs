//! SQLite-backed append-only store for impressions and survey results.
//!
//! Implements the recorder contracts from `survey-core`. Both tables are
//! insert-only; nothing in the service updates or deletes rows. The
//! connection sits behind a mutex because every write is a single short
//! INSERT and the recorders are called outside any rotation lock.

pub mod store;

pub use store::SurveyStore;
