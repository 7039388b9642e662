//! API test suite.
//!
//! Runs the HTTP surface against the in-memory store and a mock workflow
//! engine; no database is needed.
//!
//! Run with: cargo test --test api

mod mock_workflow;
mod test_helpers;

mod test_reports;
mod test_tracking;
