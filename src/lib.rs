//! Competitor report server library.
//!
//! Accepts requests for competitor LinkedIn engagement reports, hands them to
//! an external workflow, and follows each report until the result spreadsheet
//! is ready or the wait times out.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
