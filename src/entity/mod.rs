//! SeaORM entity definitions for PostgreSQL database.

pub mod competitor_report;
pub mod profile;
