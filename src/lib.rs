//! Segment membership service: segments, user memberships, an audit trail
//! and durable delayed removals over SQLite, served over HTTP.

pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod history;
pub mod membership;
pub mod queries;
pub mod registry;
pub mod schedule;
pub mod schema;
pub mod serve;
pub mod service;

pub use constants::EXPECTED_DB_VERSION;
pub use error::SegmentError;
pub use service::SegmentService;
