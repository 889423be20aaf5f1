//! Data models for scrollharvest.

mod record;

pub use record::{Availability, Record};
