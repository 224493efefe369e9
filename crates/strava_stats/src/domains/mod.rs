//! Domain modules for business logic encapsulation.
//!
//! # Modules
//!
//! - [`climbs`]: running tally of activities and climb segments, finalized into a summary

pub mod climbs;

pub use climbs::{Averages, ClimbTally, MaxGradePolicy, SegmentRecord, Summary};
