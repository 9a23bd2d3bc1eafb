//! Analysis of vehicle position snapshots.
//!
//! Two independent passes run over the same observation table: the speed
//! pass flags consecutive positions that imply speeding, and the punctuality
//! pass matches positions to nearby stops and compares them with the
//! timetable. Both are pure functions of their inputs and produce text
//! summaries through [`report`].

pub mod filter;
pub mod geo;
pub mod punctuality;
pub mod report;
pub mod speed;
pub mod timetable;
pub mod utility;
