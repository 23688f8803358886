//! Incremental instruction decoder for captured microprocessor bus traces.

#![warn(missing_docs)]

pub mod capture;
pub mod dis;
pub mod list;
