//! Fiscal-year planning computations shared by the loader and the command line
//!
//! Dates and fiscal years, monthly allocations and their validation,
//! target distribution and progress summaries

pub mod allocation;
pub mod date;
pub mod distribute;
pub mod error;
pub mod fiscal;
pub mod month;
pub mod plan;
pub mod progress;
pub mod range;
