//! Analysis modules.
//!
//! The aggregate functions live in [`aggregator`]; [`pipeline`] runs them
//! in order over a cleaned dataset and [`table`] turns the results into
//! named tables for presentation.

pub mod aggregator;
pub mod pipeline;
pub mod table;

pub use pipeline::Pipeline;
pub use table::{Aggregate, Table};
