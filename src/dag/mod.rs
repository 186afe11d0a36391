// src/dag/mod.rs

//! Runnable units and dependency grouping.
//!
//! - [`unit`] defines [`RunnableUnit`] and [`Group`].
//! - [`grouping`] partitions units into groups so that every unit runs in
//!   the same group as, and after, the unit it depends on.

pub mod grouping;
pub mod unit;

pub use grouping::group_units;
pub use unit::{Group, RunnableUnit, UnitId};
