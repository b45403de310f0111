//! Countermeasure effectiveness measurements.

pub mod model;

pub use model::{Effectiveness, NewEffectiveness};
