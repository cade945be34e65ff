//! Pressure sensor drivers

pub mod hsc;

pub use hsc::{Hsc, HscError};
