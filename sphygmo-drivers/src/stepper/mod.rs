//! Stepper interface drivers

pub mod gecko;

pub use gecko::{GeckoInterface, SwitchPair};
