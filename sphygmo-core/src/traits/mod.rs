//! Hardware abstraction traits
//!
//! These traits define the interface between the control core and
//! hardware-specific implementations. The stepper port and the sensor bus
//! are each owned exclusively by one task; no other task touches them.

pub mod sensor;
pub mod stepper;

pub use sensor::{PressureSensor, SensorError, SensorReading};
pub use stepper::{LimitSwitches, StepDirection, StepPort};
