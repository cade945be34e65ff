//! Fault taxonomy
//!
//! Faults raised by the measurement manager or the stepper actuator are not
//! locally recoverable: they propagate to the mode controller, which forces
//! the mode back to idle and surfaces the fault to the host. No fault is
//! ever cleared automatically; a fresh host command is required to resume.

/// A fault condition detected downstream of the mode controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultCondition {
    /// Sensor bus read failed after all retry attempts
    SensorComm,
    /// Pulses issued without matching position progress - inferred loss of
    /// motor power (there is no direct power-sense feedback)
    MotorPower,
    /// Limit switch engaged mid-travel in the direction of motion
    LimitExceeded,
}

impl FaultCondition {
    /// Short wire code used in host status reports
    pub fn code(&self) -> &'static str {
        match self {
            FaultCondition::SensorComm => "SENSOR",
            FaultCondition::MotorPower => "POWER",
            FaultCondition::LimitExceeded => "LIMIT",
        }
    }
}
