//! Pressure sensor bus trait
//!
//! The wire protocol below the read operation is a driver concern; the core
//! sees one bounded async read returning raw counts.

/// One raw sensor transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    /// Raw pressure counts
    pub pressure_counts: u16,
    /// Die temperature counts, when the transfer included them
    pub temp_counts: Option<u16>,
}

/// Errors a sensor read can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus-level failure (NACK, timeout)
    Bus,
    /// Sensor answered but flagged the data stale or itself faulted
    Stale,
}

/// Async read access to the pressure sensor
///
/// Implementations must bound each read by the bus timeout; the measurement
/// manager layers its retry policy on top.
#[allow(async_fn_in_trait)]
pub trait PressureSensor {
    /// Read raw pressure counts (and temperature when available)
    async fn read(&mut self) -> Result<SensorReading, SensorError>;
}
