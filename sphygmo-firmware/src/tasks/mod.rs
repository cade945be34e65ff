//! Embassy task wrappers
//!
//! Thin `#[embassy_executor::task]` shells that bind the generic task
//! functions from sphygmo-core to this board's concrete hardware types and
//! the static channels.

mod config;
mod host_rx;
mod measurement;
mod reporter;
mod stepper;
mod waveform;

pub use config::config_task;
pub use host_rx::host_rx_task;
pub use measurement::measurement_task;
pub use reporter::reporter_task;
pub use stepper::stepper_task;
pub use waveform::waveform_task;
