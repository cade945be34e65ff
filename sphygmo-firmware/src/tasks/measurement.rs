//! Measurement manager task wrapper
//!
//! Owns the I2C bus to the HSC pressure sensor.

use defmt::*;
use embassy_rp::i2c::{Async, I2c};
use embassy_rp::peripherals::I2C1;

use sphygmo_core::tasks::{measurement_task as run, MeasurementLinks};
use sphygmo_drivers::sensor::Hsc;

use crate::channels::{
    CONFIG_REQUESTS, FAULTS, MODE_SELECT, READY_CONFIG, READY_WAVEFORM, SAMPLES,
    STEPPER_COMMANDS, STEPPER_OUTCOMES, WF_REQUESTS,
};

#[embassy_executor::task]
pub async fn measurement_task(i2c: I2c<'static, I2C1, Async>) -> ! {
    info!("Measurement manager task started");
    let sensor = Hsc::new(i2c);
    run(
        sensor,
        MeasurementLinks {
            mode_rx: MODE_SELECT.receiver(),
            config_rx: CONFIG_REQUESTS.receiver(),
            waveform_rx: WF_REQUESTS.receiver(),
            stepper_tx: STEPPER_COMMANDS.sender(),
            stepper_rx: STEPPER_OUTCOMES.receiver(),
            sample_tx: SAMPLES.sender(),
            ready_config_tx: READY_CONFIG.sender(),
            ready_waveform_tx: READY_WAVEFORM.sender(),
            fault_tx: FAULTS.sender(),
        },
    )
    .await
}
