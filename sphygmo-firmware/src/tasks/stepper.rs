//! Stepper actuator task wrapper
//!
//! Owns the Gecko drive pins and the limit switch inputs.

use defmt::*;
use embassy_rp::gpio::{Input, Output};

use sphygmo_core::tasks::{stepper_task as run, StepperLinks};
use sphygmo_drivers::stepper::{GeckoInterface, SwitchPair};

use crate::channels::{STEPPER_COMMANDS, STEPPER_OUTCOMES};

#[embassy_executor::task]
pub async fn stepper_task(
    port: GeckoInterface<Output<'static>, Output<'static>, Output<'static>>,
    limits: SwitchPair<Input<'static>, Input<'static>>,
) -> ! {
    info!("Stepper actuator task started");
    run(
        port,
        limits,
        StepperLinks {
            command_rx: STEPPER_COMMANDS.receiver(),
            outcome_tx: STEPPER_OUTCOMES.sender(),
        },
    )
    .await
}
