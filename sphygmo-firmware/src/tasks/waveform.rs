//! Waveform synthesizer task wrapper

use defmt::*;

use sphygmo_core::tasks::{waveform_task as run, WaveformLinks};

use crate::channels::{READY_WAVEFORM, WF_COMMANDS, WF_REQUESTS, WF_STATUS};

#[embassy_executor::task]
pub async fn waveform_task() -> ! {
    info!("Waveform synthesizer task started");
    run(WaveformLinks {
        command_rx: WF_COMMANDS.receiver(),
        ready_rx: READY_WAVEFORM.receiver(),
        request_tx: WF_REQUESTS.sender(),
        status_tx: WF_STATUS.sender(),
    })
    .await
}
