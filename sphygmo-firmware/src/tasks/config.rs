//! Mode controller task wrapper

use defmt::*;
use embassy_time::Duration;

use sphygmo_core::tasks::{config_task as run, ConfigLinks};

use crate::channels::{
    CONFIG_REQUESTS, FAULTS, HOST_COMMANDS, MODE_SELECT, READY_CONFIG, STATUS_EVENTS,
    WF_COMMANDS, WF_STATUS,
};

/// Firmware version echoed in identification replies
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A non-idle mode survives this much host silence before the controller
/// parks itself (the host keeps the link warm with periodic `V` queries)
const HOST_LINK_TIMEOUT: Duration = Duration::from_secs(30);

#[embassy_executor::task]
pub async fn config_task() -> ! {
    info!("Mode controller task started");
    run(
        ConfigLinks {
            host_rx: HOST_COMMANDS.receiver(),
            fault_rx: FAULTS.receiver(),
            ready_rx: READY_CONFIG.receiver(),
            wf_status_rx: WF_STATUS.receiver(),
            mode_tx: MODE_SELECT.sender(),
            request_tx: CONFIG_REQUESTS.sender(),
            waveform_tx: WF_COMMANDS.sender(),
            status_tx: STATUS_EVENTS.sender(),
        },
        VERSION,
        HOST_LINK_TIMEOUT,
    )
    .await
}
