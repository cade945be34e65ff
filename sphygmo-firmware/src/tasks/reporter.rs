//! Data reporter task
//!
//! Thin transport shim: serializes pressure samples and status events into
//! report lines and writes them to the host UART. Samples get a running
//! sequence number.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use sphygmo_protocol::{encode_sample, encode_status};

use crate::channels::{SAMPLES, STATUS_EVENTS};

/// Data reporter task - streams samples and status to the host
#[embassy_executor::task]
pub async fn reporter_task(mut tx: BufferedUartTx) -> ! {
    info!("Data reporter task started");

    let mut seq: u32 = 0;

    loop {
        let line = match select(SAMPLES.receive(), STATUS_EVENTS.receive()).await {
            Either::First(sample) => {
                seq = seq.wrapping_add(1);
                encode_sample(seq, &sample)
            }
            Either::Second(event) => {
                debug!("Status: {:?}", event);
                encode_status(&event)
            }
        };

        if let Err(e) = tx.write_all(line.as_bytes()).await {
            warn!("UART write error: {:?}", e);
        }
    }
}
