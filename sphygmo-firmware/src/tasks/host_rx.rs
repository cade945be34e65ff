//! Host UART receive task
//!
//! Reads transport bytes, assembles command lines and feeds parsed commands
//! to the mode controller. Malformed lines are logged and dropped; the
//! command surface itself reports invalid-for-mode rejections.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use sphygmo_protocol::{parse_command, LineReader};

use crate::channels::HOST_COMMANDS;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Host RX task - receives and parses command lines
#[embassy_executor::task]
pub async fn host_rx_task(mut rx: BufferedUartRx) -> ! {
    info!("Host RX task started");

    let mut reader = LineReader::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                for &byte in &buf[..n] {
                    match reader.feed(byte) {
                        Ok(Some(line)) => match parse_command(&line) {
                            Ok(command) => {
                                trace!("Host command: {:?}", command);
                                HOST_COMMANDS.send(command).await;
                            }
                            Err(e) => warn!("Bad host command: {:?}", e),
                        },
                        Ok(None) => {}
                        Err(e) => warn!("Host line error: {:?}", e),
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!("UART read error: {:?}", e),
        }
    }
}
