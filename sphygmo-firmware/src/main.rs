//! Sphygmo - Pressure Waveform Generator Firmware
//!
//! Main firmware binary for RP2040-based controller boards. Drives a
//! stepper-actuated piston/cuff against a Honeywell HSC pressure sensor to
//! replay physiological pressure waveforms for blood-pressure monitor
//! calibration.
//!
//! Named after the Greek "sphygmos" (σφυγμός) meaning "pulse".

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{Config as I2cConfig, I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{I2C1, UART0};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use sphygmo_drivers::stepper::{GeckoInterface, SwitchPair};

mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    I2C1_IRQ => I2cInterruptHandler<I2C1>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Sphygmo firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Host link over UART0 (virtual serial bridge on GPIO0/GPIO1)
    let uart_config = UartConfig::default(); // 115200 baud default
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("Host UART initialized");

    // HSC pressure sensor on I2C1 (SDA=GPIO2, SCL=GPIO3)
    let i2c = I2c::new_async(p.I2C1, p.PIN_3, p.PIN_2, Irqs, I2cConfig::default());
    info!("Sensor bus initialized");

    // Gecko stepper drive: STEP=GPIO11, DIR=GPIO10, DISABLE=GPIO12
    let gecko = GeckoInterface::new(
        Output::new(p.PIN_11, Level::Low),
        Output::new(p.PIN_10, Level::Low),
        Output::new(p.PIN_12, Level::High),
    );

    // Limit switches: normally open to ground, pull-ups enabled
    // (NEAR=GPIO14, FAR=GPIO15)
    let limits = SwitchPair::new(
        Input::new(p.PIN_14, Pull::Up),
        Input::new(p.PIN_15, Pull::Up),
    );
    info!("Actuator pins initialized");

    // Spawn the pipeline
    spawner.spawn(tasks::host_rx_task(rx)).unwrap();
    spawner.spawn(tasks::reporter_task(tx)).unwrap();
    spawner.spawn(tasks::config_task()).unwrap();
    spawner.spawn(tasks::waveform_task()).unwrap();
    spawner.spawn(tasks::measurement_task(i2c)).unwrap();
    spawner.spawn(tasks::stepper_task(gecko, limits)).unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
