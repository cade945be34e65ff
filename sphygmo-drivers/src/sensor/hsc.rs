//! Honeywell HSC digital pressure sensor
//!
//! TruStability HSC series on I2C at address 0x28. Every transfer starts
//! with two status bits; pressure is 14 bits of which the calibrated range
//! spans 10%-90% (0x666..0x3999). A 4-byte read appends 11 bits of die
//! temperature.

use embedded_hal_async::i2c::I2c;

use sphygmo_core::pressure::HSC_I2C_ADDR;
use sphygmo_core::traits::{PressureSensor, SensorError, SensorReading};

/// Errors from an HSC transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HscError<E> {
    /// I2C bus failure
    Bus(E),
    /// Status bits flagged the data as stale (no fresh conversion since the
    /// last read)
    Stale,
    /// Status bits flagged command mode or a diagnostic fault
    Diagnostic,
}

/// Interpret the two status bits leading every transfer
fn check_status<E>(first_byte: u8) -> Result<(), HscError<E>> {
    match first_byte >> 6 {
        0b00 => Ok(()),
        0b10 => Err(HscError::Stale),
        _ => Err(HscError::Diagnostic),
    }
}

/// Assemble the 14-bit pressure counts from the first two bytes
fn pressure_counts(buf: &[u8]) -> u16 {
    ((buf[0] as u16 & 0x3F) << 8) | buf[1] as u16
}

/// Assemble the 11-bit temperature counts from the last two bytes
fn temperature_counts(buf: &[u8]) -> u16 {
    ((buf[2] as u16) << 3) | (buf[3] as u16 >> 5)
}

/// Honeywell HSC pressure sensor driver
pub struct Hsc<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Hsc<I2C> {
    /// Create a driver at the standard HSC address
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, HSC_I2C_ADDR)
    }

    /// Create a driver at a non-standard address
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Read raw pressure counts (2-byte transfer)
    pub async fn read_pressure(&mut self) -> Result<u16, HscError<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.i2c
            .read(self.address, &mut buf)
            .await
            .map_err(HscError::Bus)?;
        check_status(buf[0])?;
        Ok(pressure_counts(&buf))
    }

    /// Read raw pressure and die temperature counts (4-byte transfer)
    pub async fn read_pressure_temperature(
        &mut self,
    ) -> Result<(u16, u16), HscError<I2C::Error>> {
        let mut buf = [0u8; 4];
        self.i2c
            .read(self.address, &mut buf)
            .await
            .map_err(HscError::Bus)?;
        check_status(buf[0])?;
        Ok((pressure_counts(&buf), temperature_counts(&buf)))
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> PressureSensor for Hsc<I2C> {
    async fn read(&mut self) -> Result<SensorReading, SensorError> {
        match self.read_pressure_temperature().await {
            Ok((pressure, temp)) => Ok(SensorReading {
                pressure_counts: pressure,
                temp_counts: Some(temp),
            }),
            Err(HscError::Bus(_)) => Err(SensorError::Bus),
            Err(HscError::Stale) | Err(HscError::Diagnostic) => Err(SensorError::Stale),
        }
    }
}
