//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in sphygmo-core for the instrument's hardware:
//!
//! - Honeywell HSC digital pressure sensor (I2C)
//! - Gecko step/direction/enable stepper interface
//! - End-of-travel limit switch pair

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod sensor;
pub mod stepper;
