// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! HTU21D(F) driver implementing the I2C humidity and temperature sensor operations
//!
//! Operations taken from the [datasheet](https://cdn-shop.adafruit.com/datasheets/1899_HTU21D.pdf)
//!
//! Every reading is guarded by a CRC-8, readings with a wrong checksum are
//! rejected and the last good raw values are kept. Measurements use the
//! no-hold mode: [`Htu21df::measure_temperature`] starts a conversion and
//! returns how long it takes, the caller decides what to do meanwhile.
//!
//! The library logs through the [`log`] facade, install any logger to see
//! register traffic (`debug`) and raw frames (`trace`).
//!
//! ## Basic Example
//!
//! Obtaining temperature and humidity
//!
//!
//!```no_run
//!use htu21df_i2c::Htu21df;
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() {
//!    // Open the I2C device
//!    let mut htu = Htu21df::new().unwrap();
//!    if let Err(e) = htu.begin() {
//!        println!("No HTU21D(F) found: {}", e);
//!        return;
//!    }
//!
//!    loop {
//!        match htu.get_measurements() {
//!            Ok((t, rh, compensated)) => {
//!                println!("Temp: {:.2} C RH: {:.1} % ({:.1} % compensated)", t, rh, compensated);
//!                thread::sleep(Duration::from_secs(2));
//!            }
//!            Err(e) => {
//!                println!(
//!                    "Error obtaining measurements. More details: {}. Waiting 10 seconds for recovering",
//!                    e
//!                );
//!                thread::sleep(Duration::from_secs(10));
//!            }
//!        }
//!    }
//!}
//!```
//!
//! ## Triggering and reading separately
//!
//!```no_run
//!use htu21df_i2c::{Config, Htu21df};
//!use std::thread;
//!
//!let config = Config::default().with_bus("/dev/i2c-0");
//!let mut htu = Htu21df::with_config(config).unwrap();
//!let wait = htu.measure_temperature().unwrap();
//!thread::sleep(wait);
//!match htu.read_raw_temperature() {
//!    Ok(raw) => println!("raw {:#06x}, {:.2} C", raw, htu.temperature()),
//!    Err(e) => println!("read failed: {}", e),
//!}
//!```

/// Opcodes and user register layout
pub mod command;
pub mod config;
/// Checksum and status bits of raw readings
pub mod crc;
pub mod error;
/// Driver implementing HTU21D(F) device related operations
pub mod htu21df;

pub use command::{Command, Resolution, UserRegister};
pub use config::Config;
pub use error::Htu21dfError;
pub use htu21df::Htu21df;
