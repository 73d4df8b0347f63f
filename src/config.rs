// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;
use std::time::Duration;

/// Fixed 7 bit address of the HTU21D(F)
pub const HTU21DF_ADDRESS: u16 = 0x40;

/// Time the device needs after a soft reset, 15 ms per datasheet
pub const RESET_DELAY: Duration = Duration::from_millis(15);

/// Driver settings.
///
/// `Config::default()` opens `/dev/i2c-1` at 0x40, the same device
/// `Htu21df::new` uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// I2C character device
    pub bus: PathBuf,
    /// Slave address
    pub address: u16,
    /// Sleep after a soft reset, never shorter than [`RESET_DELAY`]
    pub reset_delay: Duration,
    /// How long a no-hold read keeps polling a NACKing device.
    /// Zero means a single attempt, a value too large for the clock
    /// (`Duration::MAX`) polls without deadline.
    pub read_timeout: Duration,
    /// Sleep between two read attempts
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus: PathBuf::from("/dev/i2c-1"),
            address: HTU21DF_ADDRESS,
            reset_delay: RESET_DELAY,
            read_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5),
        }
    }
}

impl Config {
    /// Sets the I2C character device.
    pub fn with_bus<P: Into<PathBuf>>(mut self, bus: P) -> Self {
        self.bus = bus.into();
        self
    }

    /// Sets the slave address.
    pub fn with_address(mut self, address: u16) -> Self {
        self.address = address;
        self
    }

    /// Values under the datasheet minimum are raised to it.
    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay.max(RESET_DELAY);
        self
    }

    /// Sets how long a read keeps polling.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the sleep between two read attempts.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
