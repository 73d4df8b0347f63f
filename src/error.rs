// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error;
use std::fmt;

///
///HTU21D(F) error enum, generic over the error type
///of the I2C device.
///Bus and Timeout are transport errors.
///Checksum when the crc 8 of a reading does not match.
///UnexpectedUserRegister when the device is not an HTU21D(F).
///
#[derive(Debug)]
pub enum Htu21dfError<E> {
    /// Error reported by the underlying I2C device
    Bus(E),
    /// The device did not deliver a reading before the read timeout
    Timeout,
    /// ChecksumError when the transmitted checksum does not correspond to calculated checksum
    Checksum,
    /// User register after reset holds something else than the expected 0x02
    UnexpectedUserRegister(u8),
}

impl<E> Htu21dfError<E> {
    /// Transport and integrity errors go away by repeating the
    /// measurement, a wrong device does not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Htu21dfError::UnexpectedUserRegister(_))
    }
}

///Implementation of display for Htu21dfError
impl<E: fmt::Display> fmt::Display for Htu21dfError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Htu21dfError::Bus(ref e) => write!(f, "I2C bus error: {}", e),
            Htu21dfError::Timeout => fmt::Display::fmt("Timed out waiting for a reading", f),
            Htu21dfError::Checksum => fmt::Display::fmt("Checksum Error found", f),
            Htu21dfError::UnexpectedUserRegister(reg) => {
                write!(f, "Unexpected user register {:#04x} after reset", reg)
            }
        }
    }
}

///Implementation for Error to Htu21dfError
impl<E: Error + 'static> Error for Htu21dfError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            Htu21dfError::Bus(ref e) => Some(e),
            _ => None,
        }
    }
}
