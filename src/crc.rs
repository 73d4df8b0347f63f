// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! CRC-8 used by the HTU21D(F) to guard each 16 bit reading.
//!
//! The generator polynomial is x^8 + x^5 + x^4 + 1 (0x131). It is placed
//! at the top of a 24 bit word so that the 16 data bits and the 8 checksum
//! bits are divided in one pass, see the
//! [algorithm](https://en.wikipedia.org/wiki/Computation_of_cyclic_redundancy_checks).

/// Polynomial 0x131 shifted to the farthest left of three bytes.
const DIVISOR: u32 = 0x0098_8000;

/// Mask clearing the two status bits of a raw reading.
pub const STATUS_BITS_MASK: u16 = 0xFFFC;

/// Divides `(data << 8) | crc` by the polynomial and returns the remainder.
///
/// Zero means the checksum transmitted along `data` is valid.
/// With `crc == 0` the result is the checksum of `data`.
pub fn calc_crc(data: u16, crc: u8) -> u8 {
    let mut remainder = (u32::from(data) << 8) | u32::from(crc);
    let mut divisor = DIVISOR;

    // only the top 16 positions, the low 8 are the remainder
    for bit in (8..24).rev() {
        if remainder & (1 << bit) != 0 {
            remainder ^= divisor;
        }
        divisor >>= 1;
    }

    (remainder & 0xFF) as u8
}

/// Checksum byte the device sends for `data`.
pub fn crc8(data: u16) -> u8 {
    calc_crc(data, 0)
}

/// Clears the status bits, they are not part of the measurement.
pub fn strip_status_bits(raw: u16) -> u16 {
    raw & STATUS_BITS_MASK
}
