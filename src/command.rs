// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Command opcodes and the user register of the HTU21D(F).

/// Commands understood by the HTU21D(F).
///
/// Hold variants keep the bus (clock stretching) until the conversion
/// is done, the others release it and NACK reads until then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Trigger temperature measurement, hold master
    MeasureTemperatureHold,
    /// Trigger humidity measurement, hold master
    MeasureHumidityHold,
    /// Trigger temperature measurement, no hold master
    MeasureTemperature,
    /// Trigger humidity measurement, no hold master
    MeasureHumidity,
    /// Write user register
    WriteRegister,
    /// Read user register
    ReadRegister,
    /// Soft reset
    Reset,
}

impl Command {
    /// Wire byte of the command.
    pub const fn opcode(self) -> u8 {
        match self {
            Command::MeasureTemperatureHold => 0xE3,
            Command::MeasureHumidityHold => 0xE5,
            Command::MeasureTemperature => 0xF3,
            Command::MeasureHumidity => 0xF5,
            Command::WriteRegister => 0xE6,
            Command::ReadRegister => 0xE7,
            Command::Reset => 0xFE,
        }
    }
}

/// Measurement resolution, selected by bits 7 and 0 of the user register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 12 bit humidity, 14 bit temperature (power-on default)
    Rh12Temp14,
    /// 8 bit humidity, 12 bit temperature
    Rh8Temp12,
    /// 10 bit humidity, 13 bit temperature
    Rh10Temp13,
    /// 11 bit humidity, 11 bit temperature
    Rh11Temp11,
}

impl Resolution {
    const MASK: u8 = 0b1000_0001;

    fn bits(self) -> u8 {
        match self {
            Resolution::Rh12Temp14 => 0b0000_0000,
            Resolution::Rh8Temp12 => 0b0000_0001,
            Resolution::Rh10Temp13 => 0b1000_0000,
            Resolution::Rh11Temp11 => 0b1000_0001,
        }
    }

    fn from_bits(bits: u8) -> Resolution {
        match bits & Resolution::MASK {
            0b0000_0001 => Resolution::Rh8Temp12,
            0b1000_0000 => Resolution::Rh10Temp13,
            0b1000_0001 => Resolution::Rh11Temp11,
            _ => Resolution::Rh12Temp14,
        }
    }
}

/// Content of the user register.
///
/// Bits 3 to 5 are reserved, setters leave them untouched so a
/// read-modify-write keeps whatever the device reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRegister(pub u8);

impl UserRegister {
    /// OTP reload disabled, the only bit set after a soft reset.
    pub const DISABLE_OTP: u8 = 0b0000_0010;
    const HEATER: u8 = 0b0000_0100;
    const END_OF_BATTERY: u8 = 0b0100_0000;

    /// Value the register holds right after a reset
    pub const AFTER_RESET: UserRegister = UserRegister(UserRegister::DISABLE_OTP);

    /// Raw register byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Resolution selected by bits 7 and 0.
    pub fn resolution(self) -> Resolution {
        Resolution::from_bits(self.0)
    }

    /// Supply voltage dropped under 2.25 V.
    pub fn end_of_battery(self) -> bool {
        self.0 & UserRegister::END_OF_BATTERY != 0
    }

    /// On-chip heater is on.
    pub fn heater_enabled(self) -> bool {
        self.0 & UserRegister::HEATER != 0
    }

    /// OTP reload is disabled, set after every reset.
    pub fn otp_reload_disabled(self) -> bool {
        self.0 & UserRegister::DISABLE_OTP != 0
    }

    /// Same register with another resolution.
    pub fn with_resolution(self, resolution: Resolution) -> UserRegister {
        UserRegister((self.0 & !Resolution::MASK) | resolution.bits())
    }

    /// Same register with the heater switched on or off.
    pub fn with_heater(self, enabled: bool) -> UserRegister {
        if enabled {
            UserRegister(self.0 | UserRegister::HEATER)
        } else {
            UserRegister(self.0 & !UserRegister::HEATER)
        }
    }
}
