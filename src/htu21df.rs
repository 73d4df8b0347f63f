// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use crate::command::{Command, Resolution, UserRegister};
use crate::config::{Config, RESET_DELAY};
use crate::crc::{calc_crc, strip_status_bits};
use crate::error::Htu21dfError;
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use log::{debug, trace, warn};
use std::thread;
use std::time::{Duration, Instant};

/// Maximum temperature conversion time at 14 bit resolution
pub const TEMPERATURE_LATENCY: Duration = Duration::from_millis(50);

/// Maximum humidity conversion time at 12 bit resolution
pub const HUMIDITY_LATENCY: Duration = Duration::from_millis(16);

/// Converts a raw temperature reading into degrees Celsius.
pub fn convert_temperature(raw: u16) -> f32 {
    f32::from(raw) * 175.72 / 65536.0 - 46.85
}

/// Converts a raw humidity reading into %RH.
pub fn convert_humidity(raw: u16) -> f32 {
    f32::from(raw) * 125.0 / 65536.0 - 6.0
}

/// Humidity accuracy is specified at 25 C, corrects `humidity`
/// measured at `temperature`.
pub fn compensate_humidity(humidity: f32, temperature: f32) -> f32 {
    humidity + (25.0 - temperature) * -0.15
}

/// HTU21D(F) Struct, wraps an I2C device
/// and keeps the last validated raw readings
///
pub struct Htu21df<T: I2CDevice> {
    pub i2cdev: T,
    config: Config,
    raw_temperature: u16,
    raw_humidity: u16,
}

impl Htu21df<LinuxI2CDevice> {
    /// Create a new HTU21D(F) Struct
    ///
    /// Tries to create the device on standard address 0x40 of /dev/i2c-1.
    /// If fails, return an LinuxI2CError from i2cdev
    ///
    pub fn new() -> Result<Htu21df<LinuxI2CDevice>, LinuxI2CError> {
        Self::with_config(Config::default())
    }

    /// Create the device on the bus and address given by `config`.
    pub fn with_config(config: Config) -> Result<Htu21df<LinuxI2CDevice>, LinuxI2CError> {
        let device = LinuxI2CDevice::new(&config.bus, config.address)?;
        debug!(
            "opened {} at address {:#04x}",
            config.bus.display(),
            config.address
        );
        Ok(Self::from_device(device, config))
    }
}

/// Implementation of HTU21D(F) related
/// operations
///
impl<T: I2CDevice> Htu21df<T> {
    /// Wraps an already opened I2C device.
    pub fn from_device(i2cdev: T, config: Config) -> Htu21df<T> {
        Htu21df {
            i2cdev,
            config,
            raw_temperature: 0,
            raw_humidity: 0,
        }
    }

    /// Settings the driver was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn send(&mut self, command: Command) -> Result<(), Htu21dfError<T::Error>> {
        trace!("sending {:?} ({:#04x})", command, command.opcode());
        self.i2cdev
            .write(&[command.opcode()])
            .map_err(Htu21dfError::Bus)
    }

    /// Soft reset the sensor device and wait until it is ready again.
    pub fn reset(&mut self) -> Result<(), Htu21dfError<T::Error>> {
        debug!("soft reset");
        self.send(Command::Reset)?;
        thread::sleep(self.config.reset_delay.max(RESET_DELAY));
        Ok(())
    }

    /// Resets the sensor and checks it answers like an HTU21D(F).
    ///
    /// After a reset the user register must read 0x02. Any other value
    /// means a different or broken device and is not worth retrying.
    pub fn begin(&mut self) -> Result<(), Htu21dfError<T::Error>> {
        self.reset()?;
        let reg = self.read_user_register()?;
        if reg != UserRegister::AFTER_RESET {
            warn!("user register after reset is {:#04x}, expected 0x02", reg.bits());
            return Err(Htu21dfError::UnexpectedUserRegister(reg.bits()));
        }
        Ok(())
    }

    /// True when the device answers a user register read, whatever the value.
    pub fn check(&mut self) -> bool {
        match self.read_user_register() {
            Ok(_) => true,
            Err(e) => {
                debug!("device check failed: {}", e);
                false
            }
        }
    }

    /// Reads the user register in one write and one single byte read.
    pub fn read_user_register(&mut self) -> Result<UserRegister, Htu21dfError<T::Error>> {
        self.send(Command::ReadRegister)?;
        let mut data_buffer: [u8; 1] = [0; 1];
        self.i2cdev
            .read(&mut data_buffer)
            .map_err(Htu21dfError::Bus)?;
        debug!("user register {:#04x}", data_buffer[0]);
        Ok(UserRegister(data_buffer[0]))
    }

    /// Writes the user register, the device does not acknowledge the value.
    pub fn write_user_register(&mut self, reg: UserRegister) -> Result<(), Htu21dfError<T::Error>> {
        debug!("writing user register {:#04x}", reg.bits());
        let buffer: [u8; 2] = [Command::WriteRegister.opcode(), reg.bits()];
        self.i2cdev.write(&buffer).map_err(Htu21dfError::Bus)
    }

    /// Changes the measurement resolution, reserved bits are kept.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Htu21dfError<T::Error>> {
        let reg = self.read_user_register()?;
        self.write_user_register(reg.with_resolution(resolution))
    }

    /// Turns the on-chip heater on or off.
    pub fn set_heater(&mut self, enabled: bool) -> Result<(), Htu21dfError<T::Error>> {
        let reg = self.read_user_register()?;
        self.write_user_register(reg.with_heater(enabled))
    }

    /// Triggers a no-hold temperature conversion.
    ///
    /// Returns how long to wait before [`Htu21df::read_raw_temperature`].
    pub fn measure_temperature(&mut self) -> Result<Duration, Htu21dfError<T::Error>> {
        self.send(Command::MeasureTemperature)?;
        Ok(TEMPERATURE_LATENCY)
    }

    /// Triggers a no-hold humidity conversion.
    ///
    /// Returns how long to wait before [`Htu21df::read_raw_humidity`].
    pub fn measure_humidity(&mut self) -> Result<Duration, Htu21dfError<T::Error>> {
        self.send(Command::MeasureHumidity)?;
        Ok(HUMIDITY_LATENCY)
    }

    /// Reads high byte, low byte and checksum.
    ///
    /// While converting the device NACKs, so failed reads are retried
    /// every poll interval until the read timeout elapses. A timeout too
    /// large to be added to the clock has no deadline.
    fn read_frame(&mut self) -> Result<[u8; 3], Htu21dfError<T::Error>> {
        let deadline = Instant::now().checked_add(self.config.read_timeout);
        let mut data_buffer: [u8; 3] = [0; 3];
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.i2cdev.read(&mut data_buffer) {
                Ok(()) => {
                    trace!("frame {:02x?} after {} attempt(s)", data_buffer, attempts);
                    return Ok(data_buffer);
                }
                Err(e) => {
                    if self.config.read_timeout.is_zero() {
                        return Err(Htu21dfError::Bus(e));
                    }
                    if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                        debug!("no reading after {} attempts, last error: {}", attempts, e);
                        return Err(Htu21dfError::Timeout);
                    }
                    trace!("read attempt {} failed: {}", attempts, e);
                    thread::sleep(self.config.poll_interval);
                }
            }
        }
    }

    fn read_raw(&mut self) -> Result<u16, Htu21dfError<T::Error>> {
        let data_buffer = self.read_frame()?;
        let raw = u16::from_be_bytes([data_buffer[0], data_buffer[1]]);
        if calc_crc(raw, data_buffer[2]) != 0 {
            warn!(
                "checksum mismatch for {:#06x}, received {:#04x}",
                raw, data_buffer[2]
            );
            return Err(Htu21dfError::Checksum);
        }
        Ok(strip_status_bits(raw))
    }

    /// Reads the temperature conversion started by
    /// [`Htu21df::measure_temperature`].
    ///
    /// On error the previous raw temperature is kept.
    pub fn read_raw_temperature(&mut self) -> Result<u16, Htu21dfError<T::Error>> {
        let raw = self.read_raw()?;
        self.raw_temperature = raw;
        Ok(raw)
    }

    /// Reads the humidity conversion started by
    /// [`Htu21df::measure_humidity`].
    ///
    /// On error the previous raw humidity is kept.
    pub fn read_raw_humidity(&mut self) -> Result<u16, Htu21dfError<T::Error>> {
        let raw = self.read_raw()?;
        self.raw_humidity = raw;
        Ok(raw)
    }

    /// Measures in hold master mode, the device stretches the clock
    /// until the temperature is ready.
    pub fn read_raw_temperature_hold(&mut self) -> Result<u16, Htu21dfError<T::Error>> {
        self.send(Command::MeasureTemperatureHold)?;
        self.read_raw_temperature()
    }

    /// Hold master counterpart of [`Htu21df::read_raw_humidity`].
    pub fn read_raw_humidity_hold(&mut self) -> Result<u16, Htu21dfError<T::Error>> {
        self.send(Command::MeasureHumidityHold)?;
        self.read_raw_humidity()
    }

    /// Last validated raw temperature, status bits cleared.
    pub fn raw_temperature(&self) -> u16 {
        self.raw_temperature
    }

    /// Last validated raw humidity, status bits cleared.
    pub fn raw_humidity(&self) -> u16 {
        self.raw_humidity
    }

    /// Last temperature in degrees Celsius.
    pub fn temperature(&self) -> f32 {
        convert_temperature(self.raw_temperature)
    }

    /// Last relative humidity in %RH.
    pub fn humidity(&self) -> f32 {
        convert_humidity(self.raw_humidity)
    }

    /// Last relative humidity corrected with the last temperature.
    pub fn compensated_humidity(&self) -> f32 {
        compensate_humidity(self.humidity(), self.temperature())
    }

    /// Triggers a temperature conversion, waits for it and returns degrees Celsius.
    pub fn read_temperature(&mut self) -> Result<f32, Htu21dfError<T::Error>> {
        let wait = self.measure_temperature()?;
        thread::sleep(wait);
        self.read_raw_temperature()?;
        Ok(self.temperature())
    }

    /// Triggers a humidity conversion, waits for it and returns %RH.
    pub fn read_humidity(&mut self) -> Result<f32, Htu21dfError<T::Error>> {
        let wait = self.measure_humidity()?;
        thread::sleep(wait);
        self.read_raw_humidity()?;
        Ok(self.humidity())
    }

    /// Get Temperature, Humidity and compensated Humidity as a f32 tuple.
    /// In case of any problem, returns the error.
    pub fn get_measurements(&mut self) -> Result<(f32, f32, f32), Htu21dfError<T::Error>> {
        let temperature = self.read_temperature()?;
        let humidity = self.read_humidity()?;
        Ok((temperature, humidity, self.compensated_humidity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc8;
    use std::collections::VecDeque;
    use std::io;

    /// Records writes and answers reads from a script.
    /// An exhausted script NACKs.
    struct FakeDevice {
        writes: Vec<Vec<u8>>,
        reads: VecDeque<Option<Vec<u8>>>,
    }

    impl FakeDevice {
        fn answering(reads: Vec<Option<Vec<u8>>>) -> FakeDevice {
            FakeDevice {
                writes: Vec::new(),
                reads: reads.into(),
            }
        }
    }

    fn nack() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "nack")
    }

    impl I2CDevice for FakeDevice {
        type Error = io::Error;

        fn read(&mut self, data: &mut [u8]) -> Result<(), io::Error> {
            match self.reads.pop_front() {
                Some(Some(bytes)) if bytes.len() >= data.len() => {
                    data.copy_from_slice(&bytes[..data.len()]);
                    Ok(())
                }
                Some(Some(_)) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short read")),
                _ => Err(nack()),
            }
        }

        fn write(&mut self, data: &[u8]) -> Result<(), io::Error> {
            self.writes.push(data.to_vec());
            Ok(())
        }

        fn smbus_write_quick(&mut self, _bit: bool) -> Result<(), io::Error> {
            Err(nack())
        }

        fn smbus_read_block_data(&mut self, _register: u8) -> Result<Vec<u8>, io::Error> {
            Err(nack())
        }

        fn smbus_read_i2c_block_data(
            &mut self,
            _register: u8,
            _len: u8,
        ) -> Result<Vec<u8>, io::Error> {
            Err(nack())
        }

        fn smbus_write_block_data(&mut self, _register: u8, _values: &[u8]) -> Result<(), io::Error> {
            Err(nack())
        }

        fn smbus_write_i2c_block_data(
            &mut self,
            _register: u8,
            _values: &[u8],
        ) -> Result<(), io::Error> {
            Err(nack())
        }

        fn smbus_process_block(
            &mut self,
            _register: u8,
            _values: &[u8],
        ) -> Result<Vec<u8>, io::Error> {
            Err(nack())
        }
    }

    fn frame(raw: u16) -> Option<Vec<u8>> {
        let [high, low] = raw.to_be_bytes();
        Some(vec![high, low, crc8(raw)])
    }

    fn single_attempt() -> Config {
        Config::default().with_read_timeout(Duration::ZERO)
    }

    fn driver(reads: Vec<Option<Vec<u8>>>, config: Config) -> Htu21df<FakeDevice> {
        Htu21df::from_device(FakeDevice::answering(reads), config)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn begin_accepts_register_after_reset() {
        let mut htu = driver(vec![Some(vec![0x02])], Config::default());
        assert!(htu.begin().is_ok());
        assert_eq!(htu.i2cdev.writes, vec![vec![0xFE], vec![0xE7]]);
    }

    #[test]
    fn begin_rejects_other_register_values() {
        for value in [0x00, 0x03, 0x3A, 0x82, 0xFF] {
            let mut htu = driver(vec![Some(vec![value])], Config::default());
            match htu.begin() {
                Err(Htu21dfError::UnexpectedUserRegister(reg)) => assert_eq!(reg, value),
                other => panic!("unexpected result {:?}", other),
            }
        }
    }

    #[test]
    fn begin_reports_bus_failure() {
        let mut htu = driver(vec![], Config::default());
        assert!(matches!(htu.begin(), Err(Htu21dfError::Bus(_))));
    }

    #[test]
    fn check_ignores_register_value() {
        let mut htu = driver(vec![Some(vec![0x3A])], Config::default());
        assert!(htu.check());
        // nothing left to answer
        assert!(!htu.check());
        assert_eq!(htu.i2cdev.writes, vec![vec![0xE7], vec![0xE7]]);
    }

    #[test]
    fn reset_waits_at_least_settle_time() {
        let config = Config {
            reset_delay: Duration::ZERO,
            ..Config::default()
        };
        let mut htu = driver(vec![], config);
        let started = Instant::now();
        htu.reset().unwrap();
        assert!(started.elapsed() >= RESET_DELAY);
        assert_eq!(htu.i2cdev.writes, vec![vec![0xFE]]);
    }

    #[test]
    fn write_user_register_is_one_transaction() {
        let mut htu = driver(vec![], Config::default());
        htu.write_user_register(UserRegister(0x83)).unwrap();
        assert_eq!(htu.i2cdev.writes, vec![vec![0xE6, 0x83]]);
    }

    #[test]
    fn set_resolution_read_modify_write() {
        let mut htu = driver(vec![Some(vec![0b0011_1010])], Config::default());
        htu.set_resolution(Resolution::Rh11Temp11).unwrap();
        assert_eq!(
            htu.i2cdev.writes,
            vec![vec![0xE7], vec![0xE6, 0b1011_1011]]
        );
    }

    #[test]
    fn set_heater_read_modify_write() {
        let mut htu = driver(vec![Some(vec![0x02])], Config::default());
        htu.set_heater(true).unwrap();
        assert_eq!(htu.i2cdev.writes, vec![vec![0xE7], vec![0xE6, 0x06]]);
    }

    #[test]
    fn measure_returns_conversion_time() {
        let mut htu = driver(vec![], Config::default());
        assert_eq!(htu.measure_temperature().unwrap(), Duration::from_millis(50));
        assert_eq!(htu.measure_humidity().unwrap(), Duration::from_millis(16));
        assert_eq!(htu.i2cdev.writes, vec![vec![0xF3], vec![0xF5]]);
    }

    #[test]
    fn raw_temperature_is_stored_without_status_bits() {
        let mut htu = driver(vec![frame(0x683A)], single_attempt());
        assert_eq!(htu.read_raw_temperature().unwrap(), 0x6838);
        assert_eq!(htu.raw_temperature(), 0x6838);
        assert_eq!(htu.raw_humidity(), 0);
        assert!(close(htu.temperature(), 24.6864));
    }

    #[test]
    fn raw_humidity_is_stored_without_status_bits() {
        let mut htu = driver(vec![frame(0x4E85)], single_attempt());
        assert_eq!(htu.read_raw_humidity().unwrap(), 0x4E84);
        assert_eq!(htu.raw_humidity(), 0x4E84);
        assert!(close(htu.humidity(), 32.3377));
    }

    #[test]
    fn checksum_mismatch_keeps_previous_reading() {
        let mut htu = driver(vec![Some(vec![0x68, 0x3A, 0x7D])], single_attempt());
        htu.raw_temperature = 1234;
        assert!(matches!(
            htu.read_raw_temperature(),
            Err(Htu21dfError::Checksum)
        ));
        assert_eq!(htu.raw_temperature(), 1234);
    }

    #[test]
    fn short_read_keeps_previous_reading() {
        let mut htu = driver(vec![Some(vec![0x68])], single_attempt());
        htu.raw_temperature = 1234;
        assert!(matches!(
            htu.read_raw_temperature(),
            Err(Htu21dfError::Bus(_))
        ));
        assert_eq!(htu.raw_temperature(), 1234);
    }

    #[test]
    fn read_polls_until_conversion_done() {
        let config = Config::default()
            .with_read_timeout(Duration::from_millis(500))
            .with_poll_interval(Duration::from_millis(1));
        let mut htu = driver(vec![None, None, frame(0x7C80)], config);
        assert_eq!(htu.read_raw_humidity().unwrap(), 0x7C80);
        assert!(htu.i2cdev.reads.is_empty());
    }

    #[test]
    fn read_times_out_on_silent_device() {
        let config = Config::default()
            .with_read_timeout(Duration::from_millis(5))
            .with_poll_interval(Duration::from_millis(1));
        let mut htu = driver(vec![], config);
        htu.raw_humidity = 4321;
        assert!(matches!(htu.read_raw_humidity(), Err(Htu21dfError::Timeout)));
        assert_eq!(htu.raw_humidity(), 4321);
    }

    #[test]
    fn unbounded_read_timeout_keeps_polling() {
        let config = Config::default()
            .with_read_timeout(Duration::MAX)
            .with_poll_interval(Duration::from_millis(1));
        let mut htu = driver(vec![None, None, None, frame(0x683A)], config);
        assert_eq!(htu.read_raw_temperature().unwrap(), 0x6838);
        assert!(htu.i2cdev.reads.is_empty());
    }

    #[test]
    fn hold_mode_uses_hold_opcodes() {
        let mut htu = driver(vec![frame(0x683A), frame(0x4E85)], single_attempt());
        assert_eq!(htu.read_raw_temperature_hold().unwrap(), 0x6838);
        assert_eq!(htu.read_raw_humidity_hold().unwrap(), 0x4E84);
        assert_eq!(htu.i2cdev.writes, vec![vec![0xE3], vec![0xE5]]);
    }

    #[test]
    fn conversion_end_points() {
        assert!(close(convert_temperature(0), -46.85));
        assert!(close(convert_humidity(0), -6.0));
        assert!(close(convert_temperature(0x8000), 41.01));
        assert!(close(convert_humidity(0x8000), 56.5));
        // 65536 would give 128.87 C and 119 %RH
        assert!(close(convert_temperature(0xFFFC), 128.87 - 4.0 * 175.72 / 65536.0));
        assert!(close(convert_humidity(0xFFFC), 119.0 - 4.0 * 125.0 / 65536.0));
    }

    #[test]
    fn conversion_is_linear() {
        let step = convert_temperature(0x4000) - convert_temperature(0);
        assert!(close(convert_temperature(0x8000) - convert_temperature(0x4000), step));
        let step = convert_humidity(0x4000) - convert_humidity(0);
        assert!(close(convert_humidity(0xC000) - convert_humidity(0x8000), step));
    }

    #[test]
    fn compensation_is_neutral_at_25_degrees() {
        assert!(close(compensate_humidity(40.0, 25.0), 40.0));
        assert!(close(compensate_humidity(40.0, 35.0), 41.5));
        assert!(close(compensate_humidity(40.0, 15.0), 38.5));
    }

    #[test]
    fn get_measurements_runs_both_conversions() {
        let mut htu = driver(vec![frame(0x683A), frame(0x7C80)], single_attempt());
        let (temperature, humidity, compensated) = htu.get_measurements().unwrap();
        assert!(close(temperature, 24.6864));
        assert!(close(humidity, 54.7910));
        assert!(close(compensated, compensate_humidity(humidity, temperature)));
        assert_eq!(htu.i2cdev.writes, vec![vec![0xF3], vec![0xF5]]);
    }
}
