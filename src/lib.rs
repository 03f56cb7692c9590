//! Scd30 CO2, temperature and humidity sensor driver
//!
//! This is a blocking driver built on the `embedded-hal` I2C and delay traits.
//! Every operation blocks for its bus transaction plus the settle delay the
//! device requires. A sensor instance is not re-entrant, callers sharing one
//! between threads must serialise access (ie. with a mutex).
//!
//! Copyright 2019 Ryan Kurte

#![cfg_attr(not(test), no_std)]

use core::fmt::{self, Debug};

extern crate embedded_hal;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

#[macro_use]
extern crate log;

pub mod base;
pub mod crc;
pub mod device;
pub mod frame;

use base::{Base, Protocol};
pub use device::{Command, Parameter, DEFAULT_ADDRESS};
use device::*;

/// Scd30 error object
#[derive(Debug)]
pub enum Error<ConnErr> {
    /// Underlying bus error
    Conn(ConnErr),
    /// CRC mismatch (computed, received)
    Crc(u8, u8),
    /// Argument out of range, nothing was sent to the device
    InvalidArgument(Parameter),
    /// Parameter readback is not supported by the configured device variant
    Unsupported(Parameter),
    /// Response of unexpected length
    Length(usize),
    /// No device responded
    NoDevice,
}

impl <ConnErr> From<ConnErr> for Error<ConnErr> {
    fn from(conn_err: ConnErr) -> Self {
        Error::Conn(conn_err)
    }
}

impl <ConnErr: Debug> fmt::Display for Error<ConnErr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Conn(e) => write!(f, "connection error: {:?}", e),
            Error::Crc(c, r) => write!(f, "CRC check failed (computed: {:02x} received: {:02x})", c, r),
            Error::InvalidArgument(p) => write!(f, "invalid {} value", p.name()),
            Error::Unsupported(p) => write!(f, "reading {} is not supported", p.name()),
            Error::Length(l) => write!(f, "unexpected response length: {}", l),
            Error::NoDevice => write!(f, "no device found"),
        }
    }
}

/// Scd30 measurement object
#[derive(PartialEq, Clone, Debug)]
pub struct Measurement {
    /// CO2 concentration in parts-per-million (PPM)
    /// Range: 0 - 10,000
    pub co2: f32,
    /// Temperature in degrees celsius
    /// Range: -40 - 125 C
    pub temp: f32,
    /// Relative Humidity (%)
    /// Range: 0 - 100
    pub rh: f32,
}

/// Device variant, determines which configuration registers can be read back
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Variant {
    /// All configuration parameters can be read back
    Full,
    /// Measurement interval and self calibration state cannot be read back
    WriteOnly,
}

/// Scd30 driver configuration
#[derive(PartialEq, Clone, Debug)]
pub struct Config {
    /// I2C address of the device
    pub address: u8,
    /// Ambient pressure compensation in mBar, 0 to disable
    pub ambient_pressure: u16,
    /// Continuous measurement interval in seconds
    pub measurement_interval: u16,
    /// Device variant
    pub variant: Variant,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDRESS,
            ambient_pressure: 0,
            measurement_interval: MEASUREMENT_INTERVAL_MIN,
            variant: Variant::Full,
        }
    }
}

/// Scd30 sensor object
/// This is generic over an I2C connector, delay provider and associated error type
pub struct Scd30<Conn, Delay, Err> {
    proto: Protocol<Conn, Delay, Err>,
    variant: Variant,
    last: Option<Measurement>,
}

fn check_ambient_pressure<Err>(pressure: u16) -> Result<(), Error<Err>> {
    if pressure != 0 && !(AMBIENT_PRESSURE_MIN..=AMBIENT_PRESSURE_MAX).contains(&pressure) {
        return Err(Error::InvalidArgument(Parameter::AmbientPressure));
    }
    Ok(())
}

fn check_measurement_interval<Err>(interval: u16) -> Result<(), Error<Err>> {
    if !(MEASUREMENT_INTERVAL_MIN..=MEASUREMENT_INTERVAL_MAX).contains(&interval) {
        return Err(Error::InvalidArgument(Parameter::MeasurementInterval));
    }
    Ok(())
}

impl <Conn, Delay, Err> Scd30<Conn, Delay, Err> where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    Delay: DelayMs<u16>,
    Err: Debug,
{
    /// Create a new Scd30 sensor instance with the default configuration
    pub fn new(conn: Conn, delay: Delay) -> Result<Self, Error<Err>> {
        Self::with_config(conn, delay, Config::default())
    }

    /// Create a new Scd30 sensor instance, checking communication then
    /// configuring and starting continuous measurement
    pub fn with_config(conn: Conn, delay: Delay, config: Config) -> Result<Self, Error<Err>> {
        // Validate configuration prior to touching the bus
        check_ambient_pressure(config.ambient_pressure)?;
        check_measurement_interval(config.measurement_interval)?;

        // Create sensor object
        let mut s = Self::connect(conn, delay, config.address, config.variant)?;

        s.set_measurement_interval(config.measurement_interval)?;
        s.start_continuous(config.ambient_pressure)?;

        // Return sensor
        Ok(s)
    }

    /// Create a new Scd30 sensor instance, checking communication without
    /// changing any device configuration
    pub fn connect(conn: Conn, delay: Delay, address: u8, variant: Variant) -> Result<Self, Error<Err>> {
        let mut s = Self::attach(conn, delay, address, variant);

        // Check communication
        let v = s.firmware_version()?;
        if v == 0x0000 || v == 0xFFFF {
            return Err(Error::NoDevice)
        }

        debug!("Found SCD30 firmware version: {}.{}", v >> 8, v & 0xFF);

        Ok(s)
    }

    /// Wrap a connection without probing or configuring the device
    pub fn attach(conn: Conn, delay: Delay, address: u8, variant: Variant) -> Self {
        Scd30{ proto: Protocol::new(conn, delay, address), variant, last: None }
    }

    /// Release the underlying connection and delay
    pub fn free(self) -> (Conn, Delay) {
        self.proto.free()
    }

    /// Read the device firmware version (major in the high byte, minor in the low byte)
    pub fn firmware_version(&mut self) -> Result<u16, Error<Err>> {
        self.proto.read_register(Command::GetFirmwareVersion)
    }

    /// Start continuous sensing mode with optional pressure compensation
    /// pressure_compensation should either be the current pressure in millibar or 0 to disable compensation
    pub fn start_continuous(&mut self, pressure_compensation: u16) -> Result<(), Error<Err>> {
        check_ambient_pressure(pressure_compensation)?;

        debug!("Setting ambient pressure: {} mBar", pressure_compensation);

        self.proto.send_command(Command::StartContinuousMode, Some(pressure_compensation))
    }

    /// Stop continuous sensing mode
    pub fn stop_continuous(&mut self) -> Result<(), Error<Err>> {
        self.proto.send_command(Command::StopContinuousMode, None)
    }

    /// Fetch the ambient pressure compensation in mBar (0 if disabled)
    pub fn ambient_pressure(&mut self) -> Result<u16, Error<Err>> {
        self.proto.read_register(Command::StartContinuousMode)
    }

    /// Set the ambient pressure compensation in mBar (700 - 1400, or 0 to disable)
    /// This (re)starts continuous measurement
    pub fn set_ambient_pressure(&mut self, pressure: u16) -> Result<(), Error<Err>> {
        self.start_continuous(pressure)
    }

    /// Fetch measurement interval in seconds
    pub fn measurement_interval(&mut self) -> Result<u16, Error<Err>> {
        if self.variant == Variant::WriteOnly {
            return Err(Error::Unsupported(Parameter::MeasurementInterval));
        }

        self.proto.read_register(Command::SetMeasurementInterval)
    }

    /// Configure measurement interval in seconds (2 - 1800)
    pub fn set_measurement_interval(&mut self, interval: u16) -> Result<(), Error<Err>> {
        check_measurement_interval(interval)?;

        debug!("Setting measurement interval: {} s", interval);

        self.proto.send_command(Command::SetMeasurementInterval, Some(interval))
    }

    /// Fetch whether Automatic Self-Calibration is enabled
    pub fn self_calibration_enabled(&mut self) -> Result<bool, Error<Err>> {
        if self.variant == Variant::WriteOnly {
            return Err(Error::Unsupported(Parameter::SelfCalibration));
        }

        let v = self.proto.read_register(Command::SetAsc)?;
        Ok(v == 1)
    }

    /// Enable or disable Automatic Self-Calibration
    pub fn set_self_calibration(&mut self, enabled: bool) -> Result<(), Error<Err>> {
        debug!("Setting self calibration: {}", enabled);

        self.proto.send_command(Command::SetAsc, Some(enabled as u16))?;

        // Give the device time to commit the mode
        if enabled {
            self.proto.delay_ms(ASC_ENABLE_DELAY_MS);
        }

        Ok(())
    }

    /// Fetch altitude compensation in meters above sea level
    pub fn altitude(&mut self) -> Result<u16, Error<Err>> {
        self.proto.read_register(Command::SetAltComp)
    }

    /// Set Altitude Compensation
    /// Allows compensation for CO2 measurement using altitude over sea level,
    /// fractional meters are truncated
    pub fn set_altitude(&mut self, altitude: f32) -> Result<(), Error<Err>> {
        if !(0.0..=u16::MAX as f32).contains(&altitude) {
            return Err(Error::InvalidArgument(Parameter::Altitude));
        }

        let altitude = altitude as u16;

        debug!("Setting altitude: {} m", altitude);

        self.proto.send_command(Command::SetAltComp, Some(altitude))
    }

    /// Fetch temperature offset in degrees celsius
    pub fn temperature_offset(&mut self) -> Result<f64, Error<Err>> {
        let raw = self.proto.read_register(Command::SetTempOffset)?;
        Ok(raw as f64 / 100.0)
    }

    /// Set Temperature Compensation
    /// Offset in degrees celsius (0 - 655.35), sent in truncated centidegrees
    pub fn set_temperature_offset(&mut self, offset: f64) -> Result<(), Error<Err>> {
        if !(0.0..=TEMPERATURE_OFFSET_MAX).contains(&offset) {
            return Err(Error::InvalidArgument(Parameter::TemperatureOffset));
        }

        let centidegrees = (offset * 100.0) as u16;

        debug!("Setting temperature offset: {} cC", centidegrees);

        self.proto.send_command(Command::SetTempOffset, Some(centidegrees))
    }

    /// Fetch the forced recalibration reference in ppm
    pub fn forced_recalibration_reference(&mut self) -> Result<u16, Error<Err>> {
        self.proto.read_register(Command::SetFrc)
    }

    /// Set Forced Recalibration Value
    /// This allows the sensor to be recalibrated using a reference CO2 source (400 - 2000 ppm)
    pub fn set_forced_recalibration_reference(&mut self, cal_ppm: u16) -> Result<(), Error<Err>> {
        debug!("Setting forced recalibration reference: {} ppm", cal_ppm);

        self.proto.send_command(Command::SetFrc, Some(cal_ppm))
    }

    /// Soft reset the underlying device
    /// Device configuration is reset, cached measurements are retained
    pub fn reset(&mut self) -> Result<(), Error<Err>> {
        self.proto.send_command(Command::SoftReset, None)?;

        // Not in the datasheet, but required to avoid IO errors after reset
        self.proto.delay_ms(RESET_DELAY_MS);

        Ok(())
    }

    /// Check whether measurement data is available in the buffer
    pub fn data_ready(&mut self) -> Result<bool, Error<Err>> {
        self.proto.data_ready()
    }

    /// Read measurement data from the buffer, updating the cached measurement
    pub fn read_data(&mut self) -> Result<Measurement, Error<Err>> {
        let m = self.proto.read_measurement()?;

        debug!("Measurement CO2: {:.2} ppm, Temperature: {:.2} C, Humidity: {:.2} %", m.co2, m.temp, m.rh);

        self.last = Some(m.clone());

        Ok(m)
    }

    /// Fetch the latest measurement, reading from the device if new data is ready
    /// Returns None until the first successful read
    pub fn measurement(&mut self) -> Result<Option<Measurement>, Error<Err>> {
        if self.data_ready()? {
            self.read_data()?;
        }

        Ok(self.last.clone())
    }

    /// Fetch the latest CO2 concentration in ppm
    pub fn co2(&mut self) -> Result<Option<f32>, Error<Err>> {
        Ok(self.measurement()?.map(|m| m.co2))
    }

    /// Fetch the latest temperature in degrees celsius
    pub fn temperature(&mut self) -> Result<Option<f32>, Error<Err>> {
        Ok(self.measurement()?.map(|m| m.temp))
    }

    /// Fetch the latest relative humidity in %
    pub fn relative_humidity(&mut self) -> Result<Option<f32>, Error<Err>> {
        Ok(self.measurement()?.map(|m| m.rh))
    }

    /// Cached measurement without any bus access
    pub fn cached(&self) -> Option<&Measurement> {
        self.last.as_ref()
    }
}
