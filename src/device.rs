//! Scd30 device definitions
//!
//! Copyright 2019 Ryan Kurte


/// Scd30 default I2C address
/// (note this is shifted left 1 bit on the wire)
pub const DEFAULT_ADDRESS: u8 = 0x61;

pub const CRC_POLY: u8 = 0x31;
pub const CRC_INIT: u8 = 0xff;
pub const CRC_XOR: u8 = 0x00;

/// Delay after any command write before the device accepts the next operation (min 3ms)
pub const COMMAND_DELAY_MS: u16 = 50;

/// Delay between the command write and the data read of a register read (min 3ms)
pub const READ_DELAY_MS: u16 = 5;

/// Extra delay for the device to commit automatic self calibration mode
pub const ASC_ENABLE_DELAY_MS: u16 = 10;

/// Delay for the device to reinitialise after a soft reset
pub const RESET_DELAY_MS: u16 = 100;

/// Length of a single register response (MSB, LSB, CRC)
pub const REGISTER_LEN: usize = 3;

/// Length of a full measurement response (3 x (MMSB, MLSB, CRC, LMSB, LLSB, CRC))
pub const MEASUREMENT_LEN: usize = 18;

/// Ambient pressure compensation limits in mBar (0 disables compensation)
pub const AMBIENT_PRESSURE_MIN: u16 = 700;
pub const AMBIENT_PRESSURE_MAX: u16 = 1400;

/// Continuous measurement interval limits in seconds
pub const MEASUREMENT_INTERVAL_MIN: u16 = 2;
pub const MEASUREMENT_INTERVAL_MAX: u16 = 1800;

/// Maximum temperature offset in degrees celsius (65535 centidegrees)
pub const TEMPERATURE_OFFSET_MAX: f64 = 655.35;

/// Scd30 I2C Command
/// Command and data are big endian 16-bit unsigned integers, all Command with data are followed by a CRC-8 checksum
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Command {
    /// Start continuous mode
    /// Data is a u16 representing pressure in mBar for compensation
    /// or zero for no pressure compensation
    StartContinuousMode = 0x0010,

    /// Stop continuous mode
    /// No associated data or CRC
    StopContinuousMode = 0x0104,

    /// Set interval for continuous measurement mode
    /// Data is a u16 in seconds between 2 and 1800
    SetMeasurementInterval = 0x4600,

    /// Fetch data ready status
    /// This returns 1 if data is available in the buffer, 0 otherwise
    GetDataReady = 0x0202,

    /// Read a measurement from the buffer
    ReadMeasurement = 0x0300,

    /// Enable or Disable Automatic Self Calibration (ASC)
    /// Data is a u16, 1 enables ASC and 0 disables ASC
    SetAsc = 0x5306,

    /// Set Forced Recalibration Value (FRC)
    /// This is used to compensate for sensor drift when a CO2 reference value is available
    /// Data is a u16 CO2 concentration in ppm
    SetFrc = 0x5204,

    /// Set temperature offset
    /// Data is a uint16 in degrees celsius * 100, ie. 4.3 degrees -> 430u16
    SetTempOffset = 0x5403,

    /// Set altitude compensation
    /// This allows NDIR CO2 sensing to be calibrated by altitude
    /// Data is uint16 in meters above sea level
    SetAltComp = 0x5102,

    /// Soft Reset the device
    /// No associated data or CRC
    SoftReset = 0xd304,

    /// Read the firmware version
    GetFirmwareVersion = 0xD100,
}

impl Command {
    /// Command word as sent on the wire
    pub fn word(self) -> u16 {
        self as u16
    }
}

/// Configuration parameters held in device firmware
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Parameter {
    AmbientPressure,
    MeasurementInterval,
    SelfCalibration,
    Altitude,
    TemperatureOffset,
    ForcedRecalibration,
}

impl Parameter {
    /// Human readable parameter name
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::AmbientPressure => "ambient pressure",
            Parameter::MeasurementInterval => "measurement interval",
            Parameter::SelfCalibration => "self calibration",
            Parameter::Altitude => "altitude",
            Parameter::TemperatureOffset => "temperature offset",
            Parameter::ForcedRecalibration => "forced recalibration reference",
        }
    }
}
