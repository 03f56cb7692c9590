//! Scd30 command-line utility
//!
//! Copyright 2019 Ryan Kurte

use std::fmt::Debug;

extern crate embedded_hal;
use embedded_hal::blocking::{delay::DelayMs, i2c};

extern crate linux_embedded_hal;
use linux_embedded_hal::{Delay, I2cdev};

extern crate structopt;
use structopt::StructOpt;

extern crate humantime;
use humantime::{Duration as HumanDuration};

#[macro_use] extern crate log;
extern crate simplelog;
use simplelog::{TermLogger, LevelFilter};

extern crate sensor_scd30;
use sensor_scd30::{Scd30, Config, Variant, DEFAULT_ADDRESS};
use sensor_scd30::device::{MEASUREMENT_INTERVAL_MIN, MEASUREMENT_INTERVAL_MAX};

#[derive(StructOpt)]
#[structopt(name = "scd30-util")]
/// A Command Line Interface (CLI) for interacting with a local Scd30 environmental sensor over I2C
pub struct Options {

    /// Specify the i2c interface to use to connect to the scd30 device
    #[structopt(short="d", long = "i2c", default_value = "/dev/i2c-1", env = "SCD30_I2C")]
    i2c: String,

    /// Specify the i2c address of the scd30 device
    #[structopt(long = "address", parse(try_from_str = parse_address))]
    address: Option<u8>,

    /// Ambient pressure compensation in mBar (700 - 1400, 0 to disable)
    #[structopt(long = "ambient-pressure", default_value = "0")]
    ambient_pressure: u16,

    /// Device does not support reading back interval and self calibration state
    #[structopt(long = "write-only")]
    write_only: bool,

    #[structopt(subcommand)]
    command: Operation,

    /// Enable verbose logging
    #[structopt(long = "log-level", default_value = "info")]
    level: LevelFilter,
}

#[derive(StructOpt)]
pub enum Operation {
    #[structopt(name = "poll")]
    /// Poll the sensor for measurements
    Poll {
        /// Specify period for taking measurements
        #[structopt(short = "p", long = "sample-period", default_value="10s")]
        period: HumanDuration,

        /// Delay between sensor poll operations
        #[structopt(long = "poll-delay", default_value="100ms")]
        poll_delay: HumanDuration,

        /// Number of allowed I2C errors (per measurement attempt) prior to exiting
        #[structopt(long = "allowed-errors", default_value="3")]
        allowed_errors: usize,
    },

    #[structopt(name = "info")]
    /// Print firmware version and device configuration
    Info,

    #[structopt(name = "reset")]
    /// Soft reset the device
    Reset,
}

fn parse_address(s: &str) -> Result<u8, std::num::ParseIntError> {
    match s.trim_start_matches("0x") {
        v if v.len() != s.len() => u8::from_str_radix(v, 16),
        _ => s.parse(),
    }
}

fn main() {
    // Load options
    let opts = Options::from_args();

    // Setup logging
    TermLogger::init(opts.level, simplelog::Config::default()).unwrap();

    debug!("Connecting to I2C device");
    let i2c = match I2cdev::new(&opts.i2c) {
        Ok(v) => v,
        Err(e) => {
            error!("Error opening I2C device '{}': {:?}", &opts.i2c, e);
            std::process::exit(-1);
        }
    };

    let variant = match opts.write_only {
        true => Variant::WriteOnly,
        false => Variant::Full,
    };

    let address = opts.address.unwrap_or(DEFAULT_ADDRESS);

    match opts.command {
        Operation::Poll{period, poll_delay, allowed_errors} => {
            let interval = match interval_secs(&period) {
                Some(v) => v,
                None => {
                    error!("Sample period must be between 2s and 1800s (got {})", period);
                    std::process::exit(-2);
                }
            };

            let config = Config {
                address,
                ambient_pressure: opts.ambient_pressure,
                measurement_interval: interval,
                variant,
            };

            debug!("Connecting to SCD30 and starting continuous mode");
            let mut sensor = match Scd30::with_config(i2c, Delay, config) {
                Ok(v) => v,
                Err(e) => {
                    error!("Error connecting to SCD30: {}", e);
                    std::process::exit(-2);
                }
            };

            poll(&mut sensor, *period, *poll_delay, allowed_errors)
        },
        Operation::Info => {
            // Probe only, so the stored configuration is reported unchanged
            let mut sensor = connect(i2c, address, variant);
            info(&mut sensor);
        },
        Operation::Reset => {
            let mut sensor = connect(i2c, address, variant);
            if let Err(e) = sensor.reset() {
                error!("Error resetting device: {}", e);
                std::process::exit(-3);
            }
            info!("Device reset");
        },
    }
}

/// Convert a sample period into a measurement interval in whole seconds
fn interval_secs(period: &std::time::Duration) -> Option<u16> {
    let secs = u16::try_from(period.as_secs()).ok()?;
    match (MEASUREMENT_INTERVAL_MIN..=MEASUREMENT_INTERVAL_MAX).contains(&secs) {
        true => Some(secs),
        false => None,
    }
}

fn connect(i2c: I2cdev, address: u8, variant: Variant) -> Scd30<I2cdev, Delay, <I2cdev as i2c::Read>::Error> {
    debug!("Connecting to SCD30");
    match Scd30::connect(i2c, Delay, address, variant) {
        Ok(v) => v,
        Err(e) => {
            error!("Error connecting to SCD30: {}", e);
            std::process::exit(-2);
        }
    }
}

fn info<Conn, D, Err>(sensor: &mut Scd30<Conn, D, Err>) where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    D: DelayMs<u16>,
    Err: Debug,
{
    match sensor.firmware_version() {
        Ok(v) => info!("Firmware version: {}.{}", v >> 8, v & 0xFF),
        Err(e) => warn!("Error reading firmware version: {}", e),
    }

    match sensor.ambient_pressure() {
        Ok(v) => info!("Ambient pressure: {} mBar", v),
        Err(e) => warn!("Error reading ambient pressure: {}", e),
    }

    match sensor.measurement_interval() {
        Ok(v) => info!("Measurement interval: {} s", v),
        Err(e) => warn!("Error reading measurement interval: {}", e),
    }

    match sensor.self_calibration_enabled() {
        Ok(v) => info!("Self calibration enabled: {}", v),
        Err(e) => warn!("Error reading self calibration state: {}", e),
    }

    match sensor.altitude() {
        Ok(v) => info!("Altitude: {} m", v),
        Err(e) => warn!("Error reading altitude: {}", e),
    }

    match sensor.temperature_offset() {
        Ok(v) => info!("Temperature offset: {:.2} C", v),
        Err(e) => warn!("Error reading temperature offset: {}", e),
    }

    match sensor.forced_recalibration_reference() {
        Ok(v) => info!("Forced recalibration reference: {} ppm", v),
        Err(e) => warn!("Error reading forced recalibration reference: {}", e),
    }
}

fn poll<Conn, D, Err>(sensor: &mut Scd30<Conn, D, Err>, period: std::time::Duration, poll_delay: std::time::Duration, allowed_errors: usize) where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    D: DelayMs<u16>,
    Err: Debug,
{
    debug!("Waiting for sensor to initialise");
    std::thread::sleep(period);

    loop {
        debug!("Starting sensor read cycle");

        let mut ready = false;
        let mut errors = 0;

        // Poll for sensor ready
        for _i in 0..100 {
            match sensor.data_ready() {
                Ok(true) => {
                    ready = true;
                    break;
                },
                Ok(false) => {
                    std::thread::sleep(poll_delay);
                },
                Err(e) => {
                    warn!("Error polling for sensor ready: {}", e);
                    errors += 1;
                }
            };

            if errors > allowed_errors {
                error!("Exceeded maximum allowed I2C errors");
                std::process::exit(-4);
            }
        }

        debug!("Sensor data ready state: {:?}", ready);

        if !ready {
            warn!("Sensor data ready timed-out");
            std::thread::sleep(period);
            continue;
        }

        // If we're ready, attempt to read the data
        for _i in 0..10 {
            match sensor.read_data() {
                Ok(m) => {
                    info!("CO2: {:.2} ppm, Temperature: {:.2} C, Humidity: {:.2} %", m.co2, m.temp, m.rh);
                    break;
                },
                Err(e) => {
                    warn!("Error reading sensor data: {}", e);
                    errors += 1;
                },
            }

            if errors > allowed_errors {
                error!("Exceeded maximum allowed I2C errors");
                std::process::exit(-5);
            }
        }

        // Wait for enough time for another sensor reading
        std::thread::sleep(period);
    }
}
