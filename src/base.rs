//! Base communication implementation for interacting with Scd30 device
//!
//! Copyright 2019 Ryan Kurte

use core::fmt::Debug;
use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::{Error, Measurement};
use crate::device::*;
use crate::frame::{self, CommandFrame};

/// Base API for reading and writing to the device
/// This should not be required by consumers, but is exposed to support alternate use (or in future provide ModBus support)
///
/// Each call is a complete bus transaction including any trailing delay,
/// calls must not be interleaved on the same device.
pub trait Base<Err> {
    /// Write a command to the device with optional data
    fn send_command(&mut self, command: Command, data: Option<u16>) -> Result<(), Error<Err>>;
    /// Read a CRC-checked 16-bit register from the device
    fn read_register(&mut self, command: Command) -> Result<u16, Error<Err>>;
    /// Fetch and decode a measurement frame from the device buffer
    fn read_measurement(&mut self) -> Result<Measurement, Error<Err>>;

    /// Check whether measurement data is available in the buffer
    fn data_ready(&mut self) -> Result<bool, Error<Err>> {
        let v = self.read_register(Command::GetDataReady)?;
        Ok(v != 0)
    }
}

/// I2C register protocol, owns the bus connection and delay provider
pub struct Protocol<Conn, Delay, Err> {
    conn: Conn,
    delay: Delay,
    address: u8,
    _err: PhantomData<Err>,
}

impl <Conn, Delay, Err> Protocol<Conn, Delay, Err> where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    Delay: DelayMs<u16>,
    Err: Debug,
{
    /// Create a new protocol instance for the device at the provided address
    pub fn new(conn: Conn, delay: Delay, address: u8) -> Self {
        Protocol{ conn, delay, address, _err: PhantomData }
    }

    /// Device address in use
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Block for the provided number of milliseconds
    pub fn delay_ms(&mut self, ms: u16) {
        self.delay.delay_ms(ms)
    }

    /// Release the underlying connection and delay
    pub fn free(self) -> (Conn, Delay) {
        (self.conn, self.delay)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error<Err>> {
        trace!("Writing: {:02x?}", data);

        self.conn.write(self.address, data).map_err(Error::Conn)
    }

    fn read(&mut self, data: &mut [u8]) -> Result<(), Error<Err>> {
        self.conn.read(self.address, data).map_err(Error::Conn)?;

        trace!("Read data: {:02x?}", data);

        Ok(())
    }
}

/// Base implementation for I2C devices
impl <Conn, Delay, Err> Base<Err> for Protocol<Conn, Delay, Err> where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    Delay: DelayMs<u16>,
    Err: Debug,
{
    fn send_command(&mut self, command: Command, data: Option<u16>) -> Result<(), Error<Err>> {
        let f = CommandFrame::new(command, data);

        trace!("Sending command: {:?} data: {:?}", command, data);

        self.write(f.as_bytes())?;

        self.delay.delay_ms(COMMAND_DELAY_MS);

        Ok(())
    }

    fn read_register(&mut self, command: Command) -> Result<u16, Error<Err>> {
        let f = CommandFrame::new(command, None);

        // First write the read command
        self.write(f.as_bytes())?;

        // The device requires a stop between write and read (no repeated start),
        // so these are separate transactions with a delay between them
        self.delay.delay_ms(READ_DELAY_MS);

        // Then, read the data back
        let mut buff = [0u8; REGISTER_LEN];
        self.read(&mut buff)?;

        frame::decode_register(&buff)
    }

    fn read_measurement(&mut self) -> Result<Measurement, Error<Err>> {
        self.send_command(Command::ReadMeasurement, None)?;

        let mut buff = [0u8; MEASUREMENT_LEN];
        self.read(&mut buff)?;

        frame::decode_measurement(&buff)
    }
}
