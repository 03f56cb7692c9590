//! Encoding of command frames and decoding of device responses
//!
//! Copyright 2019 Ryan Kurte

use crate::crc::{crc8, crc8_check};
use crate::device::{Command, MEASUREMENT_LEN, REGISTER_LEN};
use crate::{Error, Measurement};

/// Maximum command frame length (command, argument, argument CRC)
pub const COMMAND_MAX_LEN: usize = 5;

/// Encoded command with optional argument, ready to be written to the bus
#[derive(PartialEq, Clone, Debug)]
pub struct CommandFrame {
    buff: [u8; COMMAND_MAX_LEN],
    len: usize,
}

impl CommandFrame {
    /// Encode a command word with an optional argument
    pub fn new(command: Command, data: Option<u16>) -> Self {
        let c = command.word();

        let mut buff: [u8; COMMAND_MAX_LEN] = [
            (c >> 8) as u8,
            (c & 0xFF) as u8,
            0,
            0,
            0,
        ];

        let len = match data {
            Some(d) => {
                buff[2] = (d >> 8) as u8;
                buff[3] = (d & 0xFF) as u8;
                buff[4] = crc8(&buff[2..4]);
                5
            },
            None => 2,
        };

        CommandFrame{ buff, len }
    }

    /// Bytes to be written
    pub fn as_bytes(&self) -> &[u8] {
        &self.buff[..self.len]
    }
}

/// Check a single (MSB, LSB, CRC) word and return its data bytes
fn checked_word<E>(word: &[u8]) -> Result<[u8; 2], Error<E>> {
    if !crc8_check(&word[0..2], word[2]) {
        let crc = crc8(&word[0..2]);
        warn!("CRC mismatch (computed: {:02x} received: {:02x})", crc, word[2]);
        return Err(Error::Crc(crc, word[2]));
    }

    Ok([word[0], word[1]])
}

/// Decode a 3-byte register response into a u16
pub fn decode_register<E>(buff: &[u8; REGISTER_LEN]) -> Result<u16, Error<E>> {
    let w = checked_word(&buff[..])?;
    Ok(u16::from_be_bytes(w))
}

/// Convert from a 6-byte response line into an F32 value
pub fn decode_float<E>(line: &[u8]) -> Result<f32, Error<E>> {
    // Lines are 6 bytes long (MMSB, MLSB, CRC, LMSB, LLSB, CRC)
    if line.len() != 6 {
        return Err(Error::Length(line.len()));
    }

    let m = checked_word(&line[0..3])?;
    let l = checked_word(&line[3..6])?;

    // Note the returned data is _big endian_
    let u = u32::from_be_bytes([m[0], m[1], l[0], l[1]]);

    Ok(f32::from_bits(u))
}

/// Decode an 18-byte measurement response
/// All six CRCs must pass before any value is returned
pub fn decode_measurement<E>(buff: &[u8; MEASUREMENT_LEN]) -> Result<Measurement, Error<E>> {
    let co2 = decode_float(&buff[0..6])?;
    let temp = decode_float(&buff[6..12])?;
    let rh = decode_float(&buff[12..18])?;

    Ok(Measurement{co2, temp, rh})
}

#[cfg(test)]
pub(crate) mod test {
    extern crate std;
    use std::vec::Vec;

    use assert_approx_eq::assert_approx_eq;

    use super::*;

    type TestError = Error<()>;

    /// Build a measurement response with valid CRCs
    pub(crate) fn measurement_bytes(values: [f32; 3]) -> Vec<u8> {
        let mut buff = Vec::with_capacity(MEASUREMENT_LEN);

        for v in values.iter() {
            let b = v.to_bits().to_be_bytes();
            for half in b.chunks(2) {
                buff.extend_from_slice(half);
                buff.push(crc8(half));
            }
        }

        buff
    }

    fn to_array(v: &[u8]) -> [u8; MEASUREMENT_LEN] {
        let mut a = [0u8; MEASUREMENT_LEN];
        a.copy_from_slice(v);
        a
    }

    #[test]
    fn test_encode_command() {
        let f = CommandFrame::new(Command::StopContinuousMode, None);
        assert_eq!(f.as_bytes(), &[0x01, 0x04]);

        let f = CommandFrame::new(Command::StartContinuousMode, Some(0));
        assert_eq!(f.as_bytes(), &[0x00, 0x10, 0x00, 0x00, 0x81]);

        let f = CommandFrame::new(Command::SetFrc, Some(450));
        assert_eq!(f.as_bytes(), &[0x52, 0x04, 0x01, 0xc2, 0x50]);
    }

    #[test]
    fn test_decode_register() {
        let v = decode_register::<()>(&[0x00, 0x01, 0xB0]).unwrap();
        assert_eq!(v, 1);

        let v = decode_register::<()>(&[0x07, 0x08, 0x96]).unwrap();
        assert_eq!(v, 1800);

        match decode_register::<()>(&[0x07, 0x08, 0x97]) {
            Err(Error::Crc(0x96, 0x97)) => (),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_register_all_words() {
        for v in (0..=u16::MAX).step_by(97) {
            let b = v.to_be_bytes();
            let buff = [b[0], b[1], crc8(&b)];
            assert_eq!(decode_register::<()>(&buff).unwrap(), v);
        }
    }

    #[test]
    fn test_convert() {
        // Test vectors from datasheet
        let tests = &[
            ([0x43, 0xDB, 0xCB, 0x8C, 0x2E, 0x8F], 439.0),
            ([0x41, 0xD9, 0x70, 0xE7, 0xFF, 0xF5], 27.2),
            ([0x42, 0x43, 0xBF, 0x3A, 0x1B, 0x74], 48.8),
        ];

        for t in tests {
            let v = decode_float::<()>(&t.0).unwrap();
            assert_approx_eq!(v, t.1, 0.1);
        }
    }

    #[test]
    fn test_convert_length() {
        match decode_float::<()>(&[0x43, 0xDB, 0xCB, 0x8C, 0x2E]) {
            Err(Error::Length(5)) => (),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn test_decode_measurement() {
        let buff = to_array(&measurement_bytes([415.25, 23.10, 41.77]));

        let m: Result<Measurement, TestError> = decode_measurement(&buff);
        let m = m.unwrap();

        assert_eq!(m.co2, 415.25);
        assert_eq!(m.temp, 23.10);
        assert_eq!(m.rh, 41.77);
    }

    #[test]
    fn test_decode_measurement_bad_crc() {
        let good = measurement_bytes([415.25, 23.10, 41.77]);

        // Corrupting any one of the six CRCs rejects the whole frame
        for i in (2..MEASUREMENT_LEN).step_by(3) {
            let mut buff = to_array(&good);
            buff[i] ^= 0x01;

            let m: Result<Measurement, TestError> = decode_measurement(&buff);
            match m {
                Err(Error::Crc(..)) => (),
                r => panic!("corrupt crc at {} returned: {:?}", i, r),
            }
        }
    }
}
