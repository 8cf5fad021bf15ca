//! Field codecs for the thermometer protocol.
//!
//! All multi-byte integers are big-endian two's complement. Temperatures
//! travel as signed tenths of a degree Celsius.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WireError};

// ---------------------------------------------------------------------------
// Read / write helpers
// ---------------------------------------------------------------------------

/// Read a big-endian signed 16-bit integer.
pub fn read_int16(data: &[u8], offset: usize, command: &'static str) -> Result<i16> {
    if data.len() < offset + 2 {
        return Err(WireError::unexpected_length(command, offset + 2, data.len()));
    }
    Ok(i16::from_be_bytes([data[offset], data[offset + 1]]))
}

/// Write a big-endian signed 16-bit integer.
pub fn write_int16(buf: &mut Vec<u8>, val: i16) {
    buf.extend_from_slice(&val.to_be_bytes());
}

// ---------------------------------------------------------------------------
// Temperature
// ---------------------------------------------------------------------------

/// A temperature in tenths of a degree Celsius, as carried on the wire.
///
/// Construction validates range, so encoding a `Temperature` never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Temperature {
    tenths: i16,
}

impl Temperature {
    pub const fn from_tenths(tenths: i16) -> Self {
        Self { tenths }
    }

    /// Convert degrees Celsius to wire tenths, rounding to the nearest tenth.
    pub fn from_celsius(value: f64) -> Result<Self> {
        let scaled = (value * 10.0).round();
        if !scaled.is_finite() || scaled < f64::from(i16::MIN) || scaled > f64::from(i16::MAX) {
            return Err(WireError::TemperatureOutOfRange { value });
        }
        Ok(Self { tenths: scaled as i16 })
    }

    pub fn tenths(self) -> i16 {
        self.tenths
    }

    pub fn celsius(self) -> f64 {
        f64::from(self.tenths) / 10.0
    }

    /// Decode from a 2-byte payload.
    pub fn decode(payload: &[u8], command: &'static str) -> Result<Self> {
        Ok(Self::from_tenths(read_int16(payload, 0, command)?))
    }

    pub fn encode(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2);
        write_int16(&mut buf, self.tenths);
        buf
    }
}

impl FromStr for Temperature {
    type Err = WireError;

    /// Parse decimal text such as `"25"`, `"36.5"` or `"-4.2"`.
    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| WireError::InvalidTemperature { input: s.to_string() })?;
        Self::from_celsius(value)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}℃", self.celsius())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int16_round_trip() {
        for val in [0i16, 1, -1, 250, i16::MAX, i16::MIN] {
            let mut buf = Vec::new();
            write_int16(&mut buf, val);
            assert_eq!(read_int16(&buf, 0, "test").unwrap(), val);
        }
    }

    #[test]
    fn int16_too_short() {
        assert!(matches!(
            read_int16(&[0x01], 0, "TestTemperature"),
            Err(WireError::UnexpectedLength { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn twenty_five_degrees() {
        let t = Temperature::from_celsius(25.0).unwrap();
        assert_eq!(t.tenths(), 250);
        assert_eq!(t.encode(), vec![0x00, 0xFA]);
    }

    #[test]
    fn rounds_to_nearest_tenth() {
        // 2.3 * 10 is 22.999... in binary floating point
        assert_eq!(Temperature::from_celsius(2.3).unwrap().tenths(), 23);
        assert_eq!(Temperature::from_celsius(36.56).unwrap().tenths(), 366);
    }

    #[test]
    fn negative_is_twos_complement() {
        let t = Temperature::from_celsius(-4.2).unwrap();
        assert_eq!(t.encode(), vec![0xFF, 0xD6]);
        assert_eq!(Temperature::decode(&[0xFF, 0xD6], "test").unwrap(), t);
    }

    #[test]
    fn out_of_range() {
        assert!(matches!(
            Temperature::from_celsius(5000.0),
            Err(WireError::TemperatureOutOfRange { .. })
        ));
        assert!(Temperature::from_celsius(f64::NAN).is_err());
        assert!(Temperature::from_celsius(f64::INFINITY).is_err());
    }

    #[test]
    fn parse_text() {
        assert_eq!("36.5".parse::<Temperature>().unwrap().tenths(), 365);
        assert_eq!(" 20 ".parse::<Temperature>().unwrap().tenths(), 200);
        assert!(matches!(
            "warm".parse::<Temperature>(),
            Err(WireError::InvalidTemperature { .. })
        ));
    }

    #[test]
    fn display() {
        assert_eq!(Temperature::from_tenths(200).to_string(), "20.0℃");
        assert_eq!(Temperature::from_tenths(-42).to_string(), "-4.2℃");
    }
}
