//! Calendar components
//!
//! Dates and times of day have no native counterpart in BSON, so the document codec
//! stores them as a fixed-width byte string. Byte-wise comparison of two encodings of
//! the same kind follows chronological order, which keeps range filters meaningful.

use crate::errors::CodecError;
use crate::value::Value;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

pub const ENCODED_LEN: usize = 14;

const HAS_DATE: u8 = 0b01;
const HAS_TIME: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateComponents {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl DateComponents {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            time: None,
        }
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            date: None,
            time: Some(time),
        }
    }

    /// Layout: flags, year (i32, sign bit flipped, big endian), month, day, hour,
    /// minute, second, nanoseconds (u32, big endian). Absent parts are zeroed.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        let mut flags = 0;

        if let Some(date) = self.date {
            flags |= HAS_DATE;
            let year = (date.year() as u32) ^ 0x8000_0000;
            out[1..5].copy_from_slice(&year.to_be_bytes());
            out[5] = date.month() as u8;
            out[6] = date.day() as u8;
        }
        if let Some(time) = self.time {
            flags |= HAS_TIME;
            out[7] = time.hour() as u8;
            out[8] = time.minute() as u8;
            out[9] = time.second() as u8;
            out[10..14].copy_from_slice(&time.nanosecond().to_be_bytes());
        }
        out[0] = flags;
        out
    }

    /// Parts whose stored fields do not form a valid date or time are dropped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != ENCODED_LEN {
            return Err(CodecError::unsupported(format!(
                "calendar components of {} bytes",
                bytes.len()
            )));
        }
        let flags = bytes[0];

        let date = if flags & HAS_DATE != 0 {
            let raw = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
            let year = (raw ^ 0x8000_0000) as i32;
            NaiveDate::from_ymd_opt(year, u32::from(bytes[5]), u32::from(bytes[6]))
        } else {
            None
        };
        let time = if flags & HAS_TIME != 0 {
            let nanos = u32::from_be_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);
            NaiveTime::from_hms_nano_opt(
                u32::from(bytes[7]),
                u32::from(bytes[8]),
                u32::from(bytes[9]),
                nanos,
            )
        } else {
            None
        };

        Ok(Self { date, time })
    }

    /// A date part wins over a time part.
    pub fn into_value(self) -> Result<Value, CodecError> {
        match (self.date, self.time) {
            (Some(date), _) => Ok(Value::Date(date)),
            (None, Some(time)) => Ok(Value::Time(time)),
            (None, None) => Err(CodecError::unsupported(
                "calendar components without a date or time",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_survives_bytes() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let bytes = DateComponents::from_date(date).to_bytes();
        let back = DateComponents::from_bytes(&bytes).unwrap();
        assert_eq!(back.into_value().unwrap(), Value::Date(date));
    }

    #[test]
    fn time_survives_bytes() {
        let time = NaiveTime::from_hms_nano_opt(23, 59, 1, 987_654_321).unwrap();
        let bytes = DateComponents::from_time(time).to_bytes();
        let back = DateComponents::from_bytes(&bytes).unwrap();
        assert_eq!(back.into_value().unwrap(), Value::Time(time));
    }

    #[test]
    fn encoding_preserves_order() {
        let dates = [
            NaiveDate::from_ymd_opt(-44, 3, 15).unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2000, 1, 2).unwrap(),
        ];
        let encoded: Vec<_> = dates
            .iter()
            .map(|d| DateComponents::from_date(*d).to_bytes())
            .collect();
        assert!(encoded.windows(2).all(|pair| pair[0] < pair[1]));

        let early = DateComponents::from_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let late = DateComponents::from_time(NaiveTime::from_hms_opt(17, 30, 0).unwrap());
        assert!(early.to_bytes() < late.to_bytes());
    }

    #[test]
    fn invalid_components_are_rejected() {
        assert!(DateComponents::from_bytes(&[0u8; 3]).is_err());

        let mut bytes = DateComponents::from_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
            .to_bytes();
        bytes[5] = 13;
        let components = DateComponents::from_bytes(&bytes).unwrap();
        assert!(components.into_value().is_err());
    }
}
