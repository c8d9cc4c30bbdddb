// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chain time types

use core::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use encdec::{DecodeOwned, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    helpers::{Reader, Writer},
    Error,
};

/// Block timestamp epoch (2018-06-01T00:00:00Z) in unix milliseconds
pub const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 1_527_811_200_000;

/// Block timestamp interval in milliseconds
pub const BLOCK_INTERVAL_MS: i64 = 500;

const FORMAT_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const FORMAT_PARSE: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn unix_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parse an ISO-8601 time (optional fraction and trailing `Z`) to unix microseconds
fn parse_micros(s: &str, ty: &str) -> Result<i64, Error> {
    let s = s.trim().trim_end_matches('Z');

    let t = NaiveDateTime::parse_from_str(s, FORMAT_PARSE).map_err(|e| Error::invalid(ty, e))?;

    t.signed_duration_since(unix_epoch())
        .num_microseconds()
        .ok_or_else(|| Error::invalid(ty, "time out of range"))
}

fn format_micros(f: &mut fmt::Formatter<'_>, micros: i64, format: &str) -> fmt::Result {
    let t = unix_epoch() + Duration::microseconds(micros);
    write!(f, "{}", t.format(format))
}

/// Microseconds since the unix epoch
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePoint(pub i64);

impl TimePoint {
    pub const fn from_micros(v: i64) -> Self {
        Self(v)
    }

    pub const fn micros(&self) -> i64 {
        self.0
    }
}

/// Seconds since the unix epoch
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub const fn from_unix(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn unix(&self) -> u32 {
        self.0
    }
}

/// Half-second slots since 2018-06-01T00:00:00Z
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockTimestamp(pub u32);

impl BlockTimestamp {
    /// Compute the block slot containing the provided unix time (milliseconds)
    pub fn from_unix_millis(ms: i64) -> Result<Self, Error> {
        let slot = (ms - BLOCK_TIMESTAMP_EPOCH_MS).div_euclid(BLOCK_INTERVAL_MS);
        u32::try_from(slot)
            .map(Self)
            .map_err(|_| Error::invalid("block_timestamp_type", "time out of range"))
    }

    /// Unix time of this block slot in milliseconds
    pub const fn unix_millis(&self) -> i64 {
        BLOCK_TIMESTAMP_EPOCH_MS + self.0 as i64 * BLOCK_INTERVAL_MS
    }

    pub const fn slot(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_micros(f, self.0, FORMAT_MILLIS)
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_micros(f, self.0 as i64 * 1_000_000, FORMAT_SECONDS)
    }
}

impl fmt::Display for BlockTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_micros(f, self.unix_millis() * 1_000, FORMAT_MILLIS)
    }
}

impl FromStr for TimePoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_micros(s, "time_point").map(Self)
    }
}

impl FromStr for TimePointSec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let us = parse_micros(s, "time_point_sec")?;
        u32::try_from(us.div_euclid(1_000_000))
            .map(Self)
            .map_err(|_| Error::invalid("time_point_sec", "time out of range"))
    }
}

impl FromStr for BlockTimestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let us = parse_micros(s, "block_timestamp_type")?;
        Self::from_unix_millis(us.div_euclid(1_000))
    }
}

macro_rules! time_debug {
    ($($t:ident),*) => {
        $(
            impl fmt::Debug for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({self})", stringify!($t))
                }
            }
        )*
    };
}

time_debug!(TimePoint, TimePointSec, BlockTimestamp);

macro_rules! time_serde {
    ($($t:ident),*) => {
        $(
            impl Serialize for $t {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }

            impl<'de> Deserialize<'de> for $t {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let s = String::deserialize(deserializer)?;
                    $t::from_str(&s).map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

time_serde!(TimePoint, TimePointSec, BlockTimestamp);

impl Encode for TimePoint {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(8)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.i64(self.0)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for TimePoint {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);
        let v = r.i64("time_point")?;
        Ok((Self(v), r.offset()))
    }
}

impl Encode for TimePointSec {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.u32(self.0)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for TimePointSec {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);
        let v = r.u32("time_point_sec")?;
        Ok((Self(v), r.offset()))
    }
}

impl Encode for BlockTimestamp {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.u32(self.0)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for BlockTimestamp {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);
        let v = r.u32("block_timestamp_type")?;
        Ok((Self(v), r.offset()))
    }
}
