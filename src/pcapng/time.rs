use std::convert::TryFrom;

use rusticata_macros::newtype_enum;

use crate::PcapError;

/// Default value of `if_tsresol`: microseconds
pub const DEFAULT_TSRESOL: u8 = 6;

/// Default time resolution, in units per second
pub const DEFAULT_TIME_UNITS_PER_SECOND: u64 = 1_000_000;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Display precision of timestamps, as a number of decimal digits
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TsPrecision(pub u8);

newtype_enum! {
impl display TsPrecision {
    SEC = 0,
    DSEC = 1,
    CSEC = 2,
    MSEC = 3,
    USEC_100 = 4,
    USEC_10 = 5,
    USEC = 6,
    NSEC_100 = 7,
    NSEC_10 = 8,
    NSEC = 9,
}
}

/// Compute the timestamp resolution, in units per second
///
/// The top bit selects the base (0: 10, 1: 2), the other bits are the exponent.
/// Return the resolution, or `None` if the resolution is invalid (for ex. greater than `2^64`)
pub fn build_ts_resolution(ts_resol: u8) -> Option<u64> {
    let ts_mode = ts_resol & 0x80;
    let exponent = ts_resol & 0x7f;
    let unit = if ts_mode == 0 {
        // 10^if_tsresol
        // check that if_tsresol <= 19 (10^19 is the largest power of 10 to fit in a u64)
        if exponent > 19 {
            return None;
        }
        10u64.pow(exponent as u32)
    } else {
        // 2^if_tsresol
        // check that if_tsresol <= 63
        if exponent > 63 {
            return None;
        }
        1 << (exponent as u64)
    };
    Some(unit)
}

/// Decode `if_tsresol` into units per second and display precision
pub fn decode_tsresol(ts_resol: u8) -> Result<(u64, TsPrecision), PcapError<&'static [u8]>> {
    let units = build_ts_resolution(ts_resol).ok_or_else(|| {
        PcapError::Unsupported(format!(
            "if_tsresol 0x{:02x} is larger than the supported resolution",
            ts_resol
        ))
    })?;
    let precision = if ts_resol & 0x80 == 0 {
        TsPrecision((ts_resol & 0x7f).min(9))
    } else {
        precision_for_units(units)
    };
    Ok((units, precision))
}

/// Smallest named precision able to represent `units` per second
pub fn precision_for_units(units: u64) -> TsPrecision {
    let mut threshold = NANOS_PER_SEC;
    let mut digits = 9;
    while digits > 0 {
        if units >= threshold {
            return TsPrecision(digits);
        }
        threshold /= 10;
        digits -= 1;
    }
    TsPrecision::SEC
}

/// `if_tsresol` value for a display precision (power of 10)
#[inline]
pub fn tsresol_for_precision(precision: TsPrecision) -> u8 {
    precision.0.min(9)
}

/// Absolute timestamp, relative to the UNIX epoch
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub secs: i64,
    pub nsecs: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nsecs: u32) -> Self {
        Timestamp { secs, nsecs }
    }

    /// Convert a tick count in `units` per second, shifted by `ts_offset` seconds
    pub fn from_ticks(ticks: u64, units: u64, ts_offset: i64) -> Self {
        let units = units.max(1);
        let secs = (ticks / units) as i64;
        let nsecs = (u128::from(ticks % units) * u128::from(NANOS_PER_SEC) / u128::from(units)) as u32;
        Timestamp {
            secs: secs.wrapping_add(ts_offset),
            nsecs,
        }
    }

    /// Convert to a tick count in `units` per second
    ///
    /// Returns `None` if the tick count does not fit in 64 bits, for ex. for a timestamp before
    /// the epoch.
    pub fn to_ticks(&self, units: u64) -> Option<u64> {
        let ticks = i128::from(self.secs) * i128::from(units)
            + i128::from(self.nsecs) * i128::from(units) / i128::from(NANOS_PER_SEC);
        u64::try_from(ticks).ok()
    }

    /// Split a tick count into the high and low 32-bit halves stored in blocks
    #[inline]
    pub fn split_ticks(ticks: u64) -> (u32, u32) {
        ((ticks >> 32) as u32, ticks as u32)
    }

    /// Timestamp as `f64` seconds
    pub fn as_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nsecs) / NANOS_PER_SEC as f64
    }
}
