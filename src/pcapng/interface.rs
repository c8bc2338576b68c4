use tracing::debug;

use crate::{Linktype, PcapError};

use super::*;

/// Description of a capture interface, with its decoded options
///
/// Built from an Interface Description Block by the capture reader, or created by the caller
/// before writing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub linktype: Linktype,
    /// Maximum number of bytes captured per packet, 0 if unlimited
    pub snaplen: u32,
    /// Number of timestamp units per second
    pub time_units_per_second: u64,
    pub tsprecision: TsPrecision,
    /// Offset added to timestamps, in seconds
    pub tsoffset: i64,
    /// Length of the FCS, in bits, if known
    pub fcs_len: Option<u32>,
    pub options: Options,
    /// Statistics read from Interface Statistics Blocks, in file order
    pub statistics: Vec<InterfaceStatistics>,
}

impl Interface {
    /// Create an interface with the default time resolution (microseconds)
    pub fn new(linktype: Linktype, snaplen: u32) -> Self {
        Interface {
            linktype,
            snaplen,
            time_units_per_second: DEFAULT_TIME_UNITS_PER_SECOND,
            tsprecision: TsPrecision::USEC,
            tsoffset: 0,
            fcs_len: None,
            options: Options::new(),
            statistics: Vec::new(),
        }
    }

    /// Use a power of 10 time resolution, matching `precision`
    pub fn with_precision(mut self, precision: TsPrecision) -> Self {
        let exponent = tsresol_for_precision(precision);
        self.time_units_per_second = 10u64.pow(u32::from(exponent));
        self.tsprecision = TsPrecision(exponent);
        self
    }

    /// Build the interface from an Interface Description Block
    pub fn from_idb(
        idb: &InterfaceDescriptionBlock,
        registry: &Registry,
    ) -> Result<Self, PcapError<&'static [u8]>> {
        let ctx = OptionContext::new(
            BlockKind::InterfaceDescription,
            idb.big_endian(),
            registry,
        );
        let options = decode_options(&idb.options, &ctx)?;
        let tsresol = options
            .get_u8(OptionCode::IfTsresol)
            .unwrap_or(DEFAULT_TSRESOL);
        let (time_units_per_second, tsprecision) = decode_tsresol(tsresol)?;
        let tsoffset = options.get_i64(OptionCode::IfTsoffset).unwrap_or(0);
        let fcs_len = options
            .get_u8(OptionCode::IfFcslen)
            .map(|octets| u32::from(octets) * 8);
        if idb.snaplen > idb.linktype.max_snaplen() {
            debug!(
                snaplen = idb.snaplen,
                linktype = idb.linktype.0,
                "IDB snapshot length is larger than the maximum for its link type"
            );
        }
        Ok(Interface {
            linktype: idb.linktype,
            snaplen: idb.snaplen,
            time_units_per_second,
            tsprecision,
            tsoffset,
            fcs_len,
            options,
            statistics: Vec::new(),
        })
    }

    /// Value of `if_tsresol` for the time resolution of this interface
    ///
    /// Resolutions which are neither a power of 10 nor a power of 2 are rounded down to the
    /// precision.
    pub fn tsresol(&self) -> u8 {
        let units = self.time_units_per_second;
        let mut p = 1u64;
        for e in 0..=19u8 {
            if p == units {
                return e;
            }
            p = p.saturating_mul(10);
        }
        if units.is_power_of_two() {
            return 0x80 | units.trailing_zeros() as u8;
        }
        tsresol_for_precision(self.tsprecision)
    }

    pub fn name(&self) -> Option<&str> {
        self.options.get_str(OptionCode::IfName)
    }

    pub fn description(&self) -> Option<&str> {
        self.options.get_str(OptionCode::IfDescription)
    }

    pub fn os(&self) -> Option<&str> {
        self.options.get_str(OptionCode::IfOs)
    }

    pub fn hardware(&self) -> Option<&str> {
        self.options.get_str(OptionCode::IfHardware)
    }

    /// Interface speed, in bits per second
    pub fn speed(&self) -> Option<u64> {
        self.options.get_u64(OptionCode::IfSpeed)
    }

    pub fn filter(&self) -> Option<&CaptureFilter> {
        match self.options.get(OptionCode::IfFilter) {
            Some(OptionValue::Filter(f)) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn interface_from_idb() {
        // big-endian IDB, ethernet, snaplen 0x40000 + 1, if_tsresol 0x86, if_fcslen 4,
        // if_tsoffset 10
        const IDB: &[u8] = &hex!(
            "
00 00 00 01 00 00 00 30 00 01 00 00 00 04 00 01
00 09 00 01 86 00 00 00 00 0D 00 01 04 00 00 00
00 0E 00 08 00 00 00 00 00 00 00 0A 00 00 00 30"
        );
        let (_, idb) = parse_interfacedescriptionblock_be(IDB).expect("could not parse IDB");
        let registry = Registry::new();
        let iface = Interface::from_idb(&idb, &registry).expect("interface");
        assert_eq!(iface.linktype, Linktype::ETHERNET);
        assert_eq!(iface.snaplen, 0x40001);
        assert_eq!(iface.time_units_per_second, 64);
        assert_eq!(iface.tsprecision, TsPrecision::DSEC);
        assert_eq!(iface.fcs_len, Some(32));
        assert_eq!(iface.tsoffset, 10);
        assert_eq!(iface.tsresol(), 0x86);
    }

    #[test]
    fn default_interface() {
        let iface = Interface::new(Linktype::RAW, 0);
        assert_eq!(iface.time_units_per_second, 1_000_000);
        assert_eq!(iface.tsresol(), 6);
        let iface = iface.with_precision(TsPrecision::NSEC);
        assert_eq!(iface.time_units_per_second, 1_000_000_000);
        assert_eq!(iface.tsresol(), 9);
        assert!(iface.name().is_none());
    }
}
