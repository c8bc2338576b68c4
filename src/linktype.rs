use rusticata_macros::newtype_enum;

/// Data link type
///
/// The link-layer header type specifies the type of headers at the beginning
/// of the packet.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,

    FDDI = 10,

    RAW = 101,

    LOOP = 108,
    LINUX_SLL = 113,
    LINUX_SLL2 = 276,

    // USB packets, beginning with a Linux USB header, with the setup header padded
    USB_LINUX_MMAPPED = 220,

    // Raw IPv4; the packet begins with an IPv4 header.
    IPV4 = 228,
    // Raw IPv6; the packet begins with an IPv6 header.
    IPV6 = 229,

    // D-Bus messages
    DBUS = 231,

    // Linux netlink NETLINK NFLOG socket log messages.
    NFLOG = 239,

    // USB packets, beginning with a USBPcap header
    USBPCAP = 249,

    //  Upper-layer protocol saves from Wireshark
    WIRESHARK_UPPER_PDU = 252,

    // Elektrobit High Speed Capture and Replay
    EBHSCR = 279,
}
}

/// Maximum snapshot length for most link types
pub const MAX_PACKET_SIZE_STANDARD: u32 = 262_144;
/// Maximum snapshot length for USBPcap and D-Bus
pub const MAX_PACKET_SIZE_USBPCAP: u32 = 128 * 1024 * 1024;
/// Maximum snapshot length for D-Bus
pub const MAX_PACKET_SIZE_DBUS: u32 = 128 * 1024 * 1024;
/// Maximum snapshot length for EBHSCR
pub const MAX_PACKET_SIZE_EBHSCR: u32 = 32 * 1024 * 1024;

impl Linktype {
    /// Largest captured length accepted for a packet of this link type
    pub fn max_snaplen(self) -> u32 {
        match self {
            Linktype::DBUS => MAX_PACKET_SIZE_DBUS,
            Linktype::USBPCAP => MAX_PACKET_SIZE_USBPCAP,
            Linktype::EBHSCR => MAX_PACKET_SIZE_EBHSCR,
            _ => MAX_PACKET_SIZE_STANDARD,
        }
    }

    /// Returns true if the value fits in the 16-bit link type field of an
    /// Interface Description Block
    #[inline]
    pub fn has_wire_code(self) -> bool {
        (0..=i32::from(u16::MAX)).contains(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_snaplen_per_linktype() {
        assert_eq!(Linktype::ETHERNET.max_snaplen(), 262_144);
        assert_eq!(Linktype::USBPCAP.max_snaplen(), 128 * 1024 * 1024);
        assert_eq!(Linktype::DBUS.max_snaplen(), 128 * 1024 * 1024);
        assert_eq!(Linktype::EBHSCR.max_snaplen(), 32 * 1024 * 1024);
    }

    #[test]
    fn wire_code() {
        assert!(Linktype::ETHERNET.has_wire_code());
        assert!(!Linktype(-1).has_wire_code());
        assert!(!Linktype(0x1_0000).has_wire_code());
    }
}
