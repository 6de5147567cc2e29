use std::net::Ipv4Addr;

/// Ethernet II header: dst MAC (6) + src MAC (6) + EtherType (2).
pub const ETH_HLEN: usize = 14;
/// IPv4 header without options. Frames carrying IP options are decoded
/// at the wrong UDP offset; the capture filter does not exclude them.
pub const IPV4_HLEN: usize = 20;
pub const UDP_HLEN: usize = 8;
/// Only the DNS transaction id is read from the payload.
pub const DNS_PREFIX_LEN: usize = 2;

const IPV4_VERSION: u8 = 4;
const IPV4_FLAGS_FRAG_OFFSET: usize = 6;
const IPV4_SRC_OFFSET: usize = 12;
const UDP_DST_PORT_OFFSET: usize = 2;

const IP_MF: u16 = 0x2000;
const IP_OFFMASK: u16 = 0x1fff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame truncated: need {needed} bytes, captured {available}")]
    Truncated { needed: usize, available: usize },
    #[error("not an IPv4 packet (version {version})")]
    NotIpv4 { version: u8 },
}

/// One frame as handed over by the capture session.
///
/// `wire_len` is the length observed on the wire, which can exceed
/// `data.len()` when the capture snaplen cut the frame short.
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    pub data: &'a [u8],
    pub wire_len: u32,
}

impl<'a> CapturedFrame<'a> {
    pub fn new(data: &'a [u8], wire_len: u32) -> Self {
        Self { data, wire_len }
    }
}

/// IPv4 header projection (RFC 791)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Version|  IHL  |Type of Service|          Total Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Identification        |Flags|      Fragment Offset    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Time to Live |    Protocol   |         Header Checksum       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       Source Address                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IpHeaderView<'a> {
    bytes: &'a [u8; IPV4_HLEN],
}

impl IpHeaderView<'_> {
    pub fn version(&self) -> u8 {
        self.bytes[0] >> 4
    }

    pub fn source(&self) -> Ipv4Addr {
        let b = self.bytes;
        Ipv4Addr::new(
            b[IPV4_SRC_OFFSET],
            b[IPV4_SRC_OFFSET + 1],
            b[IPV4_SRC_OFFSET + 2],
            b[IPV4_SRC_OFFSET + 3],
        )
    }

    fn flags_and_offset(&self) -> u16 {
        u16::from_be_bytes([
            self.bytes[IPV4_FLAGS_FRAG_OFFSET],
            self.bytes[IPV4_FLAGS_FRAG_OFFSET + 1],
        ])
    }

    pub fn more_fragments(&self) -> bool {
        self.flags_and_offset() & IP_MF != 0
    }

    /// Fragment offset in 8-byte units.
    pub fn fragment_offset(&self) -> u16 {
        self.flags_and_offset() & IP_OFFMASK
    }
}

/// UDP header projection (RFC 768)
///
/// [0-1] source port, [2-3] destination port, [4-5] length, [6-7] checksum.
#[derive(Debug, Clone, Copy)]
pub struct UdpHeaderView<'a> {
    bytes: &'a [u8; UDP_HLEN],
}

impl UdpHeaderView<'_> {
    pub fn dest_port(&self) -> u16 {
        u16::from_be_bytes([
            self.bytes[UDP_DST_PORT_OFFSET],
            self.bytes[UDP_DST_PORT_OFFSET + 1],
        ])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DnsHeaderPrefixView<'a> {
    bytes: &'a [u8; DNS_PREFIX_LEN],
}

impl DnsHeaderPrefixView<'_> {
    pub fn transaction_id(&self) -> u16 {
        u16::from_be_bytes(*self.bytes)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    pub ip: IpHeaderView<'a>,
    pub udp: UdpHeaderView<'a>,
    pub dns: DnsHeaderPrefixView<'a>,
}

/// Smallest captured length that still decodes for a given link header size.
pub const fn min_frame_len(link_hlen: usize) -> usize {
    link_hlen + IPV4_HLEN + UDP_HLEN + DNS_PREFIX_LEN
}

/// Project the fixed-offset IPv4/UDP/DNS views out of a captured frame.
///
/// Only the captured bytes are bounds-checked; the wire length plays no part.
pub fn decode<'a>(
    frame: &CapturedFrame<'a>,
    link_hlen: usize,
) -> Result<DecodedFrame<'a>, DecodeError> {
    let needed = min_frame_len(link_hlen);
    let available = frame.data.len();
    let truncated = DecodeError::Truncated { needed, available };

    let ip_start = link_hlen;
    let udp_start = ip_start + IPV4_HLEN;
    let dns_start = udp_start + UDP_HLEN;

    let ip = field::<IPV4_HLEN>(frame.data, ip_start).ok_or(truncated)?;
    let udp = field::<UDP_HLEN>(frame.data, udp_start).ok_or(truncated)?;
    let dns = field::<DNS_PREFIX_LEN>(frame.data, dns_start).ok_or(truncated)?;

    let ip = IpHeaderView { bytes: ip };
    if ip.version() != IPV4_VERSION {
        return Err(DecodeError::NotIpv4 {
            version: ip.version(),
        });
    }

    Ok(DecodedFrame {
        ip,
        udp: UdpHeaderView { bytes: udp },
        dns: DnsHeaderPrefixView { bytes: dns },
    })
}

fn field<const N: usize>(data: &[u8], start: usize) -> Option<&[u8; N]> {
    data.get(start..start.checked_add(N)?)?.try_into().ok()
}
