//! Per-packet classification into the counter tree.
//!
//! Each captured frame is counted into the global totals, then attributed
//! to a (network, host, protocol) leaf bucket, or to one of the two sink
//! buckets: `unparseable` for frames that cannot be decoded, and
//! `other_network` for addresses outside every configured network. Header
//! fields are reconstructed from explicit byte reads, bounds-checked
//! against the captured length.

use std::fmt::Write as _;
use std::net::Ipv4Addr;

use crate::cli::CountAxis;
use crate::clock::WallTime;
use crate::config::{FRAME_OVERHEAD_BYTES, FRAME_PAYLOAD_START, IPV4_MIN_HEADER_LEN, WARNING_INTERVAL_SECS};
use crate::core::state::CoreState;

/// Transport protocol and axis-selected address pulled out of one frame.
struct ParsedFrame {
    protocol: u8,
    addr: u32,
}

/// Extract the IPv4 transport byte and the attributed address from a
/// captured Ethernet frame. `None` means the frame is unparseable: too few
/// captured bytes for an Ethernet plus minimum IPv4 header, or not IPv4.
fn parse_frame(data: &[u8], axis: CountAxis) -> Option<ParsedFrame> {
    if data.len() < FRAME_PAYLOAD_START + IPV4_MIN_HEADER_LEN {
        return None;
    }
    let header = &data[FRAME_PAYLOAD_START..];

    let ip_version = header[0] >> 4;
    if ip_version != 4 {
        return None;
    }

    let protocol = header[9];
    // Source address at header offset 12, destination at 16, regardless of
    // IHL; both lie within the minimum header.
    let addr = match axis {
        CountAxis::Src => u32::from_be_bytes([header[12], header[13], header[14], header[15]]),
        CountAxis::Dst => u32::from_be_bytes([header[16], header[17], header[18], header[19]]),
    };

    Some(ParsedFrame { protocol, addr })
}

impl CoreState {
    /// Account one captured frame. `data` is the captured prefix of the
    /// frame; `wire_len` is its full on-the-wire length.
    pub fn classify(&mut self, data: &[u8], wire_len: u32, now: WallTime) {
        let physical_len = i64::from(wire_len) + FRAME_OVERHEAD_BYTES;
        self.totals.record(physical_len);

        match parse_frame(data, self.axis) {
            Some(frame) => match self.networks.find(frame.addr) {
                Some((net, host)) => {
                    net.totals.record(frame.protocol, physical_len);
                    net.hosts[host].record(frame.protocol, physical_len);
                }
                None => {
                    self.other_network.record(frame.protocol, physical_len);
                    if self.take_warning_slot(now) {
                        tracing::warn!("Network not found: {}", Ipv4Addr::from(frame.addr));
                    }
                }
            },
            None => {
                self.unparseable.record(physical_len);
                if self.take_warning_slot(now) {
                    tracing::warn!("Unparseable: {}", hex_dump(data));
                }
            }
        }
    }

    /// Rate limit shared by both warning kinds: at most one warning per
    /// interval, and an emission claims the slot for both.
    fn take_warning_slot(&mut self, now: WallTime) -> bool {
        if now.sec >= self.last_warning_time.sec + WARNING_INTERVAL_SECS {
            self.last_warning_time = now;
            true
        } else {
            false
        }
    }
}

fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02X}");
    }
    out
}
