//! Cumulative counter primitives.
//!
//! Every statistic is a `(start, end)` pair of cumulative values; the
//! reporting-window delta is `end - start`, and closing a window copies end
//! into start ("rolling"). Counters compose into (packets, bytes) pairs and
//! four-way transport-protocol groups. Samples are signed so the
//! reconciler can apply negative adjustments without casts.

// IPv4 transport protocol numbers the accounting distinguishes.
const IPPROTO_ICMP: u8 = 1;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;

/// A single cumulative counter over one reporting window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub start: i64,
    pub end: i64,
}

impl Sample {
    pub fn add(&mut self, n: i64) {
        self.end += n;
    }

    /// Current reporting-window delta. Non-negative after reconciliation.
    pub fn delta(&self) -> i64 {
        self.end - self.start
    }

    /// Close the window: the next delta starts from the current end.
    pub fn roll(&mut self) {
        self.start = self.end;
    }

    /// A cumulative source that decreased. Fatal when observed on
    /// authoritative counters.
    pub fn is_backward(&self) -> bool {
        self.end < self.start
    }
}

/// Packet and byte counters for one bucket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub packets: Sample,
    pub bytes: Sample,
}

impl Counts {
    /// Account one frame of `physical_len` wire bytes.
    pub fn record(&mut self, physical_len: i64) {
        self.packets.add(1);
        self.bytes.add(physical_len);
    }

    pub fn roll(&mut self) {
        self.packets.roll();
        self.bytes.roll();
    }

    pub fn is_backward(&self) -> bool {
        self.packets.is_backward() || self.bytes.is_backward()
    }
}

/// The four-way transport partition every classified frame lands in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolCounts {
    pub icmp: Counts,
    pub udp: Counts,
    pub tcp: Counts,
    pub other: Counts,
}

impl ProtocolCounts {
    /// Account one frame under the bucket selected by the IPv4
    /// transport-protocol byte. Unknown transports land in `other`.
    pub fn record(&mut self, protocol: u8, physical_len: i64) {
        let bucket = match protocol {
            IPPROTO_ICMP => &mut self.icmp,
            IPPROTO_UDP => &mut self.udp,
            IPPROTO_TCP => &mut self.tcp,
            _ => &mut self.other,
        };
        bucket.record(physical_len);
    }

    pub fn roll(&mut self) {
        self.icmp.roll();
        self.udp.roll();
        self.tcp.roll();
        self.other.roll();
    }
}
