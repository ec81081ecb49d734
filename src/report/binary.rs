//! Fixed binary record serialization.
//!
//! All multi-byte integers are big-endian; 64-bit values go out as two
//! 32-bit halves high half first, which is bit-identical to a big-endian
//! 64-bit write. Counter samples are serialized as signed 64-bit deltas.
//! Network addresses are written in network byte order. Host-array sizes
//! are not written; the consumer derives them from the prefix byte.

use std::io::{self, Write};

use crate::clock::WallTime;
use crate::config::PROTOCOL_VERSION;
use crate::core::counters::{Counts, ProtocolCounts, Sample};
use crate::core::network::Ipv4Network;
use crate::core::state::CoreState;

fn write_u8<W: Write>(out: &mut W, value: u8) -> io::Result<()> {
    out.write_all(&[value])
}

fn write_u32<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_be_bytes())
}

fn write_i64<W: Write>(out: &mut W, value: i64) -> io::Result<()> {
    out.write_all(&value.to_be_bytes())
}

fn write_sample<W: Write>(out: &mut W, sample: &Sample) -> io::Result<()> {
    write_i64(out, sample.delta())
}

fn write_counts<W: Write>(out: &mut W, counts: &Counts) -> io::Result<()> {
    write_sample(out, &counts.packets)?;
    write_sample(out, &counts.bytes)
}

fn write_protocol_counts<W: Write>(out: &mut W, counts: &ProtocolCounts) -> io::Result<()> {
    write_counts(out, &counts.icmp)?;
    write_counts(out, &counts.udp)?;
    write_counts(out, &counts.tcp)?;
    write_counts(out, &counts.other)
}

pub(super) fn write_header<W: Write>(
    out: &mut W,
    state: &CoreState,
    captured: Counts,
    start: WallTime,
    end: WallTime,
) -> io::Result<()> {
    write_u8(out, PROTOCOL_VERSION)?;
    write_i64(out, start.sec)?;
    write_u32(out, start.usec as u32)?;
    write_i64(out, end.sec)?;
    write_u32(out, end.usec as u32)?;
    write_sample(out, &state.ifstats.dropped)?;
    write_sample(out, &state.ifstats.errors)?;
    write_sample(out, &state.ifstats.fifo_errors)?;
    write_sample(out, &state.capture.received)?;
    write_sample(out, &state.capture.dropped)?;
    write_counts(out, &state.ifstats.total)?;
    write_counts(out, &captured)?;
    write_counts(out, &state.totals)?;
    write_counts(out, &state.unparseable)?;
    write_protocol_counts(out, &state.other_network)?;
    write_u32(out, state.networks.len() as u32)
}

pub(super) fn write_network<W: Write>(out: &mut W, net: &Ipv4Network) -> io::Result<()> {
    write_u8(out, 4)?; // IP version
    out.write_all(&net.network.octets())?;
    write_u8(out, net.prefix)?;
    write_protocol_counts(out, &net.totals)
}

pub(super) fn write_host<W: Write>(out: &mut W, bucket: &ProtocolCounts) -> io::Result<()> {
    write_protocol_counts(out, bucket)
}

#[cfg(test)]
mod tests {
    use crate::cli::OutputFormat;
    use crate::report::emit;
    use crate::report::tests::{populated_state, window};

    /// Independent reader for the binary layout, used to prove the writer
    /// round-trips field for field.
    struct Reader<'a> {
        buf: &'a [u8],
        pos: usize,
    }

    impl<'a> Reader<'a> {
        fn new(buf: &'a [u8]) -> Self {
            Reader { buf, pos: 0 }
        }

        fn take(&mut self, n: usize) -> &'a [u8] {
            let slice = &self.buf[self.pos..self.pos + n];
            self.pos += n;
            slice
        }

        fn u8(&mut self) -> u8 {
            self.take(1)[0]
        }

        fn u32(&mut self) -> u32 {
            u32::from_be_bytes(self.take(4).try_into().unwrap())
        }

        fn i64(&mut self) -> i64 {
            // Two big-endian 32-bit halves, high half first.
            let high = self.u32();
            let low = self.u32();
            ((u64::from(high) << 32) | u64::from(low)) as i64
        }

        fn counts(&mut self) -> (i64, i64) {
            (self.i64(), self.i64())
        }

        fn protocol_counts(&mut self) -> [(i64, i64); 4] {
            [self.counts(), self.counts(), self.counts(), self.counts()]
        }

        fn exhausted(&self) -> bool {
            self.pos == self.buf.len()
        }
    }

    #[test]
    fn test_round_trip() {
        let mut state = populated_state();
        let captured = state.totals;
        let (start, end) = window();

        let mut out = Vec::new();
        emit(&mut out, OutputFormat::Binary, &mut state, captured, start, end).unwrap();

        // Header (197 bytes) + one network of 4 hosts (70 + 4 * 64).
        assert_eq!(out.len(), 197 + 70 + 4 * 64);

        let mut r = Reader::new(&out);
        assert_eq!(r.u8(), 1, "protocol version");
        assert_eq!(r.i64(), 100, "start seconds");
        assert_eq!(r.u32(), 0, "start microseconds");
        assert_eq!(r.i64(), 101, "end seconds");
        assert_eq!(r.u32(), 500_000, "end microseconds");
        assert_eq!(r.i64(), 0, "iface dropped");
        assert_eq!(r.i64(), 0, "iface errors");
        assert_eq!(r.i64(), 0, "iface fifo errors");
        assert_eq!(r.i64(), 0, "pcap received");
        assert_eq!(r.i64(), 0, "pcap dropped");
        assert_eq!(r.counts(), (0, 0), "iface total");
        assert_eq!(r.counts(), (4, 354), "captured total");
        assert_eq!(r.counts(), (4, 354), "extrapolated total");
        assert_eq!(r.counts(), (1, 54), "unparseable");
        assert_eq!(
            r.protocol_counts(),
            [(0, 0), (1, 124), (0, 0), (0, 0)],
            "other_network icmp/udp/tcp/other"
        );
        assert_eq!(r.u32(), 1, "network count");

        assert_eq!(r.u8(), 4, "network IP version");
        assert_eq!(r.take(4), [10, 1, 2, 0], "network address in network byte order");
        assert_eq!(r.u8(), 30, "prefix");
        assert_eq!(
            r.protocol_counts(),
            [(0, 0), (0, 0), (2, 176), (0, 0)],
            "network totals"
        );

        let expected_hosts = [
            [(0, 0), (0, 0), (0, 0), (0, 0)],
            [(0, 0), (0, 0), (2, 176), (0, 0)],
            [(0, 0), (0, 0), (0, 0), (0, 0)],
            [(0, 0), (0, 0), (0, 0), (0, 0)],
        ];
        for (index, expected) in expected_hosts.iter().enumerate() {
            assert_eq!(r.protocol_counts(), *expected, "host bucket {index}");
        }
        assert!(r.exhausted(), "no trailing bytes");
    }

    #[test]
    fn test_negative_delta_serializes_as_signed() {
        // Capture over-count relative to the kernel shows up as a negative
        // captured-vs-extrapolated gap; the wire format must carry the sign.
        let mut state = populated_state();
        let mut captured = state.totals;
        captured.packets.start = captured.packets.end + 3;
        let (start, end) = window();

        let mut out = Vec::new();
        emit(&mut out, OutputFormat::Binary, &mut state, captured, start, end).unwrap();

        let mut r = Reader::new(&out);
        r.u8();
        r.i64();
        r.u32();
        r.i64();
        r.u32();
        for _ in 0..5 {
            r.i64();
        }
        r.counts(); // iface total
        assert_eq!(r.counts(), (-3, 354), "captured packets delta is negative");
    }
}
