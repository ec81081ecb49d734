//! Human-readable key-value record serialization.
//!
//! Counter pairs render as `packets/bytes` deltas in signed decimal. The
//! key schema is stable; downstream collectors parse it line by line.

use std::fmt;
use std::io::{self, Write};

use crate::clock::WallTime;
use crate::config::PROTOCOL_VERSION;
use crate::core::counters::{Counts, ProtocolCounts};
use crate::core::network::Ipv4Network;
use crate::core::state::CoreState;

/// Renders a counter pair as `packets/bytes` without allocating.
struct Pair<'a>(&'a Counts);

impl fmt::Display for Pair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.packets.delta(), self.0.bytes.delta())
    }
}

fn write_protocol_counts<W: Write>(
    out: &mut W,
    prefix: fmt::Arguments<'_>,
    counts: &ProtocolCounts,
) -> io::Result<()> {
    writeln!(out, "{prefix}.icmp={}", Pair(&counts.icmp))?;
    writeln!(out, "{prefix}.udp={}", Pair(&counts.udp))?;
    writeln!(out, "{prefix}.tcp={}", Pair(&counts.tcp))?;
    writeln!(out, "{prefix}.other={}", Pair(&counts.other))
}

pub(super) fn write_header<W: Write>(
    out: &mut W,
    state: &CoreState,
    captured: Counts,
    start: WallTime,
    end: WallTime,
) -> io::Result<()> {
    writeln!(out, "protocol={PROTOCOL_VERSION}")?;
    writeln!(out, "time.start={start}")?;
    writeln!(out, "time.end={end}")?;
    writeln!(out, "time.delta={}", end.since(start))?;
    writeln!(out, "iface.dropped={}", state.ifstats.dropped.delta())?;
    writeln!(out, "iface.errors={}", state.ifstats.errors.delta())?;
    writeln!(out, "iface.fifo_errors={}", state.ifstats.fifo_errors.delta())?;
    writeln!(out, "pcap.received={}", state.capture.received.delta())?;
    writeln!(out, "pcap.dropped={}", state.capture.dropped.delta())?;
    writeln!(out, "total.iface={}", Pair(&state.ifstats.total))?;
    writeln!(out, "total.captured={}", Pair(&captured))?;
    writeln!(out, "total.extrapolated={}", Pair(&state.totals))?;
    writeln!(out, "unparseable={}", Pair(&state.unparseable))?;
    write_protocol_counts(out, format_args!("other_network"), &state.other_network)?;
    writeln!(out, "networks.length={}", state.networks.len())
}

pub(super) fn write_network<W: Write>(
    out: &mut W,
    net_index: usize,
    net: &Ipv4Network,
) -> io::Result<()> {
    writeln!(out, "networks[{net_index}].ip_version=4")?;
    writeln!(out, "networks[{net_index}].network={}/{}", net.network, net.prefix)?;
    write_protocol_counts(out, format_args!("networks[{net_index}].total"), &net.totals)?;
    writeln!(out, "networks[{net_index}].ips.length={}", net.hosts.len())
}

pub(super) fn write_host<W: Write>(
    out: &mut W,
    net_index: usize,
    host_index: usize,
    net: &Ipv4Network,
) -> io::Result<()> {
    writeln!(
        out,
        "networks[{net_index}].ips[{host_index}].host={}",
        net.host_addr(host_index)
    )?;
    write_protocol_counts(
        out,
        format_args!("networks[{net_index}].ips[{host_index}]"),
        &net.hosts[host_index],
    )
}
