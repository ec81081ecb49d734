//! Live packet capture and the accounting loop.
//!
//! Single-threaded and cooperative: the blocking capture read (bounded by
//! the 100 ms timeout) drives everything. Each delivered frame is
//! classified inline, and when a frame's wall-clock second differs from the
//! last report's, the same thread reconciles and reports before returning
//! to the next read. Reporting is packet-driven; idle seconds produce no
//! records.

use std::io::Write;

use pcap::{Active, Capture, Linktype};

use crate::cli::{Direction, OutputFormat};
use crate::clock::WallTime;
use crate::config::{CAPTURE_SNAPLEN, READ_TIMEOUT_MS};
use crate::core::state::CoreState;
use crate::error::Error;
use crate::report;
use crate::sysfs::StatsReader;

impl From<Direction> for pcap::Direction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::In => pcap::Direction::In,
            Direction::Out => pcap::Direction::Out,
        }
    }
}

/// Open the interface for live capture: promiscuous mode, snap length
/// covering the Ethernet and minimum IPv4 headers, the configured read
/// timeout, capture direction filtered to the accounted side. Anything but
/// an Ethernet link is fatal.
pub fn open(iface: &str, direction: Direction) -> Result<Capture<Active>, Error> {
    let cap = Capture::from_device(iface)?
        .promisc(true)
        .snaplen(CAPTURE_SNAPLEN)
        .timeout(READ_TIMEOUT_MS)
        .open()?;
    cap.direction(direction.into())?;

    let link = cap.get_datalink();
    if link != Linktype::ETHERNET {
        return Err(Error::LinkType(
            link.get_name().unwrap_or_else(|_| format!("link type {}", link.0)),
        ));
    }
    Ok(cap)
}

/// Drive the capture loop until a fatal error or end of capture.
pub fn run<W: Write>(
    cap: &mut Capture<Active>,
    state: &mut CoreState,
    stats: &StatsReader,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), Error> {
    loop {
        let now = match cap.next_packet() {
            Ok(packet) => {
                let now = WallTime::now()?;
                if now < state.last_output_time {
                    return Err(Error::TimeWentBackward);
                }
                state.classify(packet.data, packet.header.len, now);
                now
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(pcap::Error::NoMorePackets) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if now.sec != state.last_output_time.sec {
            report_window(cap, state, stats, format, out, now)?;
        }
    }
}

/// Close the reporting window ending at `now`: refresh the authoritative
/// counters, snapshot the captured totals, extrapolate, and emit.
fn report_window<W: Write>(
    cap: &mut Capture<Active>,
    state: &mut CoreState,
    stats: &StatsReader,
    format: OutputFormat,
    out: &mut W,
    now: WallTime,
) -> Result<(), Error> {
    let start = state.last_output_time;
    state.last_output_time = now;

    let raw = stats.read()?;
    state.ifstats.apply(&raw)?;

    let cap_stats = cap.stats()?;
    state.capture.update(cap_stats.received, cap_stats.dropped);

    // What capture actually saw, before extrapolation fills the gap.
    let captured = state.totals;
    state.extrapolate()?;

    report::emit(out, format, state, captured, start, now)
}
