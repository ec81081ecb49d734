//! Reporting-window record emission.
//!
//! One record is emitted per window, in the format chosen at startup.
//! Roll-forward is inline: every counter rolls immediately after the bytes
//! describing it are written, so a crash mid-record leaves the tree in an
//! "already reported" state for the portions that went out (the consumer
//! tolerates one truncated record on process exit). Text mode flushes
//! stdout after the record; binary consumers read a continuous stream.

mod binary;
mod text;

use std::io::Write;

use crate::cli::OutputFormat;
use crate::clock::WallTime;
use crate::core::counters::Counts;
use crate::core::state::CoreState;
use crate::error::Error;

/// Serialize one window's record and roll every counter forward.
///
/// `captured` is the pre-extrapolation snapshot of the totals; the
/// extrapolated totals are read from `state` itself.
pub fn emit<W: Write>(
    out: &mut W,
    format: OutputFormat,
    state: &mut CoreState,
    captured: Counts,
    start: WallTime,
    end: WallTime,
) -> Result<(), Error> {
    match format {
        OutputFormat::Text => text::write_header(out, state, captured, start, end),
        OutputFormat::Binary => binary::write_header(out, state, captured, start, end),
    }
    .map_err(Error::Write)?;

    state.ifstats.roll();
    state.capture.roll();
    state.totals.roll();
    state.unparseable.roll();
    state.other_network.roll();

    for (net_index, net) in state.networks.iter_mut().enumerate() {
        match format {
            OutputFormat::Text => text::write_network(out, net_index, net),
            OutputFormat::Binary => binary::write_network(out, net),
        }
        .map_err(Error::Write)?;
        net.totals.roll();

        for host_index in 0..net.hosts.len() {
            match format {
                OutputFormat::Text => text::write_host(out, net_index, host_index, net),
                OutputFormat::Binary => binary::write_host(out, &net.hosts[host_index]),
            }
            .map_err(Error::Write)?;
            net.hosts[host_index].roll();
        }
    }

    if format == OutputFormat::Text {
        out.flush().map_err(Error::Write)?;
    }
    Ok(())
}
