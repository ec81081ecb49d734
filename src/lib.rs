//! Per-interface network traffic accounting daemon.
//!
//! Captures one direction of traffic on one interface, attributes every
//! frame to a (network, host, transport-protocol) bucket, reconciles the
//! captured totals against the kernel's interface counters once per
//! second, and writes one delta record per window to stdout.

pub mod capture;
pub mod cli;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod sysfs;

use std::io;

use crate::clock::WallTime;
use crate::core::network::NetworkTable;
use crate::core::state::CoreState;
use crate::error::Error;
use crate::sysfs::StatsReader;

/// Validate the configuration, anchor the kernel counters, open the
/// capture handle, and run the accounting loop until it ends.
///
/// The kernel counters are read before capture opens so the anchors never
/// include traffic the capture could have seen.
pub fn run(args: cli::Args) -> Result<(), Error> {
    if args.protocol_version != config::PROTOCOL_VERSION {
        return Err(Error::ProtocolVersion(args.protocol_version));
    }
    let networks = NetworkTable::from_cidrs(&args.networks)?;

    let start = WallTime::now()?;
    let stats = StatsReader::new(&args.iface, args.direction);
    let initial = stats.read()?;
    let mut state = CoreState::new(args.axis, networks, &initial, start)?;

    let mut cap = capture::open(&args.iface, args.direction)?;
    tracing::info!(
        "accounting {:?} traffic on {} by {:?} address across {} networks",
        args.direction,
        args.iface,
        args.axis,
        state.networks.len()
    );

    let mut out = io::stdout().lock();
    capture::run(&mut cap, &mut state, &stats, args.format, &mut out)
}
