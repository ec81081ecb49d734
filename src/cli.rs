//! Command-line interface.
//!
//! All arguments are positional, in a fixed order, so the daemon can be
//! driven from supervisor configuration without option parsing on the
//! consumer side: `netmeter 1 text eth0 in dst 10.0.0.0/24 [...]`.

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "netmeter")]
#[command(about = "Per-interface network traffic accounting daemon")]
#[command(version)]
pub struct Args {
    /// Record protocol version; only 1 is defined.
    pub protocol_version: u8,

    /// Record serialization format.
    #[arg(value_enum)]
    pub format: OutputFormat,

    /// Network interface to account.
    pub iface: String,

    /// Traffic direction to capture and read kernel counters for.
    #[arg(value_enum)]
    pub direction: Direction,

    /// Address axis packets are attributed by.
    #[arg(value_enum)]
    pub axis: CountAxis,

    /// IPv4 networks to track, in A.B.C.D/p form. Overlaps are resolved
    /// first-match in the order given.
    #[arg(required = true)]
    pub networks: Vec<String>,
}

/// How records are serialized to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable key-value lines.
    Text,
    /// Fixed big-endian binary records.
    Binary,
}

/// Which direction of traffic is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Inbound: capture received frames, read rx_ counters.
    In,
    /// Outbound: capture transmitted frames, read tx_ counters.
    Out,
}

impl Direction {
    /// Prefix of the kernel statistics files for this direction.
    pub fn stats_prefix(self) -> &'static str {
        match self {
            Direction::In => "rx",
            Direction::Out => "tx",
        }
    }
}

/// Which IPv4 address a packet is attributed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CountAxis {
    /// Attribute by source address.
    Src,
    /// Attribute by destination address.
    Dst,
}
