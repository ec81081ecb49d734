//! Unified error type for all fatal conditions.
//!
//! Every fatal path in the daemon maps to one `Error` variant, and every
//! variant maps to an errno-style process exit code. Transient per-packet
//! conditions (unparseable frames, unmatched networks) are never errors;
//! they are counted into sink buckets by the classifier.

use std::io;
use std::path::PathBuf;

/// Fatal error raised during startup or the capture loop.
///
/// Each variant maps to a distinct failure domain. The process exits with
/// the errno-style code from [`Error::exit_code`] for the first fatal error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid command-line argument value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A network argument was not a valid IPv4 CIDR, or its prefix is out
    /// of the accepted range.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// Unsupported record protocol version (only version 1 is defined).
    #[error("unsupported protocol version: must be 1, got {0}")]
    ProtocolVersion(u8),

    /// Failed to read an interface statistics counter file.
    #[error("reading {}: {source}", .path.display())]
    Stats { path: PathBuf, source: io::Error },

    /// Errors from the packet capture library.
    #[error("capture: {0}")]
    Capture(#[from] pcap::Error),

    /// The capture handle is not on an Ethernet link.
    #[error("only Ethernet link type is supported, got {0}")]
    LinkType(String),

    /// The wall clock moved backward relative to the last report.
    #[error("time went backward")]
    TimeWentBackward,

    /// A cumulative interface counter decreased between reads.
    #[error("interface statistics went backward")]
    StatsWentBackward,

    /// The proportional redistribution left a non-zero residue.
    #[error(
        "redistribution residue: adjust={adjust_packets}/{adjust_bytes} \
         delta={delta_packets}/{delta_bytes}"
    )]
    AdjustResidue {
        adjust_packets: i64,
        adjust_bytes: i64,
        delta_packets: i64,
        delta_bytes: i64,
    },

    /// A data record could not be written to stdout.
    #[error("writing record: {0}")]
    Write(#[source] io::Error),
}

impl Error {
    /// Errno-style exit code for this error, used as the process status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidNetwork(_)
            | Error::TimeWentBackward
            | Error::StatsWentBackward => 22, // EINVAL
            Error::Stats { .. } | Error::Capture(_) | Error::Write(_) => 5, // EIO
            Error::AdjustResidue { .. } => 71, // EPROTO
            Error::ProtocolVersion(_) | Error::LinkType(_) => 93, // EPROTONOSUPPORT
        }
    }
}
