//! Interface statistics from `/sys/class/net`.
//!
//! The kernel exposes cumulative per-interface counters as one decimal
//! number per file under `<iface>/statistics/`. The daemon reads five of
//! them per reporting window for the configured direction:
//! `{rx,tx}_{packets,bytes,dropped,errors,fifo_errors}`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::cli::Direction;
use crate::error::Error;

const SYS_CLASS_NET: &str = "/sys/class/net";

/// One raw reading of the five kernel counters. Values are cumulative
/// since interface registration; byte counts are raw (no framing
/// overhead applied).
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceStats {
    pub packets: u64,
    pub bytes: u64,
    pub dropped: u64,
    pub errors: u64,
    pub fifo_errors: u64,
}

/// Reads the statistics files for one interface and direction.
#[derive(Debug)]
pub struct StatsReader {
    dir: PathBuf,
    prefix: &'static str,
}

impl StatsReader {
    pub fn new(iface: &str, direction: Direction) -> Self {
        StatsReader {
            dir: Path::new(SYS_CLASS_NET).join(iface).join("statistics"),
            prefix: direction.stats_prefix(),
        }
    }

    /// Point the reader at an arbitrary statistics directory instead of
    /// `/sys/class/net/<iface>/statistics`.
    #[cfg(test)]
    pub fn from_dir(dir: PathBuf, direction: Direction) -> Self {
        StatsReader { dir, prefix: direction.stats_prefix() }
    }

    /// Read all five counters. Any unreadable or unparseable file is fatal:
    /// without an authoritative reading there is nothing to reconcile
    /// against.
    pub fn read(&self) -> Result<InterfaceStats, Error> {
        Ok(InterfaceStats {
            packets: self.read_counter("packets")?,
            bytes: self.read_counter("bytes")?,
            dropped: self.read_counter("dropped")?,
            errors: self.read_counter("errors")?,
            fifo_errors: self.read_counter("fifo_errors")?,
        })
    }

    fn read_counter(&self, name: &str) -> Result<u64, Error> {
        let path = self.dir.join(format!("{}_{}", self.prefix, name));
        let contents = fs::read_to_string(&path)
            .map_err(|source| Error::Stats { path: path.clone(), source })?;
        contents.trim().parse().map_err(|_| Error::Stats {
            path,
            source: io::Error::new(io::ErrorKind::InvalidData, "not a counter"),
        })
    }
}
