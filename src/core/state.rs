//! The accounting state owned by the capture loop.
//!
//! `CoreState` holds the whole counter tree plus the authoritative-source
//! snapshots it is reconciled against. It is created once at startup and
//! passed by exclusive reference through the capture loop; nothing here is
//! shared across threads.

use crate::cli::CountAxis;
use crate::clock::WallTime;
use crate::config::FRAME_OVERHEAD_BYTES;
use crate::core::counters::{Counts, ProtocolCounts, Sample};
use crate::core::network::NetworkTable;
use crate::error::Error;
use crate::sysfs::InterfaceStats;

/// Snapshot of the kernel's cumulative counters for one interface and
/// direction, plus the process-start anchors the reconciler compares
/// against.
#[derive(Debug, Default)]
pub struct IfaceCounters {
    /// Kernel packet/byte totals; bytes include the per-packet Ethernet
    /// framing overhead so they are comparable with captured byte counts.
    pub total: Counts,
    pub dropped: Sample,
    pub errors: Sample,
    pub fifo_errors: Sample,
    /// Values of `total.*.end` at process start; they anchor the
    /// reconciliation comparison across the entire run.
    pub start_packets: i64,
    pub start_bytes: i64,
}

impl IfaceCounters {
    /// Load a fresh kernel reading into the `end` cursors.
    ///
    /// A cumulative kernel counter that decreased is fatal: the deltas
    /// derived from it would go negative downstream.
    pub fn apply(&mut self, raw: &InterfaceStats) -> Result<(), Error> {
        self.total.packets.end = raw.packets as i64;
        self.total.bytes.end = raw.bytes as i64 + raw.packets as i64 * FRAME_OVERHEAD_BYTES;
        self.dropped.end = raw.dropped as i64;
        self.errors.end = raw.errors as i64;
        self.fifo_errors.end = raw.fifo_errors as i64;

        if self.total.is_backward()
            || self.dropped.is_backward()
            || self.errors.is_backward()
            || self.fifo_errors.is_backward()
        {
            return Err(Error::StatsWentBackward);
        }
        Ok(())
    }

    pub fn roll(&mut self) {
        self.total.roll();
        self.dropped.roll();
        self.errors.roll();
        self.fifo_errors.roll();
    }
}

/// Rolling 64-bit totals over the capture library's 32-bit statistics.
#[derive(Debug, Default)]
pub struct CaptureCounters {
    pub received: Sample,
    pub dropped: Sample,
    last_received: u32,
    last_dropped: u32,
}

impl CaptureCounters {
    /// Fold a raw 32-bit reading into the 64-bit totals. Wrapping
    /// subtraction against the previous reading handles 32-bit wraparound.
    pub fn update(&mut self, received: u32, dropped: u32) {
        self.received.add(i64::from(received.wrapping_sub(self.last_received)));
        self.dropped.add(i64::from(dropped.wrapping_sub(self.last_dropped)));
        self.last_received = received;
        self.last_dropped = dropped;
    }

    pub fn roll(&mut self) {
        self.received.roll();
        self.dropped.roll();
    }
}

/// The complete accounting tree and reconciliation inputs.
#[derive(Debug)]
pub struct CoreState {
    /// Whether frames are attributed by source or destination address.
    pub axis: CountAxis,
    pub networks: NetworkTable,
    /// Every observed frame, whatever becomes of it.
    pub totals: Counts,
    /// Frames that could not be decoded far enough to classify.
    pub unparseable: Counts,
    /// Frames that parsed but matched no configured network.
    pub other_network: ProtocolCounts,
    pub ifstats: IfaceCounters,
    pub capture: CaptureCounters,
    /// End of the last reporting window.
    pub last_output_time: WallTime,
    /// Shared by both warning kinds; see the classifier's rate limit.
    pub last_warning_time: WallTime,
}

impl CoreState {
    /// Build the startup state: the initial kernel reading is loaded and
    /// immediately rolled so the first window starts from zero deltas, and
    /// its values become the run-long reconciliation anchors.
    pub fn new(
        axis: CountAxis,
        networks: NetworkTable,
        initial: &InterfaceStats,
        start_time: WallTime,
    ) -> Result<Self, Error> {
        let mut ifstats = IfaceCounters::default();
        ifstats.apply(initial)?;
        ifstats.roll();
        ifstats.start_packets = ifstats.total.packets.start;
        ifstats.start_bytes = ifstats.total.bytes.start;

        Ok(CoreState {
            axis,
            networks,
            totals: Counts::default(),
            unparseable: Counts::default(),
            other_network: ProtocolCounts::default(),
            ifstats,
            capture: CaptureCounters::default(),
            last_output_time: start_time,
            last_warning_time: WallTime::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(packets: u64, bytes: u64) -> InterfaceStats {
        InterfaceStats { packets, bytes, dropped: 0, errors: 0, fifo_errors: 0 }
    }

    #[test]
    fn test_apply_adds_frame_overhead_to_bytes() {
        let mut counters = IfaceCounters::default();
        counters.apply(&stats(10, 1000)).unwrap();
        assert_eq!(counters.total.packets.end, 10);
        assert_eq!(counters.total.bytes.end, 1000 + 10 * 24);
    }

    #[test]
    fn test_apply_detects_backward_counters() {
        let mut counters = IfaceCounters::default();
        counters.apply(&stats(10, 1000)).unwrap();
        counters.roll();

        let result = counters.apply(&stats(9, 1000));
        assert!(matches!(result, Err(Error::StatsWentBackward)));
    }

    #[test]
    fn test_new_anchors_and_rolls_initial_reading() {
        let state = CoreState::new(
            CountAxis::Dst,
            NetworkTable::default(),
            &stats(100, 5000),
            WallTime { sec: 1, usec: 0 },
        )
        .unwrap();

        assert_eq!(state.ifstats.start_packets, 100);
        assert_eq!(state.ifstats.start_bytes, 5000 + 100 * 24);
        assert_eq!(state.ifstats.total.packets.delta(), 0, "initial reading is rolled");
        assert_eq!(state.totals.packets.delta(), 0);
    }

    #[test]
    fn test_capture_counters_wraparound() {
        let mut cap = CaptureCounters::default();
        cap.update(u32::MAX - 1, 0);
        assert_eq!(cap.received.delta(), i64::from(u32::MAX - 1));

        // The raw 32-bit counter wraps; the 64-bit total keeps climbing.
        cap.update(3, 0);
        assert_eq!(cap.received.delta(), i64::from(u32::MAX) + 4);
    }

    #[test]
    fn test_capture_counters_roll() {
        let mut cap = CaptureCounters::default();
        cap.update(10, 2);
        cap.roll();
        assert_eq!(cap.received.delta(), 0);
        assert_eq!(cap.dropped.delta(), 0);

        cap.update(15, 2);
        assert_eq!(cap.received.delta(), 5);
        assert_eq!(cap.dropped.delta(), 0);
    }
}
