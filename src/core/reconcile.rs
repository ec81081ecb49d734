//! Once-per-window reconciliation against the kernel's interface counters.
//!
//! Capture misses packets under load (and can momentarily over-count
//! relative to a kernel reading taken at a different instant). The
//! reconciler computes the run-long discrepancy between the kernel's
//! counters and the captured totals, then redistributes it across every
//! leaf bucket in proportion to each leaf's current window delta, so the
//! reported tree sums exactly to what the interface actually moved.
//!
//! The walk order is part of the output contract: integer division
//! truncates toward zero, and the running decrements of the remaining
//! adjustment and remaining delta make the last non-zero leaf visited
//! absorb the residue. Order: unparseable, other_network (icmp, udp, tcp,
//! other), then each network in declaration order, hosts in index order.

use crate::core::counters::{Counts, ProtocolCounts, Sample};
use crate::core::state::CoreState;
use crate::error::Error;

/// Running remainders of one redistribution pass. Packets and bytes are
/// reconciled in the same walk but with independent quotients.
struct Spread {
    delta_packets: i64,
    delta_bytes: i64,
    adjust_packets: i64,
    adjust_bytes: i64,
}

impl Spread {
    fn exhausted(&self) -> bool {
        self.delta_packets == 0
            && self.delta_bytes == 0
            && self.adjust_packets == 0
            && self.adjust_bytes == 0
    }
}

/// Give one leaf sample its proportional share of the remaining
/// adjustment, keeping the global total (and, for host buckets, the
/// network subtotal) in sync.
fn adjust_sample(
    delta: &mut i64,
    adjust: &mut i64,
    total: &mut Sample,
    network: Option<&mut Sample>,
    target: &mut Sample,
) {
    let target_delta = target.delta();
    if target_delta == 0 {
        return;
    }
    debug_assert!(*delta != 0, "leaf delta outlives the remaining total delta");

    let share = *adjust * target_delta / *delta;
    if share != 0 {
        target.end += share;
        total.end += share;
        if let Some(net) = network {
            net.end += share;
        }
        *adjust -= share;
    }
    *delta -= target_delta;
}

fn adjust_counts(
    spread: &mut Spread,
    total: &mut Counts,
    network: Option<&mut Counts>,
    target: &mut Counts,
) {
    let (net_packets, net_bytes) = match network {
        Some(net) => (Some(&mut net.packets), Some(&mut net.bytes)),
        None => (None, None),
    };
    adjust_sample(
        &mut spread.delta_packets,
        &mut spread.adjust_packets,
        &mut total.packets,
        net_packets,
        &mut target.packets,
    );
    adjust_sample(
        &mut spread.delta_bytes,
        &mut spread.adjust_bytes,
        &mut total.bytes,
        net_bytes,
        &mut target.bytes,
    );
}

fn adjust_protocol_counts(
    spread: &mut Spread,
    total: &mut Counts,
    mut network: Option<&mut ProtocolCounts>,
    target: &mut ProtocolCounts,
) {
    adjust_counts(spread, total, network.as_deref_mut().map(|net| &mut net.icmp), &mut target.icmp);
    adjust_counts(spread, total, network.as_deref_mut().map(|net| &mut net.udp), &mut target.udp);
    adjust_counts(spread, total, network.as_deref_mut().map(|net| &mut net.tcp), &mut target.tcp);
    adjust_counts(spread, total, network.as_deref_mut().map(|net| &mut net.other), &mut target.other);
}

impl CoreState {
    /// Redistribute the kernel-vs-captured discrepancy across the leaf
    /// buckets.
    ///
    /// Fresh kernel counters must already be loaded into `ifstats` and the
    /// pre-extrapolation snapshot taken by the caller. Negative
    /// adjustments are clamped so no leaf delta is driven below zero; the
    /// tree therefore ends the pass with
    /// `totals = unparseable + other_network + Σ hosts` intact and all
    /// deltas non-negative.
    pub fn extrapolate(&mut self) -> Result<(), Error> {
        let mut spread = Spread {
            adjust_packets: self.ifstats.total.packets.end
                - self.ifstats.start_packets
                - self.totals.packets.end,
            adjust_bytes: self.ifstats.total.bytes.end
                - self.ifstats.start_bytes
                - self.totals.bytes.end,
            delta_packets: self.totals.packets.delta(),
            delta_bytes: self.totals.bytes.delta(),
        };

        if spread.adjust_packets == 0 && spread.adjust_bytes == 0 {
            return Ok(());
        }
        // Nothing captured this window: there is no proportion to spread
        // by. The anchor keeps the comparison alive for the next window.
        if spread.delta_packets == 0 && spread.delta_bytes == 0 {
            return Ok(());
        }

        // Never remove more than this window actually counted.
        if spread.adjust_packets < 0 && -spread.adjust_packets > spread.delta_packets {
            spread.adjust_packets = -spread.delta_packets;
        }
        if spread.adjust_bytes < 0 && -spread.adjust_bytes > spread.delta_bytes {
            spread.adjust_bytes = -spread.delta_bytes;
        }

        let CoreState { totals, unparseable, other_network, networks, .. } = self;

        adjust_counts(&mut spread, totals, None, unparseable);
        adjust_protocol_counts(&mut spread, totals, None, other_network);
        for net in networks.iter_mut() {
            for host in net.hosts.iter_mut() {
                adjust_protocol_counts(&mut spread, totals, Some(&mut net.totals), host);
            }
        }

        if !spread.exhausted() {
            return Err(Error::AdjustResidue {
                adjust_packets: spread.adjust_packets,
                adjust_bytes: spread.adjust_bytes,
                delta_packets: spread.delta_packets,
                delta_bytes: spread.delta_bytes,
            });
        }
        Ok(())
    }
}
