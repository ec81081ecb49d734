//! Tracked IPv4 networks and the first-match lookup table.
//!
//! Each network owns a dense per-host array of protocol counters indexed by
//! the host bits of an address. The table is fixed at startup; lookup is a
//! linear scan in declaration order, which also defines the tie-break for
//! overlapping prefixes. Configurations list a handful of CIDRs, so at
//! classification rates a scan beats a tree.

use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::config::MIN_PREFIX;
use crate::core::counters::ProtocolCounts;
use crate::error::Error;

/// One tracked CIDR block with its per-host counter array.
#[derive(Debug)]
pub struct Ipv4Network {
    /// Network address with host bits cleared.
    pub network: Ipv4Addr,
    /// Prefix length, `MIN_PREFIX..=32`.
    pub prefix: u8,
    netmask: u32,
    hostmask: u32,
    /// Network-wide subtotal across all hosts.
    pub totals: ProtocolCounts,
    /// One bucket per host address, `1 << (32 - prefix)` entries, allocated
    /// at construction and never resized.
    pub hosts: Vec<ProtocolCounts>,
}

impl Ipv4Network {
    /// Whether `addr` (host byte order) falls inside this network.
    pub fn matches(&self, addr: u32) -> bool {
        addr & self.netmask == u32::from(self.network)
    }

    /// Dense index of `addr` within the host array. Only meaningful when
    /// [`matches`](Self::matches) holds.
    pub fn host_index(&self, addr: u32) -> usize {
        (addr & self.hostmask) as usize
    }

    /// The address of the host at `index`.
    pub fn host_addr(&self, index: usize) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | index as u32)
    }
}

impl FromStr for Ipv4Network {
    type Err = Error;

    /// Parse `A.B.C.D/p`. The stored network address is masked so host bits
    /// are cleared even if the input had them set.
    fn from_str(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidNetwork(s.to_string());

        let (addr_part, prefix_part) = s.split_once('/').ok_or_else(invalid)?;
        let prefix: u8 = prefix_part.parse().map_err(|_| invalid())?;
        if prefix > 32 {
            return Err(invalid());
        }
        if prefix < MIN_PREFIX {
            return Err(Error::InvalidNetwork(format!(
                "{s}: prefix shorter than /{MIN_PREFIX} would allocate {} host buckets",
                1u64 << (32 - prefix)
            )));
        }
        let addr: Ipv4Addr = addr_part.parse().map_err(|_| invalid())?;

        // Low (32 - prefix) bits set; the shift of a /32 would overflow.
        let hostmask = u32::MAX.checked_shr(u32::from(prefix)).unwrap_or(0);
        let netmask = !hostmask;

        Ok(Ipv4Network {
            network: Ipv4Addr::from(u32::from(addr) & netmask),
            prefix,
            netmask,
            hostmask,
            totals: ProtocolCounts::default(),
            hosts: vec![ProtocolCounts::default(); 1usize << (32 - prefix)],
        })
    }
}

/// The ordered set of tracked networks, fixed at startup.
#[derive(Debug, Default)]
pub struct NetworkTable {
    networks: Vec<Ipv4Network>,
}

impl NetworkTable {
    /// Parse the configured CIDR list, preserving declaration order.
    pub fn from_cidrs(cidrs: &[String]) -> Result<Self, Error> {
        let networks = cidrs
            .iter()
            .map(|cidr| cidr.parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NetworkTable { networks })
    }

    /// First network containing `addr` (host byte order), with the host
    /// index of `addr` inside it.
    pub fn find(&mut self, addr: u32) -> Option<(&mut Ipv4Network, usize)> {
        self.networks.iter_mut().find(|net| net.matches(addr)).map(|net| {
            let index = net.host_index(addr);
            (net, index)
        })
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ipv4Network> {
        self.networks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Ipv4Network> {
        self.networks.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cidrs: &[&str]) -> NetworkTable {
        let cidrs: Vec<String> = cidrs.iter().map(|s| s.to_string()).collect();
        NetworkTable::from_cidrs(&cidrs).expect("test networks should parse")
    }

    #[test]
    fn test_parse_class_c() {
        let net: Ipv4Network = "10.0.0.0/24".parse().unwrap();
        assert_eq!(net.network, Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(net.prefix, 24);
        assert_eq!(net.hosts.len(), 256);
    }

    #[test]
    fn test_parse_clears_host_bits() {
        let net: Ipv4Network = "10.0.0.57/24".parse().unwrap();
        assert_eq!(net.network, Ipv4Addr::new(10, 0, 0, 0), "host bits are masked off");
    }

    #[test]
    fn test_parse_single_host_prefix() {
        let net: Ipv4Network = "192.168.1.7/32".parse().unwrap();
        assert_eq!(net.hosts.len(), 1);
        assert_eq!(net.host_index(u32::from(Ipv4Addr::new(192, 168, 1, 7))), 0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["10.0.0.0", "10.0.0.0/33", "10.0.0/24", "ten.0.0.0/24", "10.0.0.0/x", ""] {
            assert!(
                bad.parse::<Ipv4Network>().is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_infeasible_prefix() {
        assert!("10.0.0.0/0".parse::<Ipv4Network>().is_err());
        assert!("10.0.0.0/7".parse::<Ipv4Network>().is_err());
        assert!("10.0.0.0/8".parse::<Ipv4Network>().is_ok(), "/8 is the ceiling");
    }

    #[test]
    fn test_masks_are_complementary() {
        let net: Ipv4Network = "172.16.0.0/12".parse().unwrap();
        assert_eq!(net.netmask ^ net.hostmask, u32::MAX);
        assert_eq!(net.netmask, 0xFFF0_0000);
    }

    #[test]
    fn test_host_index_in_range_for_matching_addresses() {
        let net: Ipv4Network = "10.1.2.0/23".parse().unwrap();
        for last in [0u32, 1, 255, 256, 511] {
            let addr = u32::from(Ipv4Addr::new(10, 1, 2, 0)) + last;
            assert!(net.matches(addr));
            let index = net.host_index(addr);
            assert!(index < net.hosts.len(), "index {index} out of range");
        }
    }

    #[test]
    fn test_host_addr_round_trips_index() {
        let net: Ipv4Network = "10.0.0.0/24".parse().unwrap();
        assert_eq!(net.host_addr(5), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(net.host_index(u32::from(net.host_addr(5))), 5);
    }

    #[test]
    fn test_find_miss() {
        let mut table = table(&["10.0.0.0/24"]);
        assert!(table.find(u32::from(Ipv4Addr::new(192, 168, 1, 1))).is_none());
    }

    #[test]
    fn test_find_first_match_wins_on_overlap() {
        // Declaration order is the tie-break: the /16 shadows the /24.
        let mut table = table(&["10.0.0.0/16", "10.0.0.0/24"]);
        let addr = u32::from(Ipv4Addr::new(10, 0, 0, 5));
        let (net, index) = table.find(addr).expect("address is covered");
        assert_eq!(net.prefix, 16);
        assert_eq!(index, 5);
    }

    #[test]
    fn test_find_falls_through_to_later_network() {
        let mut table = table(&["10.0.0.0/24", "10.0.0.0/16"]);
        let addr = u32::from(Ipv4Addr::new(10, 0, 7, 9));
        let (net, index) = table.find(addr).expect("covered by the /16");
        assert_eq!(net.prefix, 16);
        assert_eq!(index, 7 * 256 + 9);
    }

    #[test]
    fn test_bad_cidr_in_list_fails_table_construction() {
        let cidrs = vec!["10.0.0.0/24".to_string(), "bogus".to_string()];
        assert!(NetworkTable::from_cidrs(&cidrs).is_err());
    }
}
