//! Property tests for target parsing and range expansion

use proptest::prelude::*;
use std::net::Ipv4Addr;

use deimos::utils::target_parser::TargetSpec;

proptest! {
    /// Every range excludes exactly the network and broadcast addresses.
    #[test]
    fn expansion_excludes_network_and_broadcast(base in any::<u32>(), prefix in 16u8..=30) {
        let input = format!("{}/{}", Ipv4Addr::from(base), prefix);
        let spec = TargetSpec::parse(&input).unwrap();

        let mask = u32::MAX << (32 - prefix);
        let network = base & mask;
        let broadcast = network | !mask;

        let hosts = spec.hosts();
        let total = 1u64 << (32 - prefix);
        prop_assert_eq!(hosts.len() as u64, total - 2);
        prop_assert_eq!(hosts[0], Ipv4Addr::from(network + 1));
        prop_assert_eq!(*hosts.last().unwrap(), Ipv4Addr::from(broadcast - 1));
        prop_assert!(!hosts.contains(&Ipv4Addr::from(network)));
        prop_assert!(!hosts.contains(&Ipv4Addr::from(broadcast)));
    }

    /// Expansion order is ascending, with no duplicates.
    #[test]
    fn expansion_is_ascending(base in any::<u32>(), prefix in 24u8..=30) {
        let input = format!("{}/{}", Ipv4Addr::from(base), prefix);
        let hosts = TargetSpec::parse(&input).unwrap().hosts();
        for pair in hosts.windows(2) {
            prop_assert!(u32::from(pair[0]) < u32::from(pair[1]));
        }
    }

    /// Any syntactically valid dotted quad parses as a single target.
    #[test]
    fn single_addresses_round_trip(a in any::<u8>(), b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
        let input = format!("{}.{}.{}.{}", a, b, c, d);
        let spec = TargetSpec::parse(&input).unwrap();
        prop_assert_eq!(spec, TargetSpec::Single(Ipv4Addr::new(a, b, c, d)));
    }
}
