use crate::model::{Protocol, Table};

/// Every chain name the kernel provides in some table.
pub const RESERVED_CHAINS: &[&str] = &[
    "PREROUTING",
    "POSTROUTING",
    "BROUTING",
    "INPUT",
    "FORWARD",
    "OUTPUT",
];

const FILTER_CHAINS: &[&str] = &["INPUT", "FORWARD", "OUTPUT"];
const NAT_CHAINS: &[&str] = &["PREROUTING", "POSTROUTING", "INPUT", "OUTPUT"];
const MANGLE_CHAINS: &[&str] = &["PREROUTING", "POSTROUTING", "INPUT", "FORWARD", "OUTPUT"];
const RAW_CHAINS: &[&str] = &["PREROUTING", "OUTPUT"];
const ETHERNET_NAT_CHAINS: &[&str] = &["PREROUTING", "OUTPUT", "POSTROUTING"];
const BROUTE_CHAINS: &[&str] = &["BROUTING"];

/// Static table of the inbuilt chains per (table, protocol).
///
/// Inbuilt chains always exist, cannot be created or destroyed and are the
/// only chains that carry a default policy.
pub struct ChainCatalog;

impl ChainCatalog {
    pub fn inbuilt_chains(table: Table, protocol: Protocol) -> &'static [&'static str] {
        match (protocol, table) {
            (Protocol::IPv4 | Protocol::IPv6, Table::Filter | Table::Security) => FILTER_CHAINS,
            (Protocol::IPv4 | Protocol::IPv6, Table::Nat) => NAT_CHAINS,
            (Protocol::IPv4 | Protocol::IPv6, Table::Mangle) => MANGLE_CHAINS,
            (Protocol::IPv4 | Protocol::IPv6, Table::Raw) => RAW_CHAINS,
            (Protocol::IPv4 | Protocol::IPv6, Table::Broute) => &[],
            (Protocol::Ethernet, Table::Filter) => FILTER_CHAINS,
            (Protocol::Ethernet, Table::Nat) => ETHERNET_NAT_CHAINS,
            (Protocol::Ethernet, Table::Broute) => BROUTE_CHAINS,
            (Protocol::Ethernet, Table::Mangle | Table::Raw | Table::Security) => &[],
        }
    }

    pub fn is_inbuilt(table: Table, protocol: Protocol, chain: &str) -> bool {
        Self::inbuilt_chains(table, protocol).contains(&chain)
    }

    /// Whether a chain name is kernel-reserved in any table.
    pub fn is_reserved(chain: &str) -> bool {
        RESERVED_CHAINS.contains(&chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_and_security_share_inbuilt_chains() {
        for table in [Table::Filter, Table::Security] {
            assert!(ChainCatalog::is_inbuilt(table, Protocol::IPv4, "INPUT"));
            assert!(ChainCatalog::is_inbuilt(table, Protocol::IPv6, "FORWARD"));
            assert!(!ChainCatalog::is_inbuilt(table, Protocol::IPv4, "PREROUTING"));
        }
    }

    #[test]
    fn raw_only_has_prerouting_and_output() {
        assert!(ChainCatalog::is_inbuilt(Table::Raw, Protocol::IPv6, "OUTPUT"));
        assert!(ChainCatalog::is_inbuilt(Table::Raw, Protocol::IPv4, "PREROUTING"));
        assert!(!ChainCatalog::is_inbuilt(Table::Raw, Protocol::IPv4, "INPUT"));
        assert!(!ChainCatalog::is_inbuilt(Table::Raw, Protocol::IPv4, "TEST_TWO"));
    }

    #[test]
    fn broute_is_ethernet_only() {
        assert!(ChainCatalog::is_inbuilt(Table::Broute, Protocol::Ethernet, "BROUTING"));
        assert!(!ChainCatalog::is_inbuilt(Table::Broute, Protocol::IPv4, "BROUTING"));
        assert!(ChainCatalog::inbuilt_chains(Table::Broute, Protocol::IPv6).is_empty());
    }

    #[test]
    fn custom_names_are_not_reserved() {
        assert!(ChainCatalog::is_reserved("POSTROUTING"));
        assert!(!ChainCatalog::is_reserved("TEST_ONE"));
        assert!(!ChainCatalog::is_reserved("input"));
    }
}
