use crate::error::ChainError;
use crate::model::{ChainRecord, Protocol};
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Desired chain layout for one host, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub chains: Vec<ChainRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_ipv4_path")]
    pub ipv4_path: PathBuf,
    #[serde(default = "default_ipv6_path")]
    pub ipv6_path: PathBuf,
}

impl PersistConfig {
    /// Rules file for a protocol family. Ethernet chains live in the IPv4 dump.
    pub fn path_for(&self, protocol: Protocol) -> &Path {
        match protocol {
            Protocol::IPv4 | Protocol::Ethernet => &self.ipv4_path,
            Protocol::IPv6 => &self.ipv6_path,
        }
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ipv4_path: default_ipv4_path(),
            ipv6_path: default_ipv6_path(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

fn default_ipv4_path() -> PathBuf {
    PathBuf::from("/etc/iptables/rules.v4")
}

fn default_ipv6_path() -> PathBuf {
    PathBuf::from("/etc/iptables/rules.v6")
}

impl DesiredState {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let mut state: Self = serde_yaml::from_str(yaml).context("Failed to parse chain document")?;

        let mut seen = HashSet::new();
        for chain in &mut state.chains {
            if !seen.insert(chain.name.clone()) {
                return Err(ChainError::Duplicate(chain.name.to_string()).into());
            }
            chain.normalize();
        }

        Ok(state)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chain document {}", path.display()))?;
        Self::from_yaml(&content)
    }
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            version: default_version(),
            persist: PersistConfig::default(),
            chains: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ensure, Policy, Table};

    #[test]
    fn loads_chains_with_defaults() {
        let yaml = r#"
chains:
  - name: "INPUT:filter:IPv4"
    policy: drop
    purge: true
    ignore: docker
  - name: "TEST_ONE:filter:IPv4"
    ignore_foreign: true
    ignore: ["^f2b-", "keep"]
  - name: "OUTPUT:raw:IPv6"
  - name: "OLD:raw:IPv6"
    ensure: absent
"#;
        let state = DesiredState::from_yaml(yaml).unwrap();
        assert_eq!(state.version, 1);
        assert!(state.persist.enabled);
        assert_eq!(state.chains.len(), 4);

        let input = &state.chains[0];
        assert_eq!(input.chain(), "INPUT");
        assert_eq!(input.policy, Some(Policy::Drop));
        assert!(input.purge);
        assert_eq!(input.ignore, vec!["docker".to_string()]);

        let custom = &state.chains[1];
        assert_eq!(custom.policy, None);
        assert!(custom.ignore_foreign);
        assert_eq!(custom.ignore.len(), 2);

        // Inbuilt chain without a policy is expected to accept.
        let output = &state.chains[2];
        assert_eq!(output.table(), Table::Raw);
        assert_eq!(output.policy, Some(Policy::Accept));

        assert_eq!(state.chains[3].ensure, Ensure::Absent);
    }

    #[test]
    fn rejects_duplicate_chains() {
        let yaml = r#"
chains:
  - name: "TEST_ONE:filter:IPv4"
  - name: "TEST_ONE:filter:IPv4"
    ensure: absent
"#;
        let err = DesiredState::from_yaml(yaml).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChainError>(),
            Some(&ChainError::Duplicate("TEST_ONE:filter:IPv4".into()))
        );
    }

    #[test]
    fn rejects_malformed_names() {
        let yaml = r#"
chains:
  - name: "INPUT:filter"
"#;
        assert!(DesiredState::from_yaml(yaml).is_err());
    }

    #[test]
    fn persist_paths_follow_family() {
        let yaml = r#"
persist:
  enabled: false
  ipv6_path: /tmp/rules.v6
"#;
        let state = DesiredState::from_yaml(yaml).unwrap();
        assert!(!state.persist.enabled);
        assert_eq!(
            state.persist.path_for(Protocol::Ethernet),
            Path::new("/etc/iptables/rules.v4")
        );
        assert_eq!(state.persist.path_for(Protocol::IPv6), Path::new("/tmp/rules.v6"));
    }
}
