use crate::catalog::ChainCatalog;
use crate::error::ChainError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Filter,
    Nat,
    Mangle,
    Raw,
    Security,
    Broute,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Nat => "nat",
            Self::Mangle => "mangle",
            Self::Raw => "raw",
            Self::Security => "security",
            Self::Broute => "broute",
        }
    }
}

impl FromStr for Table {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter" => Ok(Self::Filter),
            "nat" => Ok(Self::Nat),
            "mangle" => Ok(Self::Mangle),
            "raw" => Ok(Self::Raw),
            "security" => Ok(Self::Security),
            "broute" => Ok(Self::Broute),
            other => Err(ChainError::UnknownTable(other.to_string())),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Protocol {
    IPv4,
    IPv6,
    #[serde(rename = "ethernet")]
    Ethernet,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IPv4 => "IPv4",
            Self::IPv6 => "IPv6",
            Self::Ethernet => "ethernet",
        }
    }

    /// Binary used for mutating commands. Ethernet chains go through the IPv4 family.
    pub fn family(&self) -> &'static str {
        match self {
            Self::IPv4 | Self::Ethernet => "iptables",
            Self::IPv6 => "ip6tables",
        }
    }

    pub fn save_command(&self) -> &'static str {
        match self {
            Self::IPv4 | Self::Ethernet => "iptables-save",
            Self::IPv6 => "ip6tables-save",
        }
    }
}

impl FromStr for Protocol {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IPv4" => Ok(Self::IPv4),
            "IPv6" => Ok(Self::IPv6),
            "ethernet" => Ok(Self::Ethernet),
            other => Err(ChainError::UnknownProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Accept,
    Drop,
    Queue,
    Return,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Drop => "drop",
            Self::Queue => "queue",
            Self::Return => "return",
        }
    }

    /// Uppercase form used on the iptables command line and in save text.
    pub fn as_target(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
            Self::Queue => "QUEUE",
            Self::Return => "RETURN",
        }
    }

    /// Decode the policy column of a `:CHAIN POLICY [pkts:bytes]` header.
    /// `-` marks a custom chain and yields `Ok(None)`.
    pub fn from_header(column: &str) -> Result<Option<Self>, ChainError> {
        match column {
            "-" => Ok(None),
            "ACCEPT" => Ok(Some(Self::Accept)),
            "DROP" => Ok(Some(Self::Drop)),
            "QUEUE" => Ok(Some(Self::Queue)),
            "RETURN" => Ok(Some(Self::Return)),
            other => Err(ChainError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// Identity of a chain resource, rendered as `CHAIN:TABLE:PROTOCOL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId {
    pub chain: String,
    pub table: Table,
    pub protocol: Protocol,
}

impl ChainId {
    pub fn new(chain: impl Into<String>, table: Table, protocol: Protocol) -> Self {
        Self {
            chain: chain.into(),
            table,
            protocol,
        }
    }

    pub fn is_inbuilt(&self) -> bool {
        ChainCatalog::is_inbuilt(self.table, self.protocol, &self.chain)
    }
}

impl FromStr for ChainId {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Chain names may themselves contain ':', so split from the right.
        let mut parts = s.rsplitn(3, ':');
        let (Some(protocol), Some(table), Some(chain)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ChainError::InvalidName(s.to_string()));
        };

        if chain.is_empty() {
            return Err(ChainError::InvalidName(s.to_string()));
        }

        Ok(Self {
            chain: chain.to_string(),
            table: table.parse()?,
            protocol: protocol.parse()?,
        })
    }
}

impl TryFrom<String> for ChainId {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chain, self.table, self.protocol)
    }
}

/// A chain resource, either desired (loaded from a document) or observed
/// (reconstructed from save text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub name: ChainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
    #[serde(default)]
    pub purge: bool,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub ignore_foreign: bool,
    #[serde(default)]
    pub ensure: Ensure,
}

impl ChainRecord {
    pub fn new(name: ChainId) -> Self {
        Self {
            name,
            policy: None,
            purge: false,
            ignore: Vec::new(),
            ignore_foreign: false,
            ensure: Ensure::Present,
        }
    }

    /// Observed state for a live chain: control attributes carry their defaults.
    pub fn observed(name: ChainId, policy: Option<Policy>) -> Self {
        Self {
            policy,
            ..Self::new(name)
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    pub fn chain(&self) -> &str {
        &self.name.chain
    }

    pub fn table(&self) -> Table {
        self.name.table
    }

    pub fn protocol(&self) -> Protocol {
        self.name.protocol
    }

    pub fn is_inbuilt(&self) -> bool {
        self.name.is_inbuilt()
    }

    /// Fill in what a desired record leaves implicit: a present inbuilt chain
    /// without a policy is expected to run with `accept`.
    pub fn normalize(&mut self) {
        if self.ensure == Ensure::Present && self.policy.is_none() && self.is_inbuilt() {
            self.policy = Some(Policy::Accept);
        }
    }
}

/// Attributes of a chain resource, as named by the in-sync check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Name,
    Policy,
    Ensure,
    Purge,
    Ignore,
    IgnoreForeign,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Policy => "policy",
            Self::Ensure => "ensure",
            Self::Purge => "purge",
            Self::Ignore => "ignore",
            Self::IgnoreForeign => "ignore_foreign",
        }
    }

    /// Control attributes only steer reconciliation and are never observed.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Purge | Self::Ignore | Self::IgnoreForeign)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}
