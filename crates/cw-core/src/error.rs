use thiserror::Error;

/// Errors raised while parsing or validating a chain resource.
///
/// The `Display` text of the validation variants is user-facing and stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("INPUT, OUTPUT and FORWARD are the only inbuilt chains that can be used in table '{0}'")]
    FilterChain(String),

    #[error(
        "PREROUTING, POSTROUTING, INPUT, FORWARD and OUTPUT are the only inbuilt chains that can be used in table 'mangle'"
    )]
    MangleChain,

    #[error(
        "PREROUTING, POSTROUTING, INPUT, and OUTPUT are the only inbuilt chains that can be used in table 'nat'"
    )]
    NatChain,

    #[error("PREROUTING and OUTPUT are the only inbuilt chains in the table 'raw'")]
    RawChain,

    #[error("BROUTE is only valid with protocol 'ethernet'")]
    BrouteProtocol,

    #[error("BROUTING is the only inbuilt chain allowed on table 'broute'")]
    BrouteChain,

    #[error("'policy' can only be set on Internal Chains. Setting for '{0}' is invalid")]
    PolicyOnCustomChain(String),

    #[error("Invalid chain resource name '{0}', expected CHAIN:TABLE:PROTOCOL")]
    InvalidName(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Unknown protocol '{0}'")]
    UnknownProtocol(String),

    #[error("Unknown policy '{0}'")]
    UnknownPolicy(String),

    #[error("Chain '{0}' is declared more than once")]
    Duplicate(String),
}
