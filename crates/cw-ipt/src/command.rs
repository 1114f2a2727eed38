use anyhow::{Context, Result};
use cw_core::{ChainId, CommandRunner, Policy};
use std::process::Command;

pub fn new_chain(id: &ChainId) -> String {
    format!("{} -t {} -N {}", id.protocol.family(), id.table, id.chain)
}

pub fn set_policy(id: &ChainId, policy: Policy) -> String {
    format!(
        "{} -t {} -P {} {}",
        id.protocol.family(),
        id.table,
        id.chain,
        policy.as_target()
    )
}

pub fn flush_chain(id: &ChainId) -> String {
    format!("{} -t {} -F {}", id.protocol.family(), id.table, id.chain)
}

pub fn delete_chain(id: &ChainId) -> String {
    format!("{} -t {} -X {}", id.protocol.family(), id.table, id.chain)
}

/// Runs commands on the local host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn execute(&self, command: &str) -> Result<String> {
        let mut args = command.split_whitespace();
        let program = args
            .next()
            .with_context(|| format!("Empty command line '{}'", command))?;

        tracing::debug!("Executing: {}", command);

        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Command '{}' failed: {}", command, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lines_follow_family() {
        let v4: ChainId = "TEST_ONE:filter:IPv4".parse().unwrap();
        let v6: ChainId = "OUTPUT:raw:IPv6".parse().unwrap();
        let eth: ChainId = "BROUTING:broute:ethernet".parse().unwrap();

        assert_eq!(new_chain(&v4), "iptables -t filter -N TEST_ONE");
        assert_eq!(set_policy(&v6, Policy::Queue), "ip6tables -t raw -P OUTPUT QUEUE");
        assert_eq!(flush_chain(&v6), "ip6tables -t raw -F OUTPUT");
        assert_eq!(delete_chain(&v4), "iptables -t filter -X TEST_ONE");
        assert_eq!(set_policy(&eth, Policy::Drop), "iptables -t broute -P BROUTING DROP");
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(SystemRunner::new().execute("   ").is_err());
    }
}
