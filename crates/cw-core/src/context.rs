use crate::model::{ChainId, Protocol};
use anyhow::Result;

/// Channel for human-readable progress messages.
pub trait Context {
    fn notice(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Runs a single command line and returns its captured stdout.
///
/// A non-zero exit is an error; nothing is retried.
pub trait CommandRunner {
    fn execute(&self, command: &str) -> Result<String>;
}

/// Writes the live ruleset of a protocol family to durable storage.
pub trait Persister {
    fn persist(&self, ctx: &dyn Context, name: &ChainId, protocol: Protocol) -> Result<()>;
}

/// Default context that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingContext;

impl Context for TracingContext {
    fn notice(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// Persister used when the ruleset should stay in memory only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersister;

impl Persister for NoopPersister {
    fn persist(&self, _ctx: &dyn Context, name: &ChainId, protocol: Protocol) -> Result<()> {
        tracing::debug!("Persistence disabled, not saving {} ruleset for {}", protocol, name);
        Ok(())
    }
}
