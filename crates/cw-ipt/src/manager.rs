use crate::command;
use crate::purge::{PurgeDescriptor, PurgeGenerator};
use crate::save::SaveDump;
use anyhow::Result;
use cw_core::{
    ChainCatalog, ChainId, ChainRecord, CommandRunner, Context, Persister, Policy, Property,
    Protocol, verify,
};

/// Families whose save output makes up the live inventory.
const SAVE_FAMILIES: [Protocol; 2] = [Protocol::IPv4, Protocol::IPv6];

/// Reconciles chain resources against the live iptables state.
pub struct ChainManager<R, P> {
    runner: R,
    persister: P,
}

impl<R: CommandRunner, P: Persister> ChainManager<R, P> {
    pub fn new(runner: R, persister: P) -> Self {
        Self { runner, persister }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// Inventory of every chain declared in the IPv4 and IPv6 save output
    pub fn get(&self, _ctx: &dyn Context) -> Result<Vec<ChainRecord>> {
        let mut records = Vec::new();

        for protocol in SAVE_FAMILIES {
            let text = self.runner.execute(protocol.save_command())?;
            let dump = SaveDump::parse(&text, protocol);

            for header in dump.headers {
                let policy = if ChainCatalog::is_inbuilt(header.table, protocol, &header.chain) {
                    header.policy
                } else {
                    None
                };
                let id = ChainId::new(header.chain, header.table, protocol);
                records.push(ChainRecord::observed(id, policy));
            }
        }

        Ok(records)
    }

    /// `Some(true)` for control attributes, which are never compared with
    /// live state; `None` leaves the comparison to the caller.
    pub fn insync(
        &self,
        ctx: &dyn Context,
        _name: &ChainId,
        property: Property,
        _is: &ChainRecord,
        _should: &ChainRecord,
    ) -> Option<bool> {
        ctx.debug(&format!("Checking whether '{}' is out of sync", property));
        property.is_control().then_some(true)
    }

    pub fn create(&self, ctx: &dyn Context, name: &ChainId, should: &ChainRecord) -> Result<()> {
        verify(should)?;

        ctx.notice(&format!("Creating Chain '{}'", name));
        self.runner.execute(&command::new_chain(&should.name))?;
        self.persist(ctx, name, should.protocol());
        Ok(())
    }

    /// Only a policy change on an inbuilt chain results in a command.
    pub fn update(
        &self,
        ctx: &dyn Context,
        name: &ChainId,
        should: &ChainRecord,
        is: &ChainRecord,
    ) -> Result<()> {
        let Some(policy) = should.policy else {
            return Ok(());
        };
        if should.policy == is.policy || !should.is_inbuilt() {
            return Ok(());
        }

        ctx.notice(&format!("Updating Chain '{}' policy to '{}'", name, policy));
        self.runner.execute(&command::set_policy(&should.name, policy))?;
        self.persist(ctx, name, should.protocol());
        Ok(())
    }

    /// Flush the chain, then destroy it, or reset the policy of an inbuilt one.
    pub fn delete(&self, ctx: &dyn Context, name: &ChainId, is: &ChainRecord) -> Result<()> {
        ctx.notice(&format!("Flushing Chain '{}'", name));
        self.runner.execute(&command::flush_chain(&is.name))?;

        if is.is_inbuilt() {
            ctx.notice(&format!("Reverting Internal Chain '{}' to its inbuilt policy", name));
            self.runner
                .execute(&command::set_policy(&is.name, Policy::Accept))?;
        } else {
            ctx.notice(&format!("Deleting Chain '{}'", name));
            self.runner.execute(&command::delete_chain(&is.name))?;
        }

        self.persist(ctx, name, is.protocol());
        Ok(())
    }

    /// Rules of a purged chain that the caller should delete
    pub fn generate(
        &self,
        ctx: &dyn Context,
        name: &ChainId,
        _current: Option<&ChainRecord>,
        should: &ChainRecord,
    ) -> Result<Vec<PurgeDescriptor>> {
        if !should.purge {
            return Ok(Vec::new());
        }

        let generator = PurgeGenerator::new(should.ignore.as_slice(), should.ignore_foreign)?;
        let protocol = should.protocol();
        let text = self.runner.execute(protocol.save_command())?;
        let dump = SaveDump::parse(&text, protocol);

        let purges = generator.generate(&dump, &should.name);
        ctx.debug(&format!(
            "Found {} rule(s) to purge from Chain '{}'",
            purges.len(),
            name
        ));
        Ok(purges)
    }

    fn persist(&self, ctx: &dyn Context, name: &ChainId, protocol: Protocol) {
        if let Err(e) = self.persister.persist(ctx, name, protocol) {
            tracing::warn!("Failed to persist {} ruleset after changing {}: {:#}", protocol, name, e);
        }
    }
}
