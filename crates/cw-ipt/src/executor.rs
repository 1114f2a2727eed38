use crate::manager::ChainManager;
use crate::purge::PurgeDescriptor;
use anyhow::Result;
use cw_core::{Action, ChainId, CommandRunner, Context, Persister, Plan};

/// Outcome of running a plan.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub applied: usize,
    pub purges: Vec<PurgeDescriptor>,
    pub failures: Vec<(ChainId, String)>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies plan actions through a `ChainManager`
pub struct Executor<'a, R, P> {
    manager: &'a ChainManager<R, P>,
    dry_run: bool,
}

impl<'a, R: CommandRunner, P: Persister> Executor<'a, R, P> {
    pub fn new(manager: &'a ChainManager<R, P>, dry_run: bool) -> Self {
        Self { manager, dry_run }
    }

    /// Run every action. A failing resource is recorded and the rest still run.
    pub fn execute(&self, ctx: &dyn Context, plan: &Plan) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for action in &plan.actions {
            if let Action::Skip { name, reason } = action {
                report.failures.push((name.clone(), reason.clone()));
                continue;
            }

            match self.execute_action(ctx, action) {
                Ok(purges) => {
                    report.applied += 1;
                    report.purges.extend(purges);
                }
                Err(e) => {
                    tracing::error!("{} failed: {:#}", action, e);
                    report.failures.push((action.name().clone(), format!("{:#}", e)));
                }
            }
        }

        report
    }

    fn execute_action(&self, ctx: &dyn Context, action: &Action) -> Result<Vec<PurgeDescriptor>> {
        // Purge only reads the ruleset, so it runs in dry-run mode as well.
        if self.dry_run && !matches!(action, Action::Purge { .. }) {
            ctx.notice(&format!("[DRY RUN] Would execute: {}", action));
            return Ok(Vec::new());
        }

        match action {
            Action::Create { desired } => {
                self.manager.create(ctx, &desired.name, desired)?;
            }
            Action::SetPolicy { desired, current } => {
                self.manager.update(ctx, &desired.name, desired, current)?;
            }
            Action::Delete { current } => {
                self.manager.delete(ctx, &current.name, current)?;
            }
            Action::Purge { desired } => {
                return self.manager.generate(ctx, &desired.name, None, desired);
            }
            Action::Skip { .. } => {}
        }

        Ok(Vec::new())
    }
}
