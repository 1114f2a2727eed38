use crate::model::{ChainId, ChainRecord, Ensure, Policy};
use crate::validator::verify;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create {
        desired: ChainRecord,
    },
    SetPolicy {
        desired: ChainRecord,
        current: ChainRecord,
    },
    Delete {
        current: ChainRecord,
    },
    Purge {
        desired: ChainRecord,
    },
    Skip {
        name: ChainId,
        reason: String,
    },
}

impl Action {
    pub fn name(&self) -> &ChainId {
        match self {
            Action::Create { desired }
            | Action::SetPolicy { desired, .. }
            | Action::Purge { desired } => &desired.name,
            Action::Delete { current } => &current.name,
            Action::Skip { name, .. } => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create { desired } => write!(f, "Create chain: {}", desired.name),
            Action::SetPolicy { desired, current } => {
                let from = current.policy.map(|p| p.as_str()).unwrap_or("-");
                let to = desired.policy.map(|p| p.as_str()).unwrap_or("-");
                write!(f, "Set policy on {}: {} -> {}", desired.name, from, to)
            }
            Action::Delete { current } => {
                if current.is_inbuilt() {
                    write!(f, "Flush and revert inbuilt chain: {}", current.name)
                } else {
                    write!(f, "Flush and delete chain: {}", current.name)
                }
            }
            Action::Purge { desired } => {
                write!(f, "Purge unmanaged rules from: {}", desired.name)?;
                if desired.ignore_foreign {
                    write!(f, " (ignoring foreign rules)")?;
                }
                Ok(())
            }
            Action::Skip { name, reason } => write!(f, "Skip {}: {}", name, reason),
        }
    }
}

impl Plan {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Compare desired chains with the live inventory and order the work.
    ///
    /// Invalid desired chains become `Skip` actions; the rest of the plan is
    /// still built.
    pub fn build(desired: &[ChainRecord], current: &[ChainRecord]) -> Self {
        let live: HashMap<&ChainId, &ChainRecord> =
            current.iter().map(|record| (&record.name, record)).collect();

        let mut plan = Plan::new();

        for should in desired {
            let is = live.get(&should.name).copied();

            match should.ensure {
                Ensure::Present => {
                    if let Err(e) = verify(should) {
                        plan.actions.push(Action::Skip {
                            name: should.name.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }

                    // Inbuilt chains always exist. One missing from the save
                    // output sits in an unloaded table or an unlisted family
                    // and still runs with the kernel default.
                    let assumed;
                    let is = match is {
                        None if should.is_inbuilt() => {
                            assumed =
                                ChainRecord::observed(should.name.clone(), Some(Policy::Accept));
                            Some(&assumed)
                        }
                        other => other,
                    };

                    match is {
                        None => plan.actions.push(Action::Create {
                            desired: should.clone(),
                        }),
                        Some(is) if should.policy != is.policy => {
                            plan.actions.push(Action::SetPolicy {
                                desired: should.clone(),
                                current: is.clone(),
                            });
                        }
                        Some(_) => {}
                    }

                    if should.purge {
                        plan.actions.push(Action::Purge {
                            desired: should.clone(),
                        });
                    }
                }
                Ensure::Absent => {
                    if let Some(is) = is {
                        plan.actions.push(Action::Delete {
                            current: is.clone(),
                        });
                    }
                }
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn display(&self) {
        println!("Plan ({} actions):", self.actions.len());
        for (i, action) in self.actions.iter().enumerate() {
            println!("  {}. {}", i + 1, action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(name: &str, policy: Option<Policy>) -> ChainRecord {
        ChainRecord::observed(name.parse().unwrap(), policy)
    }

    fn desired(name: &str) -> ChainRecord {
        let mut record = ChainRecord::new(name.parse().unwrap());
        record.normalize();
        record
    }

    #[test]
    fn missing_custom_chain_is_created() {
        let plan = Plan::build(&[desired("TEST_ONE:filter:IPv4")], &[]);
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(&plan.actions[0], Action::Create { desired } if desired.chain() == "TEST_ONE"));
    }

    #[test]
    fn policy_drift_is_updated() {
        let should = desired("INPUT:filter:IPv4").with_policy(Policy::Drop);
        let current = [live("INPUT:filter:IPv4", Some(Policy::Accept))];
        let plan = Plan::build(&[should], &current);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(
            plan.actions[0].to_string(),
            "Set policy on INPUT:filter:IPv4: accept -> drop"
        );
    }

    #[test]
    fn unlisted_inbuilt_chain_gets_policy_not_create() {
        let should = desired("BROUTING:broute:ethernet").with_policy(Policy::Drop);
        let plan = Plan::build(&[should], &[live("INPUT:filter:IPv4", Some(Policy::Accept))]);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(
            plan.actions[0].to_string(),
            "Set policy on BROUTING:broute:ethernet: accept -> drop"
        );
    }

    #[test]
    fn inbuilt_chain_of_unloaded_table_is_never_created() {
        let should = desired("OUTPUT:mangle:IPv4").with_policy(Policy::Drop);
        let plan = Plan::build(&[should], &[]);
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(
            &plan.actions[0],
            Action::SetPolicy { current, .. } if current.policy == Some(Policy::Accept)
        ));

        let plan = Plan::build(&[desired("OUTPUT:mangle:IPv4")], &[]);
        assert!(plan.is_empty());
    }

    #[test]
    fn in_sync_chain_produces_no_actions() {
        let current = [
            live("INPUT:filter:IPv4", Some(Policy::Accept)),
            live("TEST_ONE:filter:IPv4", None),
        ];
        let plan = Plan::build(
            &[desired("INPUT:filter:IPv4"), desired("TEST_ONE:filter:IPv4")],
            &current,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn absent_chain_is_deleted_only_when_live() {
        let should = desired("OLD:raw:IPv6").with_ensure(Ensure::Absent);
        assert!(Plan::build(std::slice::from_ref(&should), &[]).is_empty());

        let plan = Plan::build(&[should], &[live("OLD:raw:IPv6", None)]);
        assert_eq!(plan.actions[0].to_string(), "Flush and delete chain: OLD:raw:IPv6");
    }

    #[test]
    fn purge_follows_the_chain_action() {
        let mut should = desired("TEST_ONE:filter:IPv4");
        should.purge = true;
        let plan = Plan::build(&[should], &[]);
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(plan.actions[0], Action::Create { .. }));
        assert!(matches!(plan.actions[1], Action::Purge { .. }));
    }

    #[test]
    fn invalid_chain_is_skipped_without_blocking_others() {
        let bad = desired("TEST_ONE:filter:IPv4").with_policy(Policy::Accept);
        let plan = Plan::build(&[bad, desired("TEST_TWO:raw:IPv4")], &[]);
        assert_eq!(plan.actions.len(), 2);
        match &plan.actions[0] {
            Action::Skip { name, reason } => {
                assert_eq!(name.to_string(), "TEST_ONE:filter:IPv4");
                assert!(reason.starts_with("'policy' can only be set on Internal Chains"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(matches!(plan.actions[1], Action::Create { .. }));
    }
}
