use crate::save::{RuleLine, SaveDump};
use anyhow::{Context, Result};
use cw_core::{ChainId, Ensure};
use regex::Regex;
use serde::Serialize;

/// Base of the tags synthesized for rules whose comment has no numeric prefix.
pub const FOREIGN_TAG_BASE: usize = 9000;

/// Ordering tag of one commented rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTag {
    pub tag: String,
    /// Comment text after the numeric prefix.
    pub content: String,
    /// True when the comment had no numeric prefix and the tag was made up.
    pub foreign: bool,
}

impl RuleTag {
    pub fn for_rule(rule: &RuleLine) -> Self {
        let digits = rule
            .comment
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();

        if digits > 0 {
            Self {
                tag: rule.comment.clone(),
                content: rule.comment[digits..].trim_start().to_string(),
                foreign: false,
            }
        } else {
            Self {
                tag: format!("{} {}", FOREIGN_TAG_BASE + rule.position, rule.comment),
                content: rule.comment.clone(),
                foreign: true,
            }
        }
    }
}

/// A rule the caller should remove, named by its tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeDescriptor {
    pub name: String,
    pub chain: ChainId,
    pub rule: String,
    pub ensure: Ensure,
}

/// Picks the untracked rules of a chain that are eligible for removal.
pub struct PurgeGenerator {
    ignore: Vec<Regex>,
    ignore_foreign: bool,
}

impl PurgeGenerator {
    pub fn new<S: AsRef<str>>(ignore: &[S], ignore_foreign: bool) -> Result<Self> {
        let ignore = ignore
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).with_context(|| format!("Invalid ignore pattern '{}'", pattern))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ignore,
            ignore_foreign,
        })
    }

    /// Descriptors for the rules of `chain`, in save-text order.
    pub fn generate(&self, dump: &SaveDump, chain: &ChainId) -> Vec<PurgeDescriptor> {
        dump.rules_in(chain.table, &chain.chain)
            .filter(|rule| rule.protocol == chain.protocol)
            .filter_map(|rule| {
                let tag = RuleTag::for_rule(rule);
                if self.ignore_foreign && tag.foreign {
                    return None;
                }
                if self.ignore.iter().any(|re| re.is_match(&tag.content)) {
                    return None;
                }
                Some(PurgeDescriptor {
                    name: tag.tag,
                    chain: chain.clone(),
                    rule: rule.line.clone(),
                    ensure: Ensure::Absent,
                })
            })
            .collect()
    }
}
