//! Parser for `iptables-save` / `ip6tables-save` output.
//!
//! The dump is a sequence of table sections, each opened by a `*TABLE` line.
//! Inside a section, `:CHAIN POLICY [pkts:bytes]` lines declare chains and
//! `-A CHAIN ...` lines append rules. Everything before the first recognised
//! section header is ignored.

use cw_core::{Policy, Protocol, Table};

/// A `:CHAIN POLICY [pkts:bytes]` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHeader {
    pub table: Table,
    pub protocol: Protocol,
    pub chain: String,
    pub policy: Option<Policy>,
}

/// A rule line carrying a `--comment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub table: Table,
    pub protocol: Protocol,
    pub chain: String,
    pub comment: String,
    /// 1-based rank among the commented rules of the table, in file order.
    pub position: usize,
    pub line: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveDump {
    pub headers: Vec<ChainHeader>,
    pub rules: Vec<RuleLine>,
}

impl SaveDump {
    pub fn parse(text: &str, protocol: Protocol) -> Self {
        let mut dump = SaveDump::default();
        let mut table: Option<Table> = None;
        let mut position = 0;

        for raw in text.lines() {
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('*') {
                table = name.trim().parse().ok();
                if table.is_none() {
                    tracing::debug!("Skipping unknown table section '{}'", name);
                }
                position = 0;
                continue;
            }

            // COMMIT ends the declarations, rules printed after it still
            // belong to the open table.
            if line == "COMMIT" {
                continue;
            }

            let Some(table) = table else {
                continue;
            };

            if let Some(header) = line.strip_prefix(':') {
                if let Some(header) = parse_header(header, table, protocol) {
                    dump.headers.push(header);
                }
            } else if let Some(rule) = line.strip_prefix("-A ") {
                let Some(chain) = rule.split_whitespace().next() else {
                    continue;
                };
                if let Some(comment) = extract_comment(rule) {
                    position += 1;
                    dump.rules.push(RuleLine {
                        table,
                        protocol,
                        chain: chain.to_string(),
                        comment,
                        position,
                        line: line.to_string(),
                    });
                }
            }
        }

        dump
    }

    pub fn rules_in<'a>(
        &'a self,
        table: Table,
        chain: &'a str,
    ) -> impl Iterator<Item = &'a RuleLine> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.table == table && rule.chain == chain)
    }
}

fn parse_header(header: &str, table: Table, protocol: Protocol) -> Option<ChainHeader> {
    let mut fields = header.split_whitespace();
    let chain = fields.next()?;
    let column = fields.next()?;

    match Policy::from_header(column) {
        Ok(policy) => Some(ChainHeader {
            table,
            protocol,
            chain: chain.to_string(),
            policy,
        }),
        Err(e) => {
            tracing::debug!("Skipping chain header '{}': {}", header, e);
            None
        }
    }
}

/// Pull the argument of `--comment` out of a rule, undoing iptables-save quoting.
fn extract_comment(rule: &str) -> Option<String> {
    let (_, rest) = rule.split_once("--comment ")?;
    let rest = rest.trim_start();

    let Some(quoted) = rest.strip_prefix('"') else {
        return rest
            .split_whitespace()
            .next()
            .map(str::to_string);
    };

    let mut comment = String::new();
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    comment.push(escaped);
                }
            }
            '"' => return Some(comment),
            other => comment.push(other),
        }
    }

    // Unterminated quote: take what is there.
    Some(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPTABLES: &str = "
# Generated by iptables-save v1.8.4 on Thu Aug 10 10:15:14 2023
*filter
:INPUT ACCEPT [62:3308]
:FORWARD DROP [0:0]
:OUTPUT ACCEPT [39:3092]
:TEST_ONE - [0:0]
-A INPUT -i lo -j ACCEPT
-A TEST_ONE -p tcp -m comment --comment \"001 test rule\" -j ACCEPT
COMMIT
-A INPUT -p tcp -m comment --comment foreign -j DROP
# Completed on Thu Aug 10 10:15:14 2023
*raw
:PREROUTING QUEUE [13222:23455532]
:OUTPUT RETURN [12523:852730]
-A OUTPUT -m comment --comment \"say \\\"hi\\\"\" -j ACCEPT
COMMIT
";

    #[test]
    fn parses_chain_headers_per_table() {
        let dump = SaveDump::parse(IPTABLES, Protocol::IPv4);
        let headers: Vec<_> = dump
            .headers
            .iter()
            .map(|h| (h.table, h.chain.as_str(), h.policy))
            .collect();

        assert_eq!(
            headers,
            vec![
                (Table::Filter, "INPUT", Some(Policy::Accept)),
                (Table::Filter, "FORWARD", Some(Policy::Drop)),
                (Table::Filter, "OUTPUT", Some(Policy::Accept)),
                (Table::Filter, "TEST_ONE", None),
                (Table::Raw, "PREROUTING", Some(Policy::Queue)),
                (Table::Raw, "OUTPUT", Some(Policy::Return)),
            ]
        );
    }

    #[test]
    fn collects_commented_rules_with_positions() {
        let dump = SaveDump::parse(IPTABLES, Protocol::IPv4);
        let rules: Vec<_> = dump
            .rules
            .iter()
            .map(|r| (r.table, r.chain.as_str(), r.comment.as_str(), r.position))
            .collect();

        assert_eq!(
            rules,
            vec![
                (Table::Filter, "TEST_ONE", "001 test rule", 1),
                (Table::Filter, "INPUT", "foreign", 2),
                (Table::Raw, "OUTPUT", "say \"hi\"", 1),
            ]
        );
    }

    #[test]
    fn ignores_lines_outside_sections() {
        let text = "
:ORPHAN - [0:0]
-A ORPHAN -m comment --comment \"001 lost\"
*nosuchtable
:INPUT ACCEPT [0:0]
-A INPUT -m comment --comment \"002 lost\"
*filter
:INPUT ACCEPT [0:0]
";
        let dump = SaveDump::parse(text, Protocol::IPv6);
        assert_eq!(dump.headers.len(), 1);
        assert_eq!(dump.headers[0].protocol, Protocol::IPv6);
        assert!(dump.rules.is_empty());
    }

    #[test]
    fn skips_headers_with_unknown_policy() {
        let dump = SaveDump::parse("*filter\n:INPUT REJECT [0:0]\n:OUTPUT ACCEPT [0:0]\n", Protocol::IPv4);
        assert_eq!(dump.headers.len(), 1);
        assert_eq!(dump.headers[0].chain, "OUTPUT");
    }

    #[test]
    fn rules_in_filters_by_table_and_chain() {
        let dump = SaveDump::parse(IPTABLES, Protocol::IPv4);
        let input: Vec<_> = dump.rules_in(Table::Filter, "INPUT").collect();
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].comment, "foreign");
        assert_eq!(dump.rules_in(Table::Raw, "INPUT").count(), 0);
    }
}
