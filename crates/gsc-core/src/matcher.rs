//! Rule matching over the process list

use gsc_config::{Limit, MatcherPolicy};
use gsc_host_api::ProcessInfo;
use std::fmt;

/// One rule that matched at least one process this cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Rule id, also the counter name
    pub name: String,
    pub processes: Vec<ProcessInfo>,
    /// Matching processes over all candidates
    pub ratio: f64,
    pub limits: Vec<Limit>,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} processes, ratio {:.3})",
            self.name,
            self.processes.len(),
            self.ratio
        )
    }
}

/// Named set of rules applied to command lines
#[derive(Debug, Clone)]
pub struct Matcher {
    policy: MatcherPolicy,
}

impl Matcher {
    pub fn new(policy: MatcherPolicy) -> Self {
        Self { policy }
    }

    pub fn name(&self) -> &str {
        &self.policy.name
    }

    pub fn rule_count(&self) -> usize {
        self.policy.rules.len()
    }

    /// Matches in rule order. Rules without a matching process are left out.
    pub fn matches(&self, processes: &[ProcessInfo]) -> Vec<Match> {
        if processes.is_empty() {
            return Vec::new();
        }
        let total = processes.len() as f64;

        self.policy
            .rules
            .iter()
            .filter_map(|rule| {
                let matched: Vec<ProcessInfo> = processes
                    .iter()
                    .filter(|p| rule.is_match(&p.cmdline))
                    .cloned()
                    .collect();

                if matched.is_empty() {
                    return None;
                }

                Some(Match {
                    name: rule.id.clone(),
                    ratio: matched.len() as f64 / total,
                    processes: matched,
                    limits: rule.limits.clone(),
                })
            })
            .collect()
    }
}
