//! The auto-reconnect plan: an ordered ring of `(Server, attempt_count)`
//! entries a connection walks between retries (spec.md §3 glossary
//! "Reconnect plan"; §4.2 "Auto-reconnect").

use crate::config::Server;

/// One entry in a reconnect plan.
#[derive(Clone, Debug)]
pub struct PlanEntry {
    pub server: Server,
    pub attempts: u32,
}

/// Cycles through a network's server list, counting attempts per cycle and
/// signalling when a full cycle has failed so the caller can apply a
/// between-retry delay (spec.md §4.2: "after each cycle completes without
/// success, a between-retry delay elapses"). Gives up once `give_up_after`
/// full cycles have failed (spec.md §4.2: "Give-up emits `giveup` and does
/// not retry again until user action").
#[derive(Debug)]
pub struct ReconnectPlan {
    entries: Vec<PlanEntry>,
    cursor: usize,
    manual: bool,
    cycles_completed: u32,
    give_up_after: u32,
}

impl ReconnectPlan {
    pub fn new(servers: Vec<Server>) -> ReconnectPlan {
        ReconnectPlan::with_give_up_after(servers, 5)
    }

    /// Builds a plan that gives up once `give_up_after` full cycles have
    /// completed without a successful registration resetting it.
    pub fn with_give_up_after(servers: Vec<Server>, give_up_after: u32) -> ReconnectPlan {
        ReconnectPlan {
            entries: servers.into_iter().map(|server| PlanEntry { server, attempts: 0 }).collect(),
            cursor: 0,
            manual: false,
            cycles_completed: 0,
            give_up_after,
        }
    }

    /// True when this plan's servers span more than one distinct server
    /// name (spec.md §3 invariant: "`is_network` is true when more than one
    /// distinct server name appears").
    pub fn is_network(&self) -> bool {
        self.entries.iter().map(|e| e.server.name.as_str()).collect::<std::collections::HashSet<_>>().len() > 1
    }

    /// Whether the plan has exhausted its give-up threshold and should stop
    /// retrying until the user acts.
    pub fn has_given_up(&self) -> bool {
        self.cycles_completed >= self.give_up_after
    }

    /// Marks the next `next()` call as a manual (user-initiated) connect,
    /// which bypasses retry counting (spec.md §4.2: "A 'manual connect'
    /// bypasses retry counting").
    pub fn mark_manual(&mut self) {
        self.manual = true;
    }

    /// The server to try next, and whether this attempt completes a full
    /// cycle through the plan (the caller should apply its between-retry
    /// delay before actually connecting when this is `true` and the attempt
    /// was not manual).
    pub fn next(&mut self) -> Option<(Server, bool)> {
        if self.entries.is_empty() {
            return None;
        }
        let entry = &mut self.entries[self.cursor];
        if !self.manual {
            entry.attempts += 1;
        }
        let server = entry.server.clone();
        let wrapped = self.cursor + 1 >= self.entries.len();
        self.cursor = (self.cursor + 1) % self.entries.len();
        let manual = self.manual;
        self.manual = false;
        if wrapped && !manual {
            self.cycles_completed += 1;
        }
        Some((server, wrapped && !manual))
    }

    /// Resets every entry's attempt counter and the give-up cycle count,
    /// e.g. after a successful registration.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.attempts = 0;
        }
        self.cursor = 0;
        self.cycles_completed = 0;
    }

    /// The total attempts made against any entry since the last reset.
    pub fn total_attempts(&self) -> u32 {
        self.entries.iter().map(|e| e.attempts).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> Server {
        Server {
            network: "Net".into(),
            name: name.into(),
            address: format!("{name}.example.com"),
            ports: vec![(6667, 6667)],
            password: None,
            tls: false,
        }
    }

    #[test]
    fn cycles_through_servers_and_signals_wraparound() {
        let mut plan = ReconnectPlan::new(vec![server("a"), server("b")]);
        let (s1, wrapped1) = plan.next().unwrap();
        assert_eq!(s1.name, "a");
        assert!(!wrapped1);
        let (s2, wrapped2) = plan.next().unwrap();
        assert_eq!(s2.name, "b");
        assert!(wrapped2);
        assert_eq!(plan.total_attempts(), 2);
    }

    #[test]
    fn manual_connect_does_not_count_as_an_attempt() {
        let mut plan = ReconnectPlan::new(vec![server("a")]);
        plan.mark_manual();
        plan.next();
        assert_eq!(plan.total_attempts(), 0);
    }

    #[test]
    fn gives_up_after_the_configured_number_of_cycles() {
        let mut plan = ReconnectPlan::with_give_up_after(vec![server("a")], 2);
        assert!(!plan.has_given_up());
        plan.next();
        assert!(!plan.has_given_up());
        plan.next();
        assert!(plan.has_given_up());
    }

    #[test]
    fn reset_clears_give_up_state() {
        let mut plan = ReconnectPlan::with_give_up_after(vec![server("a")], 1);
        plan.next();
        assert!(plan.has_given_up());
        plan.reset();
        assert!(!plan.has_given_up());
    }

    #[test]
    fn is_network_true_only_with_distinct_server_names() {
        let single = ReconnectPlan::new(vec![server("a"), server("a")]);
        assert!(!single.is_network());
        let multi = ReconnectPlan::new(vec![server("a"), server("b")]);
        assert!(multi.is_network());
    }

    #[test]
    fn reset_clears_attempt_counts() {
        let mut plan = ReconnectPlan::new(vec![server("a")]);
        plan.next();
        plan.next();
        assert_eq!(plan.total_attempts(), 2);
        plan.reset();
        assert_eq!(plan.total_attempts(), 0);
    }
}
