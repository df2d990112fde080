//! Supervision: failure directives, restart backoff, and restart
//! strategies.

mod backoff;
mod strategy;

pub use backoff::{BackoffOptions, RestartHistory};
pub use strategy::RestartStrategy;

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::util::ActorIdentity;

/// Outcome of `Supervisor::on_child_failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Resume,
    Restart,
    Stop,
    Escalate,
}

#[derive(Debug, Clone)]
pub struct ChildFailureContext {
    pub child: ActorIdentity,
    pub exception: String,
}

/// Any actor acting as a supervisor implements this. The default
/// implementation always restarts.
#[async_trait]
pub trait Supervisor: Send + Sync {
    async fn on_child_failure(&self, context: &ChildFailureContext) -> Directive {
        let _ = context;
        Directive::Restart
    }
}

/// Tracks restart history per child and applies the restart-rate-window
/// escalation rule on top of whatever directive the supervisor's own
/// policy returns.
pub struct SupervisionBookkeeper {
    strategy: RestartStrategy,
    options: BackoffOptions,
    histories: Mutex<HashMap<ActorIdentity, RestartHistory>>,
    /// Children in spawn order, required for `RestForOne`.
    children: Mutex<Vec<ActorIdentity>>,
}

impl SupervisionBookkeeper {
    pub fn new(strategy: RestartStrategy, options: BackoffOptions) -> Self {
        Self {
            strategy,
            options,
            histories: Mutex::new(HashMap::new()),
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn register_child(&self, child: ActorIdentity) {
        let mut children = self.children.lock();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    pub fn remove_child(&self, child: &ActorIdentity) {
        self.children.lock().retain(|c| c != child);
        self.histories.lock().remove(child);
    }

    /// Resolve the final directive for one child failure: starts from the
    /// supervisor's own policy decision, then overrides with `Escalate`
    /// if the restart-rate window has been exceeded.
    pub fn resolve_directive(&self, child: &ActorIdentity, policy_directive: Directive) -> Directive {
        if policy_directive != Directive::Restart {
            return policy_directive;
        }
        let now = Utc::now();
        let mut histories = self.histories.lock();
        let history = histories.entry(child.clone()).or_default();
        history.record_restart(now);
        let count = history.restarts_in_window(now, self.options.time_window);
        if count > self.options.max_restarts && self.options.escalate_on_exceeded {
            Directive::Escalate
        } else {
            Directive::Restart
        }
    }

    pub fn backoff_for(&self, child: &ActorIdentity) -> Duration {
        self.histories
            .lock()
            .get(child)
            .map(|h| h.calculate_backoff(&self.options))
            .unwrap_or(self.options.initial_backoff)
    }

    pub fn reset(&self, child: &ActorIdentity) {
        if let Some(history) = self.histories.lock().get_mut(child) {
            history.reset();
        }
    }

    /// Siblings that must restart alongside `failing`, per the configured
    /// strategy.
    pub fn siblings_to_restart(&self, failing: &ActorIdentity) -> Vec<ActorIdentity> {
        let children = self.children.lock();
        self.strategy.children_to_restart(&children, failing)
    }
}
