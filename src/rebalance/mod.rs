//! Load rebalancer: plans actor migrations when silo load imbalance
//! exceeds a threshold.
//!
//! A pure planner: it consumes health scores from the
//! [`HealthMonitor`](crate::membership::HealthMonitor) and the cold-first
//! candidate list from
//! [`ActivityTracker::get_migration_priority_list`](crate::activity::ActivityTracker::get_migration_priority_list),
//! and emits migrations for the
//! [`MigrationCoordinator`](crate::migration::MigrationCoordinator) to
//! execute. Keeping planning separate from execution means a plan can be
//! inspected, logged, or rejected before a single actor is drained.

// Layer 2: Third-party crate imports
use tracing::info;

// Layer 3: Internal module imports
use crate::activity::ActivityMetrics;
use crate::util::{ActorIdentity, SiloId};

#[derive(Debug, Clone, Copy)]
pub struct RebalancerConfig {
    /// Minimum badness-score spread between the most and least loaded
    /// silo before any migration is planned.
    pub imbalance_threshold: f64,
    /// Upper bound on migrations emitted per planning cycle, so one cycle
    /// never drains a silo wholesale.
    pub max_migrations_per_cycle: usize,
    /// Hot actors are never planned for migration regardless of load.
    pub skip_hot_actors: bool,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            imbalance_threshold: 0.25,
            max_migrations_per_cycle: 8,
            skip_hot_actors: true,
        }
    }
}

/// One planned move, ready to hand to the migration coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMigration {
    pub actor: ActorIdentity,
    pub source: SiloId,
    pub target: SiloId,
}

pub struct Rebalancer {
    config: RebalancerConfig,
}

impl Rebalancer {
    pub fn new(config: RebalancerConfig) -> Self {
        Self { config }
    }

    /// Compute the migrations for one cycle. `silo_scores` are badness
    /// scores in `[0,1]` per silo; `candidates` is the source silo's
    /// cold-first priority list. Returns an empty plan when the spread is
    /// under the threshold or fewer than two silos are known.
    pub fn compute_plan(
        &self,
        silo_scores: &[(SiloId, f64)],
        candidates: &[(ActorIdentity, ActivityMetrics)],
    ) -> Vec<PlannedMigration> {
        if silo_scores.len() < 2 {
            return Vec::new();
        }
        let Some(&(busiest, max_score)) = silo_scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        else {
            return Vec::new();
        };
        let Some(&(calmest, min_score)) = silo_scores
            .iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        else {
            return Vec::new();
        };
        if busiest == calmest || max_score - min_score < self.config.imbalance_threshold {
            return Vec::new();
        }

        let plan: Vec<PlannedMigration> = candidates
            .iter()
            .filter(|(_, metrics)| !(self.config.skip_hot_actors && metrics.is_hot()))
            .take(self.config.max_migrations_per_cycle)
            .map(|(actor, _)| PlannedMigration {
                actor: actor.clone(),
                source: busiest,
                target: calmest,
            })
            .collect();

        if !plan.is_empty() {
            info!(
                source = %busiest,
                target = %calmest,
                spread = max_score - min_score,
                moves = plan.len(),
                "rebalance plan computed"
            );
        }
        plan
    }
}
