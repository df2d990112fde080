//! Convenience re-exports for the common embedding surface.

pub use crate::activity::{
    ActivityMetrics, ActivityTracker, DeactivationHandler, IdleDeactivationConfig,
    IdleDeactivationService, IdleTimeoutDeactivationPolicy,
};
pub use crate::client::{ActorClient, RetryPolicy};
pub use crate::directory::{ActorDirectory, ActorLocation};
pub use crate::dispatcher::{ActorInstance, Dispatcher, DispatcherError, DispatcherRegistry};
pub use crate::mailbox::{DeadLetterQueue, Mailbox, MailboxConfig, MailboxError};
pub use crate::membership::{
    ClusterMembership, ClusterStore, EvictionPolicy, HealthMonitor, InMemoryClusterStore,
    MembershipEvent, SiloInfo, SiloStatus,
};
pub use crate::message::{Codec, Envelope};
pub use crate::migration::{MigrationCoordinator, MigrationState, StateTransfer};
pub use crate::rebalance::{PlannedMigration, Rebalancer, RebalancerConfig};
pub use crate::reminder::{
    InMemoryReminderTable, Reminder, ReminderSink, ReminderTable, ReminderTickManager,
};
pub use crate::ring::{HashRing, HierarchicalHashRing, NodeAffinity, PlacementPreference, RingNode};
pub use crate::router::{RouteDecision, SmartRouter};
pub use crate::silo::{Silo, SiloConfig, SiloError};
pub use crate::state::{InMemoryStateStore, StateError, StateStore, VersionedState};
pub use crate::stream::{BackpressureMode, StreamHandle, StreamProvider};
pub use crate::supervisor::{
    BackoffOptions, ChildFailureContext, Directive, RestartHistory, RestartStrategy,
    SupervisionBookkeeper, Supervisor,
};
pub use crate::timer::{TimerError, TimerManager};
pub use crate::transport::{InProcessTransport, Transport, TransportError};
pub use crate::util::{composite_key, ActorIdentity, CallContext, MessageId, SiloId};
