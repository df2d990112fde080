//! # quark-rt - Distributed Virtual-Actor Runtime
//!
//! A cluster of peer processes ("silos") cooperatively hosts
//! location-transparent, single-threaded-per-identity actors. A caller
//! addresses an actor by `(type, id)`; the runtime locates or activates
//! it on some silo, serializes the call onto that actor's mailbox,
//! executes the method, and returns a response. On top of this sit
//! reminders, timers, supervision, streams with backpressure, idle
//! deactivation, live migration, and load rebalancing.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quark_rt::prelude::*;
//!
//! // 1. Register a dispatcher for each hosted actor interface.
//! let dispatchers = Arc::new(DispatcherRegistry::new());
//! dispatchers.register("ICounter", Arc::new(CounterDispatcher));
//!
//! // 2. Stand up the silo over a shared cluster store.
//! let store: Arc<dyn ClusterStore> = Arc::new(InMemoryClusterStore::new());
//! let directory = Arc::new(ActorDirectory::new(store, Duration::from_secs(30)));
//! let silo = Silo::new(SiloId::new(), SiloConfig::default(), dispatchers, directory);
//!
//! // 3. Hand inbound envelopes to the request pump.
//! let response = silo
//!     .handle_envelope(Envelope::request("ICounter", "counter-A", "Increment", vec![]))
//!     .await;
//! assert!(!response.is_error);
//! ```
//!
//! # Module Organization
//!
//! ## Actor Plane
//! - [`message`] - Wire envelope and the pluggable codec boundary
//! - [`dispatcher`] - Runtime registry binding actor types to invocations
//! - [`mailbox`] - Per-actor FIFO with adaptive capacity, rate limiting,
//!   circuit breaking, and the dead-letter queue
//! - [`silo`] - The request pump tying the plane together
//!
//! ## Cluster Plane
//! - [`ring`] - Consistent hash ring, flat and hierarchical
//! - [`membership`] - Silo registration, heartbeats, eviction, health
//! - [`directory`] - Cluster-wide actor location records
//! - [`router`] - Smart routing with a short-TTL decision cache
//! - [`transport`] - Envelope channel contract and in-process impl
//! - [`client`] - Invocation path with local bypass and retry policy
//!
//! ## Lifecycle & Load
//! - [`activity`] - Per-actor counters, hot/cold scoring, idle eviction
//! - [`migration`] - Drain → transfer → activate handoff
//! - [`rebalance`] - Imbalance-driven migration planning
//! - [`reminder`] / [`timer`] - Durable schedules and in-process timers
//! - [`supervisor`] - Directives, restart histories, backoff, strategies
//! - [`stream`] - Pub/sub streams with pluggable backpressure
//!
//! ## Infrastructure
//! - [`state`] - State/event/saga store contracts
//! - [`pool`] - Bounded rent/return object pooling
//! - [`util`] - Identifiers and the call-chain context
//! - [`telemetry`] - Tracing bootstrap

pub mod activity;
pub mod client;
pub mod directory;
pub mod dispatcher;
pub mod mailbox;
pub mod membership;
pub mod message;
pub mod migration;
pub mod pool;
pub mod prelude;
pub mod rebalance;
pub mod reminder;
pub mod ring;
pub mod router;
pub mod silo;
pub mod state;
pub mod stream;
pub mod supervisor;
pub mod telemetry;
pub mod timer;
pub mod transport;
pub mod util;
