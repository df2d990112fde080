//! Silo: the request pump that ties dispatcher, mailbox, directory and
//! activity tracking into one per-actor processing loop.

mod config;
mod error;

pub use config::SiloConfig;
pub use error::SiloError;

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::warn;

// Layer 3: Internal module imports
use crate::activity::{ActivityTracker, DeactivationHandler};
use crate::dispatcher::{ActorInstance, Dispatcher, DispatcherRegistry};
use crate::directory::ActorDirectory;
use crate::mailbox::{DeadLetterQueue, Mailbox, MailboxError};
use crate::message::Envelope;
use crate::util::{ActorIdentity, CallContext, MessageId, SiloId};

/// One live activation: its mailbox and the actor instance exclusively
/// owned by the mailbox's consumer task.
struct Activation {
    mailbox: Arc<Mailbox>,
}

pub struct Silo {
    pub id: SiloId,
    config: SiloConfig,
    dispatchers: Arc<DispatcherRegistry>,
    directory: Arc<ActorDirectory>,
    pub tracker: Arc<ActivityTracker>,
    dead_letters: Arc<DeadLetterQueue>,
    activations: DashMap<ActorIdentity, Activation>,
    pending: DashMap<MessageId, oneshot::Sender<Envelope>>,
}

impl Silo {
    pub fn new(
        id: SiloId,
        config: SiloConfig,
        dispatchers: Arc<DispatcherRegistry>,
        directory: Arc<ActorDirectory>,
    ) -> Arc<Self> {
        let dead_letters = Arc::new(DeadLetterQueue::new(config.dead_letter_max_messages));
        Arc::new(Self {
            id,
            config,
            dispatchers,
            directory,
            tracker: Arc::new(ActivityTracker::new()),
            dead_letters,
            activations: DashMap::new(),
            pending: DashMap::new(),
        })
    }

    /// The silo-wide dead-letter queue every activation's mailbox feeds.
    pub fn dead_letters(&self) -> &Arc<DeadLetterQueue> {
        &self.dead_letters
    }

    pub fn active_actor_identities(&self) -> Vec<ActorIdentity> {
        self.activations.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_active(&self, actor: &ActorIdentity) -> bool {
        self.activations.contains_key(actor)
    }

    /// Entry point a transport calls once per inbound envelope. Never
    /// propagates a Rust `Err`: failures are encoded as an `isError`
    /// response envelope, matching the wire contract.
    pub async fn handle_envelope(self: &Arc<Self>, envelope: Envelope) -> Envelope {
        self.handle_envelope_in_context(envelope, &CallContext::root())
            .await
    }

    /// Same as [`handle_envelope`](Self::handle_envelope) but inside an
    /// existing call chain: entering a non-reentrant actor already on
    /// `context` is rejected before it can deadlock on its own mailbox.
    pub async fn handle_envelope_in_context(
        self: &Arc<Self>,
        envelope: Envelope,
        context: &CallContext,
    ) -> Envelope {
        let actor = ActorIdentity::new(envelope.actor_type.clone(), envelope.actor_id.clone());

        let dispatcher = match self.dispatchers.resolve(&actor.actor_type) {
            Ok(dispatcher) => dispatcher,
            Err(_) => {
                return envelope.error_response(format!(
                    "No dispatcher registered for actor type: {}",
                    actor.actor_type
                ));
            }
        };

        if !dispatcher.is_reentrant() && context.contains(&actor) {
            return envelope.error_response(format!(
                "reentrant call into non-reentrant actor {actor}"
            ));
        }

        let activation = self.activation_for(&actor, dispatcher).await;

        self.tracker.record_message_enqueued(&actor);

        let (response_tx, response_rx) = oneshot::channel();
        self.pending.insert(envelope.message_id, response_tx);

        match activation.post(envelope.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                self.fail_pending(&envelope, &actor);
                return envelope.error_response("rate limited");
            }
            Err(MailboxError::RateLimited) => {
                self.fail_pending(&envelope, &actor);
                return envelope.error_response("rate limited");
            }
            Err(MailboxError::CircuitOpen) => {
                self.fail_pending(&envelope, &actor);
                return envelope.error_response("rate limited: circuit open");
            }
            Err(MailboxError::Stopped) => {
                self.fail_pending(&envelope, &actor);
                return envelope.error_response("mailbox rejected the message");
            }
        }

        match response_rx.await {
            Ok(response) => response,
            Err(_) => envelope.error_response("activation closed before responding"),
        }
    }

    /// Undo the bookkeeping for an envelope the mailbox refused: the
    /// pending-response slot and the enqueue count recorded before `post`.
    fn fail_pending(&self, envelope: &Envelope, actor: &ActorIdentity) {
        self.pending.remove(&envelope.message_id);
        self.tracker.record_message_dequeued(actor);
    }

    /// Atomically looks up the activation's mailbox, creating it (and
    /// spawning its consumer task) on first reference. Uses the
    /// `DashMap` entry API, not a contains/insert pair, so two envelopes
    /// for a brand-new actor arriving at the same instant can never spawn
    /// two consumer tasks for it.
    async fn activation_for(self: &Arc<Self>, actor: &ActorIdentity, dispatcher: Arc<dyn Dispatcher>) -> Arc<Mailbox> {
        use dashmap::mapref::entry::Entry;

        let (mailbox, newly_created) = match self.activations.entry(actor.clone()) {
            Entry::Occupied(entry) => (Arc::clone(&entry.get().mailbox), false),
            Entry::Vacant(entry) => {
                let mailbox = Arc::new(
                    Mailbox::from_config(actor.actor_id.clone(), &self.config.mailbox)
                        .with_dead_letters(Arc::clone(&self.dead_letters)),
                );
                entry.insert(Activation { mailbox: Arc::clone(&mailbox) });
                (mailbox, true)
            }
        };

        if newly_created {
            if let Err(err) = self.directory.register(&actor.actor_type, &actor.actor_id, self.id).await {
                warn!(%actor, error = %err, "failed to register activation in directory");
            }
            self.spawn_consumer(actor.clone(), Arc::clone(&mailbox), dispatcher);
        }
        mailbox
    }

    fn spawn_consumer(self: &Arc<Self>, actor: ActorIdentity, mailbox: Arc<Mailbox>, dispatcher: Arc<dyn Dispatcher>) {
        let instance: Arc<AsyncMutex<ActorInstance>> =
            Arc::new(AsyncMutex::new(dispatcher.new_instance(&actor.actor_id)));
        let silo = Arc::clone(self);
        let loop_actor = actor.clone();

        tokio::spawn(async move {
            mailbox
                .run(move |request| {
                    let silo = Arc::clone(&silo);
                    let actor = loop_actor.clone();
                    let dispatcher = Arc::clone(&dispatcher);
                    let instance = Arc::clone(&instance);
                    async move {
                        silo.tracker.record_message_dequeued(&actor);
                        silo.tracker.record_call_started(&actor);
                        let mut instance = instance.lock().await;
                        let result = dispatcher
                            .invoke(&mut instance, &request.method_name, &request.payload)
                            .await;
                        drop(instance);
                        silo.tracker.record_call_completed(&actor);

                        let outcome = match &result {
                            Ok(_) => Ok(()),
                            Err(err) => Err(err.to_string()),
                        };
                        let response = match result {
                            Ok(bytes) => request.success_response(bytes),
                            Err(err) => request.error_response(err.to_string()),
                        };
                        if let Some((_, tx)) = silo.pending.remove(&request.message_id) {
                            let _ = tx.send(response);
                        }
                        outcome
                    }
                })
                .await;
        });
    }

    /// Removes the local activation record: used by idle deactivation and
    /// the migration coordinator's final step. Does not stop an
    /// in-progress mailbox; callers drain first.
    pub async fn deactivate(&self, actor: &ActorIdentity) {
        if let Some((_, activation)) = self.activations.remove(actor) {
            activation.mailbox.stop();
        }
        self.tracker.remove(actor);
        if let Err(err) = self.directory.deregister(&actor.actor_type, &actor.actor_id).await {
            warn!(%actor, error = %err, "failed to deregister deactivated actor");
        }
    }

    pub fn mailbox_of(&self, actor: &ActorIdentity) -> Option<Arc<Mailbox>> {
        self.activations.get(actor).map(|a| Arc::clone(&a.mailbox))
    }
}

/// Lets the idle deactivation service evict directly through the silo.
#[async_trait::async_trait]
impl DeactivationHandler for Silo {
    async fn on_deactivate(&self, id: &ActorIdentity) -> Result<(), String> {
        self.deactivate(id).await;
        Ok(())
    }
}
