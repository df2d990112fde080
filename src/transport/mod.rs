//! Transport contract and in-process reference implementation.
//!
//! Concrete network transports (gRPC channel pools and friends) live
//! outside this crate; the core only consumes the [`Transport`] trait.
//! [`InProcessTransport`] wires silos hosted in the same process together
//! and is what the integration tests run the cluster on.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::timeout;

// Layer 3: Internal module imports
use crate::message::Envelope;
use crate::silo::Silo;
use crate::util::SiloId;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("no route to silo {0}")]
    UnknownSilo(SiloId),
    #[error("transport is not started")]
    NotStarted,
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

/// Bi-directional envelope channel to every peer silo and to external
/// clients. `send` awaits the response envelope correlated by
/// `message_id`; a request-level deadline surfaces as
/// [`TransportError::Timeout`]. Cancellation is the tokio idiom: dropping
/// the returned future abandons the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn start(&self) -> Result<(), TransportError>;
    async fn stop(&self) -> Result<(), TransportError>;

    fn local_silo_id(&self) -> SiloId;
    fn local_endpoint(&self) -> String;

    async fn send(&self, target: SiloId, envelope: Envelope) -> Result<Envelope, TransportError>;
}

/// In-process transport: delivers envelopes to co-hosted silos by direct
/// call. There is no shared outbound byte stream here, so the single
/// writer lock a network transport needs does not apply; per-request
/// ordering still holds because each silo's mailbox serializes per actor.
pub struct InProcessTransport {
    local_silo_id: SiloId,
    local_endpoint: String,
    request_timeout: Duration,
    peers: DashMap<SiloId, Arc<Silo>>,
    started: AtomicBool,
    /// Fires once per envelope delivered through this transport.
    /// Subscribers observe a copy and can never block delivery.
    envelope_received: tokio::sync::broadcast::Sender<Envelope>,
}

impl InProcessTransport {
    pub fn new(local_silo_id: SiloId, request_timeout: Duration) -> Arc<Self> {
        let (envelope_received, _) = tokio::sync::broadcast::channel(256);
        Arc::new(Self {
            local_silo_id,
            local_endpoint: format!("inproc://{local_silo_id}"),
            request_timeout,
            peers: DashMap::new(),
            started: AtomicBool::new(false),
            envelope_received,
        })
    }

    /// Make `silo` reachable from this transport. A silo registers itself
    /// and every peer it should be able to call.
    pub fn connect(&self, silo: Arc<Silo>) {
        self.peers.insert(silo.id, silo);
    }

    pub fn disconnect(&self, silo_id: SiloId) {
        self.peers.remove(&silo_id);
    }

    pub fn subscribe_envelopes(&self) -> tokio::sync::broadcast::Receiver<Envelope> {
        self.envelope_received.subscribe()
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn start(&self) -> Result<(), TransportError> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.started.store(false, Ordering::Release);
        Ok(())
    }

    fn local_silo_id(&self) -> SiloId {
        self.local_silo_id
    }

    fn local_endpoint(&self) -> String {
        self.local_endpoint.clone()
    }

    async fn send(&self, target: SiloId, envelope: Envelope) -> Result<Envelope, TransportError> {
        if !self.started.load(Ordering::Acquire) {
            return Err(TransportError::NotStarted);
        }
        let silo = self
            .peers
            .get(&target)
            .map(|s| Arc::clone(s.value()))
            .ok_or(TransportError::UnknownSilo(target))?;

        let _ = self.envelope_received.send(envelope.clone());

        match timeout(self.request_timeout, silo.handle_envelope(envelope)).await {
            Ok(response) => Ok(response),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ActorDirectory;
    use crate::dispatcher::{ActorInstance, Dispatcher, DispatcherError, DispatcherRegistry};
    use crate::membership::{ClusterStore, InMemoryClusterStore};
    use crate::silo::SiloConfig;

    struct SlowEcho;

    #[async_trait]
    impl Dispatcher for SlowEcho {
        fn new_instance(&self, _actor_id: &str) -> ActorInstance {
            Box::new(())
        }

        async fn invoke(
            &self,
            _instance: &mut ActorInstance,
            method_name: &str,
            payload: &[u8],
        ) -> Result<Vec<u8>, DispatcherError> {
            if method_name == "Slow" {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(payload.to_vec())
        }
    }

    fn silo() -> Arc<Silo> {
        let dispatchers = Arc::new(DispatcherRegistry::new());
        dispatchers.register("Echo", Arc::new(SlowEcho));
        let store: Arc<dyn ClusterStore> = Arc::new(InMemoryClusterStore::new());
        let directory = Arc::new(ActorDirectory::new(store, Duration::from_secs(60)));
        Silo::new(SiloId::new(), SiloConfig::default(), dispatchers, directory)
    }

    #[tokio::test]
    async fn send_round_trips_with_matching_message_id() {
        let target = silo();
        let transport = InProcessTransport::new(SiloId::new(), Duration::from_secs(1));
        transport.connect(Arc::clone(&target));
        transport.start().await.unwrap();

        let request = Envelope::request("Echo", "a1", "Echo", vec![7]);
        let request_id = request.message_id;
        let response = transport.send(target.id, request).await.unwrap();
        assert_eq!(response.message_id, request_id);
        assert_eq!(response.response_payload, Some(vec![7]));
    }

    #[tokio::test]
    async fn unknown_target_is_an_error() {
        let transport = InProcessTransport::new(SiloId::new(), Duration::from_secs(1));
        transport.start().await.unwrap();
        let err = transport
            .send(SiloId::new(), Envelope::request("Echo", "a1", "Echo", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownSilo(_)));
    }

    #[tokio::test]
    async fn request_deadline_surfaces_as_timeout() {
        let target = silo();
        let transport = InProcessTransport::new(SiloId::new(), Duration::from_millis(20));
        transport.connect(Arc::clone(&target));
        transport.start().await.unwrap();

        let err = transport
            .send(target.id, Envelope::request("Echo", "a1", "Slow", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }

    #[tokio::test]
    async fn send_before_start_is_rejected() {
        let transport = InProcessTransport::new(SiloId::new(), Duration::from_secs(1));
        let err = transport
            .send(SiloId::new(), Envelope::request("Echo", "a1", "Echo", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotStarted));
    }

    #[tokio::test]
    async fn envelope_received_fires_once_per_inbound_envelope() {
        let target = silo();
        let transport = InProcessTransport::new(SiloId::new(), Duration::from_secs(1));
        transport.connect(Arc::clone(&target));
        transport.start().await.unwrap();
        let mut events = transport.subscribe_envelopes();

        transport
            .send(target.id, Envelope::request("Echo", "a1", "Echo", vec![]))
            .await
            .unwrap();
        let observed = events.recv().await.unwrap();
        assert_eq!(observed.actor_id, "a1");
    }
}
