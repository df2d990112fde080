//! Client-side invocation path: smart routing with local bypass, retry
//! policy, and response-to-error translation.
//!
//! This is the piece a generated proxy would call into; the proxy layer
//! itself (codegen over actor interfaces) is out of scope, so the client
//! exposes the raw `(actor, method, payload)` surface directly.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

// Layer 3: Internal module imports
use crate::message::Envelope;
use crate::router::{RouteDecision, SmartRouter};
use crate::silo::{Silo, SiloError};
use crate::transport::{Transport, TransportError};
use crate::util::{ActorIdentity, CallContext};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// Invokes actor methods through the router: same-process calls bypass
/// the transport entirely; remote calls go through it with bounded
/// retries on connection loss.
pub struct ActorClient {
    silo: Arc<Silo>,
    router: Arc<SmartRouter>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl ActorClient {
    pub fn new(
        silo: Arc<Silo>,
        router: Arc<SmartRouter>,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            silo,
            router,
            transport,
            retry,
        }
    }

    /// Invoke `method` on `actor` from outside any call chain.
    pub async fn invoke(
        &self,
        actor: &ActorIdentity,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, SiloError> {
        self.invoke_in_context(&CallContext::root(), actor, method, payload)
            .await
    }

    /// Invoke `method` on `actor` within an existing call chain. An actor
    /// making an outbound call passes its own context (pushed with its
    /// identity) so cycles through non-reentrant actors are caught at the
    /// dispatch boundary.
    pub async fn invoke_in_context(
        &self,
        context: &CallContext,
        actor: &ActorIdentity,
        method: &str,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, SiloError> {
        let envelope = Envelope::request(
            actor.actor_type.clone(),
            actor.actor_id.clone(),
            method,
            payload,
        );

        let response = self.dispatch(context, actor, envelope).await?;
        translate_response(response)
    }

    async fn dispatch(
        &self,
        context: &CallContext,
        actor: &ActorIdentity,
        envelope: Envelope,
    ) -> Result<Envelope, SiloError> {
        match self.route(actor).await? {
            RouteDecision::SameProcess | RouteDecision::LocalSilo => {
                Ok(self.silo.handle_envelope_in_context(envelope, context).await)
            }
            RouteDecision::Remote(target) => {
                let response = self.send_with_retries(target, envelope.clone()).await?;
                // A remote NoDispatcher means our cached placement was
                // stale; invalidate and retry once against a fresh route.
                if response.is_error
                    && response
                        .error_message
                        .as_deref()
                        .is_some_and(|m| m.starts_with("No dispatcher"))
                {
                    self.router.invalidate(actor);
                    debug!(actor = %actor, "stale placement, re-routing once");
                    if let RouteDecision::Remote(retarget) = self.route(actor).await? {
                        if retarget != target {
                            return self.send_with_retries(retarget, envelope).await;
                        }
                    }
                }
                Ok(response)
            }
        }
    }

    async fn route(&self, actor: &ActorIdentity) -> Result<RouteDecision, SiloError> {
        self.router
            .route(actor)
            .await
            .map_err(|e| SiloError::TransportFailure(e.to_string()))
    }

    async fn send_with_retries(
        &self,
        target: crate::util::SiloId,
        envelope: Envelope,
    ) -> Result<Envelope, SiloError> {
        let mut rng = SmallRng::from_entropy();
        let mut attempt = 0;
        loop {
            match self.transport.send(target, envelope.clone()).await {
                Ok(response) => return Ok(response),
                Err(TransportError::Timeout) => return Err(SiloError::Timeout),
                Err(err @ (TransportError::UnknownSilo(_) | TransportError::NotStarted)) => {
                    return Err(SiloError::TransportFailure(err.to_string()));
                }
                Err(TransportError::ConnectionLost(reason)) => {
                    attempt += 1;
                    if attempt > self.retry.max_retries {
                        return Err(SiloError::TransportFailure(reason));
                    }
                    // Jittered delay so a burst of failed callers does not
                    // retry in lockstep.
                    let base = self.retry.retry_delay.as_millis() as u64;
                    let jittered = base / 2 + rng.gen_range(0..=base);
                    tokio::time::sleep(Duration::from_millis(jittered)).await;
                }
            }
        }
    }
}

/// Translate a response envelope into the caller-facing result: `isError`
/// becomes an invocation-failure error carrying the server's message.
fn translate_response(response: Envelope) -> Result<Vec<u8>, SiloError> {
    if response.is_error {
        let message = response.error_message.unwrap_or_default();
        if message.starts_with("No dispatcher") {
            return Err(SiloError::NoDispatcher(response.actor_type));
        }
        if message.starts_with("reentrant call") {
            return Err(SiloError::Reentrancy(response.actor_id));
        }
        if message.starts_with("rate limited") {
            return Err(SiloError::RateLimited);
        }
        return Err(SiloError::DispatcherException(message));
    }
    Ok(response.response_payload.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_translates_to_dispatcher_exception() {
        let request = Envelope::request("Counter", "a1", "Go", vec![]);
        let response = request.error_response("Test error");
        let err = translate_response(response).unwrap_err();
        match err {
            SiloError::DispatcherException(message) => assert!(message.contains("Test error")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_dispatcher_response_translates_to_no_dispatcher() {
        let request = Envelope::request("Unknown", "a1", "Go", vec![]);
        let response = request.error_response("No dispatcher registered for actor type: Unknown");
        assert!(matches!(
            translate_response(response),
            Err(SiloError::NoDispatcher(_))
        ));
    }

    #[test]
    fn rate_limited_response_translates_to_rate_limited() {
        let request = Envelope::request("Counter", "a1", "Go", vec![]);
        let response = request.error_response("rate limited: circuit open");
        assert!(matches!(
            translate_response(response),
            Err(SiloError::RateLimited)
        ));
    }

    #[test]
    fn success_response_yields_payload() {
        let request = Envelope::request("Counter", "a1", "Go", vec![]);
        let response = request.success_response(vec![1, 2]);
        assert_eq!(translate_response(response).unwrap(), vec![1, 2]);
    }
}
