//! The session ties a runtime, a trust policy, and a configuration
//! together for the lifetime of one process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use vigil_core::{ActorId, CodeStub};
use vigil_events::{
    stop_signal, ConsumerReport, EncryptedRuntime, EventConsumer, EventType, FilterExpression,
    TagFilterBuilder,
};
use vigil_policy::{KeyTrustPolicy, RecoveryOutcome, RecoveryRequest};

use crate::config::VigilConfig;
use crate::error::{Result, VigilError};

/// Event types the analysis subscription listens for.
pub const ANALYSIS_EVENT_TYPES: [EventType; 2] = [EventType::Create, EventType::Update];

/// An open session against an encrypted runtime.
///
/// The runtime and the policy are shared: the runtime calls back into the
/// policy during bootstrap while the analysis task holds the runtime.
pub struct Session<R: EncryptedRuntime, P: KeyTrustPolicy> {
    runtime: Arc<R>,
    policy: Arc<P>,
    config: VigilConfig,
}

impl<R, P> Session<R, P>
where
    R: EncryptedRuntime + 'static,
    P: KeyTrustPolicy,
{
    /// Open a session. Fails without side effects if the configuration is invalid.
    pub fn new(runtime: Arc<R>, policy: P, config: VigilConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            local_keys = config.local_keys.len(),
            locale = %config.locale,
            "session opened"
        );
        Ok(Self {
            runtime,
            policy: Arc::new(policy),
            config,
        })
    }

    /// The runtime.
    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    /// The trust policy, shareable with the runtime.
    pub fn policy(&self) -> &Arc<P> {
        &self.policy
    }

    /// The configuration.
    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    /// Filter selecting services that still await analysis.
    pub fn analysis_filter(&self) -> FilterExpression {
        TagFilterBuilder::new()
            .by_code(&CodeStub::pending_analysis())
            .build()
    }

    /// Run key recovery for the given requests through the policy.
    pub fn bootstrap_keys(
        &self,
        requests: &[RecoveryRequest],
    ) -> Result<HashMap<ActorId, RecoveryOutcome>> {
        let recovered = self.policy.recover_keys(requests)?;
        tracing::debug!(
            requested = requests.len(),
            actors = recovered.len(),
            keys = recovered.values().map(RecoveryOutcome::len).sum::<usize>(),
            "key recovery complete"
        );
        Ok(recovered)
    }

    /// Subscribe to pending services and start classifying them in the
    /// background.
    pub async fn start_analysis(&self) -> Result<AnalysisHandle> {
        let filter = self.analysis_filter();
        let channel = self
            .runtime
            .subscribe(&filter, &ANALYSIS_EVENT_TYPES)
            .await?;
        let mut consumer =
            EventConsumer::new(Arc::clone(&self.runtime), self.config.consumer_config())?;

        let (stop, stop_rx) = stop_signal();
        let task = tokio::spawn(async move { consumer.run(&channel, stop_rx).await });

        tracing::info!("analysis started");
        Ok(AnalysisHandle { stop, task })
    }

    /// Stop an analysis task and wait for it to finish.
    pub async fn shutdown(&self, handle: AnalysisHandle) -> Result<ConsumerReport> {
        handle.stop();
        let report = handle.join().await?;
        tracing::info!(
            classified = report.classified,
            dropped = report.dropped,
            "session shut down"
        );
        Ok(report)
    }
}

/// Handle to a running analysis task.
#[derive(Debug)]
pub struct AnalysisHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<ConsumerReport>,
}

impl AnalysisHandle {
    /// Ask the loop to stop after its current iteration.
    pub fn stop(&self) {
        // The task may already be gone if the channel closed.
        let _ = self.stop.send(true);
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) -> Result<ConsumerReport> {
        self.task
            .await
            .map_err(|e| VigilError::Join(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{Actor, ActorType, KeyId, RsaEncryptionAlgorithm, Service};
    use std::time::Duration;
    use vigil_events::MemoryRuntime;
    use vigil_policy::{KeyGenerationDecision, PermissivePolicy, PolicyError, StrictPolicy};

    /// Refuses to recover anything until someone approves it.
    struct DeferringPolicy;

    impl KeyTrustPolicy for DeferringPolicy {
        fn recover_keys(
            &self,
            _requests: &[RecoveryRequest],
        ) -> vigil_policy::Result<HashMap<ActorId, RecoveryOutcome>> {
            Err(PolicyError::Deferred("awaiting approval".into()))
        }

        fn generate_key_for_owner(
            &self,
            _actor: &Actor,
        ) -> vigil_policy::Result<KeyGenerationDecision> {
            Ok(KeyGenerationDecision::Allow)
        }

        fn verify_delegate_public_keys(
            &self,
            _delegate: &Actor,
            candidates: &[KeyId],
        ) -> vigil_policy::Result<Vec<KeyId>> {
            Ok(candidates.to_vec())
        }

        fn requires_anonymous_delegation(&self, _actor: &Actor) -> bool {
            false
        }
    }

    fn pending_service() -> Service {
        Service {
            id: "svc-1".into(),
            contact_id: "ctc-1".into(),
            value_date: None,
            content: Default::default(),
            tags: vec![CodeStub::pending_analysis()],
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = VigilConfig::default();
        config.poll_interval_ms = 0;

        let result = Session::new(MemoryRuntime::new(), PermissivePolicy::default(), config);
        assert!(matches!(result, Err(VigilError::Config(_))));
    }

    #[test]
    fn test_analysis_filter_selects_pending() {
        let session = Session::new(
            MemoryRuntime::new(),
            PermissivePolicy::default(),
            VigilConfig::default(),
        )
        .unwrap();

        let filter = session.analysis_filter();
        assert_eq!(filter.predicates().len(), 1);
        assert!(filter.matches(&pending_service()));

        let mut done = pending_service();
        done.tags.clear();
        assert!(!filter.matches(&done));
    }

    #[test]
    fn test_bootstrap_keys_through_policy() {
        let key = KeyId::new(
            "30820122300d06092a864886f70d01010105000382010f003082010a0282010100b1",
        )
        .unwrap();
        let config = VigilConfig::default().with_local_key(key.as_str(), "AQIDBA==");
        let policy = PermissivePolicy::new(config.key_store());
        let session = Session::new(MemoryRuntime::new(), policy, config).unwrap();

        let actor = Actor::new(ActorId::new("hcp-1"), ActorType::Hcp)
            .with_key(key.clone(), RsaEncryptionAlgorithm::OaepWithSha256);
        let recovered = session
            .bootstrap_keys(&[RecoveryRequest::new(actor.clone(), vec![key.clone()])])
            .unwrap();

        let outcome = &recovered[&actor.id];
        let recovered_key = outcome.get(&key.fingerprint()).unwrap();
        assert!(recovered_key.trusted);
        assert_eq!(recovered_key.material.private_key, vec![1, 2, 3, 4]);
        assert_eq!(
            recovered_key.material.algorithm,
            RsaEncryptionAlgorithm::OaepWithSha256
        );
    }

    #[test]
    fn test_bootstrap_surfaces_policy_error() {
        let session =
            Session::new(MemoryRuntime::new(), DeferringPolicy, VigilConfig::default()).unwrap();

        let actor = Actor::new(ActorId::new("hcp-1"), ActorType::Hcp);
        let key = KeyId::new("30820122aa").unwrap();
        let result = session.bootstrap_keys(&[RecoveryRequest::new(actor, vec![key])]);

        match result {
            Err(VigilError::Policy(PolicyError::Deferred(reason))) => {
                assert_eq!(reason, "awaiting approval");
            }
            other => panic!("expected deferred policy error, got {:?}", other),
        }
    }

    #[test]
    fn test_policy_shared_with_runtime() {
        let session = Session::new(
            MemoryRuntime::new(),
            StrictPolicy::default(),
            VigilConfig::default(),
        )
        .unwrap();

        let handle = Arc::clone(session.policy());
        let patient = Actor::new(ActorId::new("pat-1"), ActorType::Patient);
        assert!(handle.requires_anonymous_delegation(&patient));
        assert!(!handle.generate_key_for_owner(&patient).unwrap().is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown_idle() {
        let session = Session::new(
            MemoryRuntime::new(),
            PermissivePolicy::default(),
            VigilConfig::default(),
        )
        .unwrap();

        let handle = session.start_analysis().await.unwrap();
        assert!(!handle.is_finished());

        let report = session.shutdown(handle).await.unwrap();
        assert_eq!(report, ConsumerReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_analysis() {
        let runtime = MemoryRuntime::new();
        let config = VigilConfig {
            poll_interval_ms: 10,
            ..VigilConfig::default()
        };
        let session =
            Session::new(Arc::clone(&runtime), PermissivePolicy::default(), config).unwrap();

        drop(session.start_analysis().await.unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut service = pending_service();
        service.content.insert(
            "en".into(),
            vigil_core::Content::measure(55.0, CodeStub::glucose_unit()),
        );
        runtime
            .create_contact(vigil_core::Contact {
                id: "ctc-1".into(),
                rev: None,
                opening_date: None,
                closing_date: None,
                services: vec![service],
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(runtime.update_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_after_runtime_closes() {
        let runtime = MemoryRuntime::new();
        let session = Session::new(
            Arc::clone(&runtime),
            PermissivePolicy::default(),
            VigilConfig::default(),
        )
        .unwrap();

        let handle = session.start_analysis().await.unwrap();
        runtime.close().await;

        let report = handle.join().await.unwrap();
        assert_eq!(report.classified, 0);
    }
}
