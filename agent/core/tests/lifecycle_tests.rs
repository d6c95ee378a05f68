// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_agent_core::application::{AgentOptions, LifecycleController, LifecycleObserver, LifecycleState, Termination};
use tether_agent_core::domain::agent::{Agent, AgentConstructor, AgentError};
use tether_agent_core::domain::cluster_registration::{ClusterRegistrationOptions, FLAG_PARENT_URL};
use tether_agent_core::domain::controller_options::ControllerOptions;
use tether_agent_core::domain::error::BootstrapError;
use tether_agent_core::domain::feature_gate::{Feature, FeatureGates};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Transition(LifecycleState),
    ScopeReleased,
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn transitions(&self) -> Vec<LifecycleState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Transition(state) => Some(state),
                Event::ScopeReleased => None,
            })
            .collect()
    }

    fn scope_releases(&self) -> usize {
        self.events()
            .into_iter()
            .filter(|e| *e == Event::ScopeReleased)
            .count()
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_transition(&self, _from: LifecycleState, to: LifecycleState) {
        self.events.lock().unwrap().push(Event::Transition(to));
    }

    fn on_scope_released(&self) {
        self.events.lock().unwrap().push(Event::ScopeReleased);
    }
}

#[derive(Debug, Clone, Copy)]
enum Behavior {
    ConstructFails,
    RunFails,
    RunUntilCancelled,
    ReturnImmediately,
}

/// Stub collaborator that counts cancellation deliveries on the token it
/// was constructed with.
struct StubConstructor {
    behavior: Behavior,
    constructed: AtomicUsize,
    cancellations: Arc<AtomicUsize>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
    running: Arc<Notify>,
    seen_registration: Mutex<Option<ClusterRegistrationOptions>>,
    seen_features: Mutex<Option<FeatureGates>>,
}

impl StubConstructor {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            constructed: AtomicUsize::new(0),
            cancellations: Arc::new(AtomicUsize::new(0)),
            watchers: Mutex::new(Vec::new()),
            running: Arc::new(Notify::new()),
            seen_registration: Mutex::new(None),
            seen_features: Mutex::new(None),
        }
    }

    fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Waits for every cancellation watcher, then returns the delivery count.
    async fn cancellations(&self) -> usize {
        let watchers: Vec<_> = self.watchers.lock().unwrap().drain(..).collect();
        for watcher in watchers {
            tokio::time::timeout(Duration::from_secs(1), watcher)
                .await
                .expect("execution token was never cancelled")
                .unwrap();
        }
        self.cancellations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentConstructor for StubConstructor {
    async fn construct(
        &self,
        token: CancellationToken,
        registration: ClusterRegistrationOptions,
        _controller: ControllerOptions,
        features: FeatureGates,
    ) -> Result<Box<dyn Agent>, AgentError> {
        self.constructed.fetch_add(1, Ordering::SeqCst);
        *self.seen_registration.lock().unwrap() = Some(registration);
        *self.seen_features.lock().unwrap() = Some(features);

        let watched = token.clone();
        let cancellations = self.cancellations.clone();
        self.watchers.lock().unwrap().push(tokio::spawn(async move {
            watched.cancelled().await;
            cancellations.fetch_add(1, Ordering::SeqCst);
        }));

        if let Behavior::ConstructFails = self.behavior {
            return Err(AgentError::ParentUnreachable("connection refused".to_string()));
        }

        Ok(Box::new(StubAgent {
            behavior: self.behavior,
            token,
            running: self.running.clone(),
        }))
    }
}

struct StubAgent {
    behavior: Behavior,
    token: CancellationToken,
    running: Arc<Notify>,
}

#[async_trait]
impl Agent for StubAgent {
    async fn run(self: Box<Self>) -> Result<(), AgentError> {
        self.running.notify_one();
        match self.behavior {
            Behavior::RunFails => Err(AgentError::Internal("heartbeat loop crashed".to_string())),
            Behavior::RunUntilCancelled => {
                self.token.cancelled().await;
                Ok(())
            }
            Behavior::ReturnImmediately | Behavior::ConstructFails => Ok(()),
        }
    }
}

fn valid_options() -> AgentOptions {
    let mut opts = AgentOptions::new().unwrap();
    opts.cluster_registration.cluster_id = Some("edge-01".to_string());
    opts.cluster_registration.parent_url = Some("https://parent.example.com:6443".to_string());
    opts.cluster_registration.bootstrap_token = Some("abcdef.0123456789abcdef".to_string());
    opts.controller.leader_election.identity = Some("edge-01_holder".to_string());
    opts
}

fn controller(observer: &Arc<RecordingObserver>) -> LifecycleController {
    LifecycleController::new(FeatureGates::default())
        .with_observer(observer.clone())
        .with_hostname_source(|| Ok("edge-host".to_string()))
}

#[tokio::test]
async fn test_success_walks_every_state_in_order() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ReturnImmediately);
    let root = CancellationToken::new();

    let result = controller(&observer).run(valid_options(), &root, &stub).await;

    assert_ok!(result);
    assert_eq!(
        observer.transitions(),
        vec![
            LifecycleState::Completing,
            LifecycleState::Validating,
            LifecycleState::Configured,
            LifecycleState::Running,
            LifecycleState::Terminated(Termination::Success),
        ]
    );
    assert_eq!(stub.constructed(), 1);
    assert_eq!(stub.cancellations().await, 1);
    assert_eq!(observer.scope_releases(), 1);
    assert!(!root.is_cancelled());
}

#[tokio::test]
async fn test_scope_is_released_before_termination() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ReturnImmediately);

    controller(&observer)
        .run(valid_options(), &CancellationToken::new(), &stub)
        .await
        .unwrap();

    let events = observer.events();
    let released = events.iter().position(|e| *e == Event::ScopeReleased).unwrap();
    let terminated = events
        .iter()
        .position(|e| *e == Event::Transition(LifecycleState::Terminated(Termination::Success)))
        .unwrap();
    assert!(released < terminated);
}

#[tokio::test]
async fn test_completion_failure_stops_before_validation() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ReturnImmediately);

    let mut opts = valid_options();
    opts.cluster_registration.cluster_id = None;

    let result = LifecycleController::new(FeatureGates::default())
        .with_observer(observer.clone())
        .with_hostname_source(|| Err("uname failed".to_string()))
        .run(opts, &CancellationToken::new(), &stub)
        .await;

    assert!(matches!(result, Err(BootstrapError::Completion(_))));
    assert_eq!(
        observer.transitions(),
        vec![
            LifecycleState::Completing,
            LifecycleState::Terminated(Termination::Error),
        ]
    );
    assert_eq!(stub.constructed(), 0);
    assert_eq!(observer.scope_releases(), 0);
}

#[tokio::test]
async fn test_missing_parent_url_is_named_and_agent_never_built() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ReturnImmediately);

    let mut opts = valid_options();
    opts.cluster_registration.parent_url = None;

    let result = controller(&observer)
        .run(opts, &CancellationToken::new(), &stub)
        .await;

    match assert_err!(result) {
        BootstrapError::Validation(errors) => {
            assert!(errors.has_field(FLAG_PARENT_URL));
            assert_eq!(errors.len(), 1);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(
        observer.transitions(),
        vec![
            LifecycleState::Completing,
            LifecycleState::Validating,
            LifecycleState::Terminated(Termination::Error),
        ]
    );
    assert_eq!(stub.constructed(), 0);
    assert_eq!(observer.scope_releases(), 0);
}

#[tokio::test]
async fn test_validation_reports_every_violation() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ReturnImmediately);

    let mut opts = valid_options();
    opts.cluster_registration.parent_url = None;
    opts.cluster_registration.bootstrap_token = None;
    opts.controller.workers = 0;

    let err = controller(&observer)
        .run(opts, &CancellationToken::new(), &stub)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("--cluster-reg-parent-url: required"));
    assert!(message.contains("--cluster-reg-token: required"));
    assert!(message.contains("--workers: must be at least 1"));
}

#[tokio::test]
async fn test_construction_failure_cancels_scope_once() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ConstructFails);

    let result = controller(&observer)
        .run(valid_options(), &CancellationToken::new(), &stub)
        .await;

    assert!(matches!(result, Err(BootstrapError::AgentConstruction(AgentError::ParentUnreachable(_)))));
    assert_eq!(
        observer.transitions(),
        vec![
            LifecycleState::Completing,
            LifecycleState::Validating,
            LifecycleState::Configured,
            LifecycleState::Terminated(Termination::Error),
        ]
    );
    assert_eq!(stub.cancellations().await, 1);
    assert_eq!(observer.scope_releases(), 1);
}

#[tokio::test]
async fn test_run_failure_cancels_scope_once() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::RunFails);

    let result = controller(&observer)
        .run(valid_options(), &CancellationToken::new(), &stub)
        .await;

    assert!(matches!(result, Err(BootstrapError::AgentRuntime(_))));
    assert_eq!(
        observer.transitions().last(),
        Some(&LifecycleState::Terminated(Termination::Error))
    );
    assert_eq!(stub.cancellations().await, 1);
    assert_eq!(observer.scope_releases(), 1);
}

#[tokio::test]
async fn test_root_interrupt_shuts_agent_down_cleanly() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::RunUntilCancelled);
    let root = CancellationToken::new();

    let running = stub.running.clone();
    let interrupter = root.clone();
    tokio::spawn(async move {
        running.notified().await;
        interrupter.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        controller(&observer).run(valid_options(), &root, &stub),
    )
    .await
    .expect("agent did not observe root cancellation");

    assert_ok!(result);
    assert_eq!(stub.cancellations().await, 1);
    assert_eq!(observer.scope_releases(), 1);
    assert_eq!(
        observer.transitions().last(),
        Some(&LifecycleState::Terminated(Termination::Success))
    );
}

#[tokio::test]
async fn test_collaborator_receives_completed_options_and_sealed_gates() {
    let observer = Arc::new(RecordingObserver::default());
    let stub = StubConstructor::new(Behavior::ReturnImmediately);

    let mut opts = valid_options();
    opts.cluster_registration.cluster_id = None;

    controller(&observer)
        .run(opts, &CancellationToken::new(), &stub)
        .await
        .unwrap();

    let registration = stub.seen_registration.lock().unwrap().clone().unwrap();
    assert_eq!(registration.cluster_id.as_deref(), Some("edge-host"));
    assert!(registration.cluster_name.is_some());

    let features = stub.seen_features.lock().unwrap().clone().unwrap();
    assert!(features.enabled(Feature::SocketConnection));
}
