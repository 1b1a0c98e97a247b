#![allow(clippy::unwrap_used)]
// Retry and circuit-breaker behavior of `ResilientExecutor` over a scripted
// fake transport. Time is paused, so backoff sleeps complete instantly.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use loggamera_api::resilience::calculate_backoff;
use loggamera_api::{
    CircuitConfig, CircuitState, Endpoint, Error, RawResponse, ResilientExecutor, RetryConfig,
    Transport, TransportError, TransportErrorKind,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Respond(u16, &'static str),
    Fail,
    Hang,
}

/// Plays back `script` in order, then repeats `fallback` forever.
struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(script: impl IntoIterator<Item = Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    fn always(step: Step) -> Self {
        Self::new([], step)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    async fn send(
        &self,
        _endpoint: Endpoint,
        _body: &Value,
    ) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Respond(status, body) => Ok(RawResponse::new(status, body)),
            Step::Fail => Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            )),
            Step::Hang => std::future::pending().await,
        }
    }
}

const OK_BODY: &str = r#"{"Data":{"Values":[]},"Error":null}"#;

fn executor(transport: ScriptedTransport) -> ResilientExecutor<ScriptedTransport> {
    ResilientExecutor::new(transport, RetryConfig::default(), CircuitConfig::default())
}

fn body() -> Value {
    json!({ "DeviceId": 1 })
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_until_success() {
    let exec = executor(ScriptedTransport::new(
        [Step::Fail, Step::Respond(503, ""), Step::Respond(429, "")],
        Step::Respond(200, OK_BODY),
    ));

    let resp = assert_ok!(
        exec.execute(Endpoint::RawData, &body(), &CancellationToken::new())
            .await
    );
    assert_eq!(resp.status, 200);
    assert_eq!(exec.transport().calls(), 4);
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_follows_schedule() {
    let exec = executor(ScriptedTransport::always(Step::Respond(500, "")));
    let config = RetryConfig::default();
    let expected: Duration = (0..config.max_retries)
        .map(|a| calculate_backoff(a, &config))
        .sum();

    let start = Instant::now();
    let err = assert_err!(
        exec.execute(Endpoint::RawData, &body(), &CancellationToken::new())
            .await
    );
    let elapsed = start.elapsed();

    assert!(matches!(err, Error::Network { attempts: 4, status: Some(500), .. }));
    assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
    assert!(elapsed < expected + Duration::from_millis(50), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_definitive_response_is_not_retried() {
    let exec = executor(ScriptedTransport::always(Step::Respond(404, "")));

    let resp = assert_ok!(
        exec.execute(Endpoint::RawData, &body(), &CancellationToken::new())
            .await
    );
    assert_eq!(resp.status, 404);
    assert_eq!(exec.transport().calls(), 1);
}

// ── Circuit breaker ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_three_exhausted_calls_open_the_circuit() {
    let exec = executor(ScriptedTransport::always(Step::Fail));
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        let err = assert_err!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
        assert!(matches!(err, Error::Network { .. }));
    }
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::Open);
    let calls_before = exec.transport().calls();
    assert_eq!(calls_before, 12);

    let err = assert_err!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
    match err {
        Error::CircuitOpen {
            endpoint,
            retry_after,
        } => {
            assert_eq!(endpoint, Endpoint::RawData);
            assert!(retry_after <= Duration::from_secs(300));
        }
        other => panic!("expected CircuitOpen, got: {other:?}"),
    }
    assert_eq!(exec.transport().calls(), calls_before, "no transport call while open");
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_is_per_endpoint() {
    let exec = ResilientExecutor::new(
        ScriptedTransport::new(
            std::iter::repeat_n(Step::Fail, 3),
            Step::Respond(200, OK_BODY),
        ),
        RetryConfig::disabled(),
        CircuitConfig::default(),
    );
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        assert_err!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
    }
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::Open);

    assert_ok!(exec.execute(Endpoint::GenericDevice, &body(), &cancel).await);
}

#[tokio::test(start_paused = true)]
async fn test_successful_trial_closes_circuit() {
    let exec = ResilientExecutor::new(
        ScriptedTransport::new(
            std::iter::repeat_n(Step::Fail, 3),
            Step::Respond(200, OK_BODY),
        ),
        RetryConfig::disabled(),
        CircuitConfig::default(),
    );
    let cancel = CancellationToken::new();
    for _ in 0..3 {
        assert_err!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
    }

    tokio::time::advance(Duration::from_secs(301)).await;
    assert_ok!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::Closed);
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_retrying() {
    let exec = std::sync::Arc::new(executor(ScriptedTransport::always(Step::Fail)));
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let exec = std::sync::Arc::clone(&exec);
        let cancel = cancel.clone();
        async move { exec.execute(Endpoint::RawData, &body(), &cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let err = assert_err!(task.await.unwrap());
    assert!(matches!(err, Error::Cancelled { endpoint: Endpoint::RawData }));
    assert_eq!(exec.transport().calls(), 1);
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_makes_no_call() {
    let exec = executor(ScriptedTransport::always(Step::Respond(200, OK_BODY)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(exec.execute(Endpoint::Devices, &body(), &cancel).await);
    assert!(matches!(err, Error::Cancelled { .. }));
    assert_eq!(exec.transport().calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_trial_releases_half_open_slot() {
    let exec = std::sync::Arc::new(ResilientExecutor::new(
        ScriptedTransport::new(
            [Step::Fail, Step::Fail, Step::Fail, Step::Hang],
            Step::Respond(200, OK_BODY),
        ),
        RetryConfig::disabled(),
        CircuitConfig::default(),
    ));
    let cancel = CancellationToken::new();
    for _ in 0..3 {
        assert_err!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
    }
    tokio::time::advance(Duration::from_secs(301)).await;

    // The trial hangs until cancelled.
    let trial_cancel = CancellationToken::new();
    let trial = tokio::spawn({
        let exec = std::sync::Arc::clone(&exec);
        let trial_cancel = trial_cancel.clone();
        async move { exec.execute(Endpoint::RawData, &body(), &trial_cancel).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::HalfOpen);
    trial_cancel.cancel();
    assert!(matches!(trial.await.unwrap(), Err(Error::Cancelled { .. })));

    // The next caller gets to run the trial immediately.
    assert_ok!(exec.execute(Endpoint::RawData, &body(), &cancel).await);
    assert_eq!(exec.circuit_state(Endpoint::RawData), CircuitState::Closed);
}
