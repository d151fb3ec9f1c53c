//! # Classifier
//!
//! The retrying wrapper around a [`Predictor`].
//!
//! ## Retry Workflow
//!
//! 1. Submit the staged file to the predictor
//! 2. On success, return the payload untouched; no further attempts are made
//! 3. On failure, stop if this was the last attempt or the error is permanent
//! 4. Otherwise wait for the backoff delay (non-blocking) and try again
//!
//! The error handed back after the final attempt is the one that attempt
//! produced, never an earlier one.
//!
//! ## Sharing
//!
//! A classifier is built once at startup and shared through `Arc`. Concurrent
//! callers use the same predictor handle; [`GradioClient`](super::GradioClient)
//! wraps a pooled `reqwest::Client`, which supports that. `max_in_flight`
//! bounds how many predictions run at once (1 gives single-flight access).

use log::{error, info, warn};
use serde_json::Value;
use std::path::Path;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use super::error::InferenceError;
use super::retry::RetryPolicy;
use super::Predictor;

pub struct Classifier<P> {
    predictor: P,
    policy: RetryPolicy,
    permits: Semaphore,
}

impl<P: Predictor> Classifier<P> {
    /// Creates a classifier with no bound on concurrent predictions.
    pub fn new(predictor: P, policy: RetryPolicy) -> Self {
        Self::with_max_in_flight(predictor, policy, None)
    }

    pub fn with_max_in_flight(predictor: P, policy: RetryPolicy, max_in_flight: Option<usize>) -> Self {
        let permits = match max_in_flight {
            Some(n) => Semaphore::new(n.max(1)),
            None => Semaphore::new(Semaphore::MAX_PERMITS),
        };
        Self {
            predictor,
            policy,
            permits,
        }
    }

    #[cfg(test)]
    fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Classifies the file at `path` using the policy's attempt ceiling.
    pub async fn classify(&self, path: &Path) -> Result<Value, InferenceError> {
        self.classify_with_attempts(path, self.policy.max_attempts)
            .await
    }

    /// Classifies the file at `path`, attempting at most `max_attempts` times.
    ///
    /// A ceiling of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt made, either because the ceiling
    /// was reached or because the policy judged the error not worth retrying.
    pub async fn classify_with_attempts(
        &self,
        path: &Path,
        max_attempts: u32,
    ) -> Result<Value, InferenceError> {
        let max_attempts = max_attempts.max(1);
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| InferenceError::Unavailable("classifier is shutting down".to_string()))?;

        let mut attempt = 1;
        loop {
            info!(
                "📤 Sending request for {} (attempt {}/{})",
                path.display(),
                attempt,
                max_attempts
            );

            match self.predictor.predict(path).await {
                Ok(payload) => {
                    info!("✅ Prediction received: {}", payload);
                    return Ok(payload);
                }
                Err(e) if attempt >= max_attempts => {
                    error!(
                        "❌ Prediction for {} FAILED after {} attempts: {}",
                        path.display(),
                        attempt,
                        e
                    );
                    return Err(e);
                }
                Err(e) if !self.policy.should_retry(&e) => {
                    error!(
                        "❌ Prediction for {} failed with a permanent error on attempt {}: {}",
                        path.display(),
                        attempt,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.backoff.delay_for(attempt);
                    warn!(
                        "Error during prediction (attempt {}/{}): {}; retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::retry::Backoff;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Plays back a fixed script of outcomes, then repeats `fallback`.
    struct ScriptedPredictor {
        script: Mutex<VecDeque<Result<Value, InferenceError>>>,
        fallback: fn() -> Result<Value, InferenceError>,
        calls: AtomicUsize,
        call_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedPredictor {
        fn new(
            script: Vec<Result<Value, InferenceError>>,
            fallback: fn() -> Result<Value, InferenceError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
                call_times: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Predictor for ScriptedPredictor {
        async fn predict(&self, _path: &Path) -> Result<Value, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(self.fallback)
        }
    }

    fn reset() -> Result<Value, InferenceError> {
        Err(InferenceError::Unavailable("connection reset".into()))
    }

    fn payload() -> Value {
        json!({"label": "fake", "confidence": 0.92})
    }

    fn ok_payload() -> Result<Value, InferenceError> {
        Ok(payload())
    }

    fn path() -> &'static Path {
        Path::new("/tmp/staged.jpg")
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(vec![reset(), reset()], ok_payload),
            RetryPolicy::default(),
        );

        let result = classifier.classify(path()).await.unwrap();

        assert_eq!(result, payload());
        assert_eq!(classifier.predictor().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_surfaces_last_error() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(
                vec![
                    Err(InferenceError::Unavailable("first".into())),
                    Err(InferenceError::Unavailable("second".into())),
                ],
                reset,
            ),
            RetryPolicy::default(),
        );

        let err = classifier.classify(path()).await.unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(classifier.predictor().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_makes_one_call_without_delay() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(vec![], ok_payload),
            RetryPolicy::default(),
        );
        let start = Instant::now();

        classifier.classify(path()).await.unwrap();

        assert_eq!(classifier.predictor().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(vec![], reset),
            RetryPolicy::default(),
        );
        let start = Instant::now();

        classifier.classify(path()).await.unwrap_err();

        let times = classifier.predictor().call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(1));
        // No delay after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_fails_immediately() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(vec![], reset),
            RetryPolicy::default(),
        );
        let start = Instant::now();

        let err = classifier
            .classify_with_attempts(path(), 1)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(classifier.predictor().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(vec![], ok_payload),
            RetryPolicy::default(),
        );

        classifier.classify_with_attempts(path(), 0).await.unwrap();

        assert_eq!(classifier.predictor().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(
                vec![Err(InferenceError::Remote {
                    status: 400,
                    message: "invalid image".into(),
                })],
                ok_payload,
            ),
            RetryPolicy::default(),
        );

        let err = classifier.classify(path()).await.unwrap_err();

        assert!(matches!(err, InferenceError::Remote { status: 400, .. }));
        assert_eq!(classifier.predictor().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_all_errors_retries_permanent_errors() {
        let policy = RetryPolicy {
            retry_all_errors: true,
            ..RetryPolicy::default()
        };
        let classifier = Classifier::new(
            ScriptedPredictor::new(
                vec![Err(InferenceError::Protocol("garbled".into()))],
                ok_payload,
            ),
            policy,
        );

        classifier.classify(path()).await.unwrap();

        assert_eq!(classifier.predictor().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_strategy_drives_delays() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Backoff::Exponential {
                base_ms: 100,
                max_ms: 10_000,
            },
            retry_all_errors: false,
        };
        let classifier = Classifier::new(ScriptedPredictor::new(vec![], reset), policy);
        let start = Instant::now();

        classifier.classify(path()).await.unwrap_err();

        assert_eq!(classifier.predictor().calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(100 + 200 + 400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_calls_are_independent() {
        let classifier = Classifier::new(
            ScriptedPredictor::new(vec![], ok_payload),
            RetryPolicy::default(),
        );

        let first = classifier.classify(path()).await.unwrap();
        let second = classifier.classify(path()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(classifier.predictor().calls(), 2);
    }

    /// Counts how many predictions overlap.
    struct SlowPredictor {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Predictor for SlowPredictor {
        async fn predict(&self, _path: &Path) -> Result<Value, InferenceError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(payload())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_in_flight_serializes_calls() {
        let classifier = Arc::new(Classifier::with_max_in_flight(
            SlowPredictor {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            RetryPolicy::default(),
            Some(1),
        ));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let classifier = Arc::clone(&classifier);
            handles.push(tokio::spawn(async move {
                classifier.classify(Path::new("/tmp/a.png")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(classifier.predictor().peak.load(Ordering::SeqCst), 1);
    }
}
