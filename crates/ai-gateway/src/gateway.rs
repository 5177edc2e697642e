//! Key rotation, bounded failover and fallback around one generation call
//!
//! Per `generate` call the loop runs at most `pool.len()` attempts, strictly
//! one after another. Every attempt consumes one step of the pool's shared
//! cursor, failed or not, so the rotation continues where the previous call
//! (from any caller) left it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use key_pool::CredentialPool;
use provider::{ErrorClassification, GenerationError, TextGenerator};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::render::markdown_to_html;

/// Returned to callers when every attempt failed. Contains no upstream detail.
pub const FALLBACK_MESSAGE: &str =
    "<p>The AI service is currently unavailable. Please try again later.</p>";

/// Per-attempt bound used when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resilient front door to the text-generation service.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct AiGateway {
    pool: Arc<CredentialPool>,
    generator: Arc<dyn TextGenerator>,
    attempt_timeout: Duration,
}

impl AiGateway {
    pub fn new(
        pool: Arc<CredentialPool>,
        generator: Arc<dyn TextGenerator>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            generator,
            attempt_timeout,
        }
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    /// Generate rendered HTML for `prompt`. Never fails.
    ///
    /// On exhaustion the fixed `FALLBACK_MESSAGE` is returned instead of an
    /// error.
    pub async fn generate(&self, prompt: &str) -> String {
        match self.try_generate(prompt).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "all keys failed, returning fallback");
                crate::metrics::record_fallback();
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Generate rendered HTML for `prompt`, reporting exhaustion as an error.
    ///
    /// Attempt k starts only after attempt k-1 has failed. No attempt is made
    /// after the first success, and no key is tried twice within one call.
    #[instrument(skip_all, fields(generator = self.generator.id(), prompt_chars = prompt.len()))]
    pub async fn try_generate(&self, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let max_attempts = self.pool.len();
        let mut tried = Vec::with_capacity(max_attempts);

        for attempt in 1..=max_attempts {
            let selected = self.pool.next_untried(&tried);
            tried.push(selected.index);
            let credential = selected.credential.label();

            match self.attempt(selected.credential.expose(), prompt).await {
                Ok(raw) => {
                    self.pool.report_success(selected.index);
                    crate::metrics::record_attempt_success();
                    crate::metrics::record_generate("rendered", started.elapsed().as_secs_f64());
                    debug!(credential, attempt, "generation succeeded");
                    return Ok(markdown_to_html(&raw));
                }
                Err(e) => {
                    let classification = classify(&e);
                    self.pool.report_failure(selected.index, classification);
                    crate::metrics::record_attempt_failure(classification);
                    warn!(
                        credential,
                        attempt,
                        max_attempts,
                        classification = classification.label(),
                        error_kind = e.kind(),
                        error = %e,
                        "generation attempt failed"
                    );
                }
            }
        }

        crate::metrics::record_generate("fallback", started.elapsed().as_secs_f64());
        Err(Error::Exhausted {
            attempts: max_attempts,
        })
    }

    /// One remote call bounded by the attempt timeout.
    async fn attempt(&self, key: &str, prompt: &str) -> provider::Result<String> {
        match tokio::time::timeout(self.attempt_timeout, self.generator.generate(key, prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout),
        }
    }
}

/// Map an attempt failure to the pool's health classification.
fn classify(error: &GenerationError) -> ErrorClassification {
    match error {
        GenerationError::Rejected { status, body } => key_pool::classify_status(*status, body),
        _ => ErrorClassification::Transient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Secret;
    use std::collections::{HashMap, HashSet};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Fails for the listed keys, succeeds with `reply` for the rest, and
    /// records every key it was called with.
    struct ScriptedGenerator {
        failing: HashSet<String>,
        /// Keys that fail with a 503 instead of a quota 429.
        flaky: HashSet<String>,
        reply: String,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(failing: &[&str], reply: &str) -> Arc<Self> {
            Self::with_flaky(failing, &[], reply)
        }

        fn with_flaky(failing: &[&str], flaky: &[&str], reply: &str) -> Arc<Self> {
            Arc::new(Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                flaky: flaky.iter().map(|s| s.to_string()).collect(),
                reply: reply.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn id(&self) -> &str {
            "scripted"
        }

        fn generate<'a>(
            &'a self,
            credential: &'a str,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = provider::Result<String>> + Send + 'a>> {
            self.calls.lock().unwrap().push(credential.to_string());
            let result = if self.failing.contains(credential) {
                Err(GenerationError::Rejected {
                    status: 429,
                    body: format!("RESOURCE_EXHAUSTED for {credential}: internal-trace-7f3a"),
                })
            } else if self.flaky.contains(credential) {
                Err(GenerationError::Rejected {
                    status: 503,
                    body: "backend overloaded".into(),
                })
            } else {
                Ok(self.reply.clone())
            };
            Box::pin(async move { result })
        }
    }

    /// Fails the first attempt of every distinct prompt, then succeeds.
    struct FailOncePerPrompt {
        seen: Mutex<HashMap<String, usize>>,
    }

    impl TextGenerator for FailOncePerPrompt {
        fn id(&self) -> &str {
            "fail-once"
        }

        fn generate<'a>(
            &'a self,
            _credential: &'a str,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = provider::Result<String>> + Send + 'a>> {
            let first = {
                let mut seen = self.seen.lock().unwrap();
                let count = seen.entry(prompt.to_string()).or_insert(0);
                *count += 1;
                *count == 1
            };
            Box::pin(async move {
                tokio::task::yield_now().await;
                if first {
                    Err(GenerationError::Transport("connection reset".into()))
                } else {
                    Ok(format!("answer to {prompt}"))
                }
            })
        }
    }

    /// Never answers; records each key it was called with.
    struct HangingGenerator {
        calls: Mutex<Vec<String>>,
    }

    impl TextGenerator for HangingGenerator {
        fn id(&self) -> &str {
            "hanging"
        }

        fn generate<'a>(
            &'a self,
            credential: &'a str,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = provider::Result<String>> + Send + 'a>> {
            self.calls.lock().unwrap().push(credential.to_string());
            Box::pin(std::future::pending::<provider::Result<String>>())
        }
    }

    fn pool(names: &[&str]) -> Arc<CredentialPool> {
        let keys = names.iter().map(|n| Secret::from(*n)).collect();
        Arc::new(CredentialPool::new(keys, None).unwrap())
    }

    fn cooling_pool(names: &[&str]) -> Arc<CredentialPool> {
        let keys = names.iter().map(|n| Secret::from(*n)).collect();
        Arc::new(CredentialPool::new(keys, Some(Duration::from_secs(600))).unwrap())
    }

    fn gateway(pool: Arc<CredentialPool>, generator: Arc<dyn TextGenerator>) -> AiGateway {
        AiGateway::new(pool, generator, DEFAULT_ATTEMPT_TIMEOUT)
    }

    #[tokio::test]
    async fn fails_over_to_third_key_and_renders() {
        let generator = ScriptedGenerator::new(&["A", "B"], "**Sow** after the first rain.");
        let gw = gateway(pool(&["A", "B", "C"]), generator.clone());

        let html = gw.generate("x").await;

        assert_eq!(html, "<p><strong>Sow</strong> after the first rain.</p>\n");
        assert_eq!(generator.calls(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn all_failing_returns_fallback_after_each_key_once() {
        let generator = ScriptedGenerator::new(&["A", "B"], "unused");
        let gw = gateway(pool(&["A", "B"]), generator.clone());

        let html = gw.generate("x").await;

        assert_eq!(html, FALLBACK_MESSAGE);
        assert_eq!(generator.calls(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn exhaustion_tries_every_key_exactly_once() {
        let names = ["k1", "k2", "k3", "k4", "k5"];
        let generator = ScriptedGenerator::new(&names, "unused");
        let p = pool(&names);
        // Start mid-rotation so the call does not begin at index 0.
        p.next();
        p.next();
        let gw = gateway(p.clone(), generator.clone());

        let err = gw.try_generate("x").await.unwrap_err();

        assert!(matches!(err, Error::Exhausted { attempts: 5 }), "got {err:?}");
        assert_eq!(generator.calls(), vec!["k3", "k4", "k5", "k1", "k2"]);
        let distinct: HashSet<_> = generator.calls().into_iter().collect();
        assert_eq!(distinct.len(), names.len());
        assert_eq!(p.dispensed(), 2 + 5);
    }

    #[tokio::test]
    async fn no_attempts_after_first_success() {
        let generator = ScriptedGenerator::new(&["A"], "ok");
        let p = pool(&["A", "B", "C", "D"]);
        let gw = gateway(p.clone(), generator.clone());

        gw.generate("x").await;

        assert_eq!(generator.calls(), vec!["A", "B"]);
        assert_eq!(p.dispensed(), 2);
    }

    #[tokio::test]
    async fn cursor_is_not_reset_between_calls() {
        let generator = ScriptedGenerator::new(&[], "ok");
        let p = pool(&["A", "B", "C"]);
        let gw = gateway(p.clone(), generator.clone());

        for _ in 0..7 {
            gw.generate("x").await;
        }

        assert_eq!(p.dispensed(), 7);
        assert_eq!(p.dispensed() % p.len(), 7 % 3);
        assert_eq!(generator.calls(), vec!["A", "B", "C", "A", "B", "C", "A"]);
    }

    #[tokio::test]
    async fn failed_attempts_advance_shared_rotation() {
        let generator = ScriptedGenerator::new(&["A"], "ok");
        let p = pool(&["A", "B", "C"]);
        let gw = gateway(p.clone(), generator.clone());

        gw.generate("first").await; // A fails, B succeeds
        gw.generate("second").await; // continues at C

        assert_eq!(generator.calls(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn fallback_does_not_leak_upstream_error() {
        let generator = ScriptedGenerator::new(&["A", "B", "C"], "unused");
        let gw = gateway(pool(&["A", "B", "C"]), generator);

        let first = gw.generate("x").await;
        let second = gw.generate("y").await;

        assert_eq!(first.as_bytes(), FALLBACK_MESSAGE.as_bytes());
        assert_eq!(first, second);
        assert!(!first.contains("RESOURCE_EXHAUSTED"));
        assert!(!first.contains("internal-trace"));
    }

    #[tokio::test]
    async fn failures_and_successes_reach_pool_health() {
        let generator = ScriptedGenerator::new(&["A"], "ok");
        let p = pool(&["A", "B"]);
        let gw = gateway(p.clone(), generator);

        gw.generate("x").await;

        let health = p.health();
        assert_eq!(health["keys"][0]["failures"], 1);
        assert_eq!(health["keys"][1]["successes"], 1);
    }

    #[tokio::test]
    async fn cooldown_pool_parks_quota_exhausted_key() {
        let generator = ScriptedGenerator::new(&["A"], "ok");
        let keys = ["A", "B"].iter().map(|n| Secret::from(*n)).collect();
        let p = Arc::new(CredentialPool::new(keys, Some(Duration::from_secs(600))).unwrap());
        let gw = gateway(p.clone(), generator.clone());

        gw.generate("x").await; // A fails with quota → parked, B succeeds
        gw.generate("y").await; // cursor at A again, but A is parked → B

        assert_eq!(generator.calls(), vec!["A", "B", "B"]);
        assert_eq!(p.health()["keys_cooling_down"], 1);
    }

    #[tokio::test]
    async fn cooldown_exhaustion_still_tries_every_key_once() {
        let generator = ScriptedGenerator::new(&["A", "B", "C"], "unused");
        let p = cooling_pool(&["A", "B", "C"]);
        p.report_failure(0, ErrorClassification::QuotaExceeded);
        let gw = gateway(p.clone(), generator.clone());

        let html = gw.generate("x").await;

        assert_eq!(html, FALLBACK_MESSAGE);
        let calls = generator.calls();
        assert_eq!(calls, vec!["B", "C", "A"]);
        assert_eq!(calls.iter().collect::<HashSet<_>>().len(), p.len());
        assert_eq!(p.dispensed(), 3);
    }

    #[tokio::test]
    async fn cooldown_transient_failure_moves_on_to_next_key() {
        let generator = ScriptedGenerator::with_flaky(&["A"], &["B"], "from C");
        let p = cooling_pool(&["A", "B", "C"]);
        p.report_failure(0, ErrorClassification::QuotaExceeded);
        let gw = gateway(p.clone(), generator.clone());

        let html = gw.generate("x").await;

        assert_eq!(html, "<p>from C</p>\n");
        assert_eq!(generator.calls(), vec!["B", "C"]);
    }

    #[tokio::test]
    async fn cooldown_with_every_key_parked_tries_each_once() {
        let generator = ScriptedGenerator::new(&["A", "B", "C", "D"], "unused");
        let p = cooling_pool(&["A", "B", "C", "D"]);
        for index in [0, 2, 3] {
            p.report_failure(index, ErrorClassification::Permanent);
        }
        let gw = gateway(p.clone(), generator.clone());

        gw.generate("x").await;

        let calls = generator.calls();
        assert_eq!(calls.len(), p.len());
        assert_eq!(calls.iter().collect::<HashSet<_>>().len(), p.len());
        assert_eq!(calls[0], "B");
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_time_out_and_fail_over() {
        let generator = Arc::new(HangingGenerator {
            calls: Mutex::new(Vec::new()),
        });
        let gw = AiGateway::new(pool(&["A", "B"]), generator.clone(), Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let html = gw.generate("x").await;

        assert_eq!(html, FALLBACK_MESSAGE);
        assert_eq!(*generator.calls.lock().unwrap(), vec!["A", "B"]);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_each_fail_once_then_succeed() {
        let generator = Arc::new(FailOncePerPrompt {
            seen: Mutex::new(HashMap::new()),
        });
        let p = pool(&["A", "B", "C"]);
        let gw = Arc::new(gateway(p.clone(), generator));
        let k = 32;

        let handles: Vec<_> = (0..k)
            .map(|i| {
                let gw = gw.clone();
                tokio::spawn(async move { gw.generate(&format!("prompt-{i}")).await })
            })
            .collect();

        let mut successes = 0;
        for (i, handle) in handles.into_iter().enumerate() {
            let html = handle.await.unwrap();
            assert_ne!(html, FALLBACK_MESSAGE);
            assert!(html.contains(&format!("prompt-{i}")), "got: {html}");
            successes += 1;
        }

        assert_eq!(successes, k);
        assert_eq!(p.dispensed(), 2 * k);
    }

    #[test]
    fn classify_uses_status_for_rejections_only() {
        assert_eq!(
            classify(&GenerationError::Rejected {
                status: 429,
                body: "RESOURCE_EXHAUSTED".into()
            }),
            ErrorClassification::QuotaExceeded
        );
        assert_eq!(
            classify(&GenerationError::Rejected {
                status: 403,
                body: String::new()
            }),
            ErrorClassification::Permanent
        );
        assert_eq!(classify(&GenerationError::Timeout), ErrorClassification::Transient);
        assert_eq!(classify(&GenerationError::Empty), ErrorClassification::Transient);
    }
}
