//! Shared rotation cursor and per-key health
//!
//! The key list is fixed at construction. A single `AtomicUsize` cursor is the
//! only state mutated on the selection path, so concurrent callers always get
//! distinct cursor values and the cursor never loses an increment.
//!
//! Per-key counters and cooldown deadlines are atomics too; reporting an
//! outcome never takes a lock.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use common::Secret;
use provider::ErrorClassification;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// One API key plus its non-secret label.
///
/// The label is derived from a hash of the key so logs and health output can
/// tell keys apart without revealing them.
#[derive(Debug, Clone)]
pub struct Credential {
    label: String,
    key: Secret<String>,
}

impl Credential {
    pub fn new(key: Secret<String>) -> Self {
        let label = fingerprint(key.expose());
        Self { label, key }
    }

    /// Stable, loggable identity (`key-1a2b3c4d`).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The raw key, for the outgoing request only.
    pub fn expose(&self) -> &str {
        self.key.expose()
    }
}

/// `key-` followed by the first 4 bytes of the key's SHA-256, hex encoded.
fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("key-{hex}")
}

/// A key handed out by `next()`.
#[derive(Debug)]
pub struct SelectedCredential<'a> {
    /// Position of the key in the pool.
    pub index: usize,
    /// Cursor value consumed by this selection; unique per call.
    pub ticket: usize,
    pub credential: &'a Credential,
}

#[derive(Debug, Default)]
struct KeyHealth {
    successes: AtomicU64,
    failures: AtomicU64,
    /// Milliseconds since pool creation until which the key is parked; 0 = never.
    cooling_until: AtomicU64,
}

impl KeyHealth {
    fn is_cooling(&self, now_millis: u64) -> bool {
        self.cooling_until.load(Ordering::Relaxed) > now_millis
    }
}

/// Round-robin pool of API keys with an atomic cursor.
pub struct CredentialPool {
    credentials: Vec<Credential>,
    health: Vec<KeyHealth>,
    cursor: AtomicUsize,
    cooldown: Option<Duration>,
    epoch: Instant,
}

impl CredentialPool {
    /// Build a pool from configured keys.
    ///
    /// An empty list or a blank key is a configuration error. A zero cooldown
    /// is the same as none: pure round-robin.
    pub fn new(keys: Vec<Secret<String>>, cooldown: Option<Duration>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::Empty);
        }
        if let Some(position) = keys.iter().position(|k| k.expose().trim().is_empty()) {
            return Err(Error::BlankCredential(position));
        }

        let credentials: Vec<Credential> = keys.into_iter().map(Credential::new).collect();
        let health = credentials.iter().map(|_| KeyHealth::default()).collect();
        let cooldown = cooldown.filter(|d| !d.is_zero());

        info!(
            keys = credentials.len(),
            cooldown_secs = cooldown.map(|d| d.as_secs()).unwrap_or(0),
            "credential pool initialized"
        );

        Ok(Self {
            credentials,
            health,
            cursor: AtomicUsize::new(0),
            cooldown,
            epoch: Instant::now(),
        })
    }

    /// Number of keys in the pool (always at least one).
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Total rotation steps taken since creation.
    pub fn dispensed(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown
    }

    /// Labels of all keys, in rotation order.
    pub fn labels(&self) -> Vec<&str> {
        self.credentials.iter().map(Credential::label).collect()
    }

    /// Hand out the next key. Same as `next_untried(&[])`.
    pub fn next(&self) -> SelectedCredential<'_> {
        self.next_untried(&[])
    }

    /// Hand out the next key not listed in `tried`.
    ///
    /// Consumes exactly one cursor step. Starting at `ticket % len`, the first
    /// key that is neither in `tried` nor parked is returned; failing that,
    /// the first key not in `tried`. Without a cooldown nothing is parked, so
    /// a retry loop walking consecutive tickets sees plain round-robin order.
    /// Only when every key has been tried is the cursor's own key returned.
    pub fn next_untried(&self, tried: &[usize]) -> SelectedCredential<'_> {
        let n = self.credentials.len();
        let ticket = self.cursor.fetch_add(1, Ordering::Relaxed);
        let start = ticket % n;

        let now = self.cooldown.map(|_| self.now_millis());
        let untried = move || {
            (0..n)
                .map(move |offset| (start + offset) % n)
                .filter(move |i| !tried.contains(i))
        };

        let index = untried()
            .find(|&i| now.is_none_or(|now| !self.health[i].is_cooling(now)))
            .or_else(|| untried().next())
            .unwrap_or(start);

        SelectedCredential {
            index,
            ticket,
            credential: &self.credentials[index],
        }
    }

    /// Record a successful call. Clears any cooldown on the key.
    pub fn report_success(&self, index: usize) {
        let Some(health) = self.health.get(index) else {
            warn!(index, "success reported for unknown key index");
            return;
        };
        health.successes.fetch_add(1, Ordering::Relaxed);
        health.cooling_until.store(0, Ordering::Relaxed);
    }

    /// Record a failed call.
    ///
    /// - QuotaExceeded / Permanent → parked for the cooldown (if configured)
    /// - Transient → counted only
    pub fn report_failure(&self, index: usize, classification: ErrorClassification) {
        let Some(health) = self.health.get(index) else {
            warn!(index, "failure reported for unknown key index");
            return;
        };
        health.failures.fetch_add(1, Ordering::Relaxed);

        let label = self.credentials[index].label();
        match (classification, self.cooldown) {
            (ErrorClassification::Transient, _) | (_, None) => {
                debug!(credential = label, classification = classification.label(), "failure recorded");
            }
            (_, Some(cooldown)) => {
                let cooldown_millis = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
                let until = self.now_millis().saturating_add(cooldown_millis);
                health.cooling_until.store(until, Ordering::Relaxed);
                info!(
                    credential = label,
                    classification = classification.label(),
                    cooldown_secs = cooldown.as_secs(),
                    "key entering cooldown"
                );
            }
        }
    }

    /// Pool health summary for the health endpoint.
    ///
    /// Status mapping: all keys usable → healthy, some → degraded,
    /// none → unhealthy. Never includes key material.
    pub fn health(&self) -> serde_json::Value {
        let now = self.now_millis();
        let mut keys = Vec::with_capacity(self.credentials.len());
        let mut available = 0usize;
        let mut cooling = 0usize;

        for (credential, health) in self.credentials.iter().zip(&self.health) {
            let until = health.cooling_until.load(Ordering::Relaxed);
            let successes = health.successes.load(Ordering::Relaxed);
            let failures = health.failures.load(Ordering::Relaxed);

            if until > now {
                cooling += 1;
                keys.push(serde_json::json!({
                    "label": credential.label(),
                    "status": "cooling_down",
                    "cooldown_remaining_secs": (until - now).div_ceil(1000),
                    "successes": successes,
                    "failures": failures,
                }));
            } else {
                available += 1;
                keys.push(serde_json::json!({
                    "label": credential.label(),
                    "status": "available",
                    "successes": successes,
                    "failures": failures,
                }));
            }
        }

        let total = self.credentials.len();
        let status = if available == total {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        serde_json::json!({
            "status": status,
            "keys_total": total,
            "keys_available": available,
            "keys_cooling_down": cooling,
            "rotations": self.dispensed(),
            "keys": keys,
        })
    }

    fn now_millis(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
