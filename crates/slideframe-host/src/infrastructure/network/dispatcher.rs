//! Retrying settings dispatcher.
//!
//! [`RetryingDispatcher`] implements the application's
//! [`SettingsDispatcher`] port on top of an [`HttpTransport`].  Each request
//! is attempted up to [`RetryPolicy::max_attempts`] times, with a fixed
//! [`RetryPolicy::delay`] between attempts.
//!
//! # Which failures are retried?
//!
//! | Outcome                                     | Class     |
//! |---------------------------------------------|-----------|
//! | 2xx                                         | delivered |
//! | connection error, timeout, other I/O error  | transient |
//! | 5xx, 408 Request Timeout, 429 Too Many Requests | transient |
//! | any other status (4xx, 1xx, 3xx)            | permanent |
//! | request could not be built                  | permanent |
//!
//! Transient failures are retried until the attempt budget runs out; a
//! permanent failure ends the delivery immediately.
//!
//! # Shutdown
//!
//! The dispatcher shares the host's `running` flag.  It is checked before
//! every attempt, including after a retry delay, so once shutdown begins no
//! new attempt starts and the delivery ends with
//! [`DispatchError::ShuttingDown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slideframe_core::DeviceAddress;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::device_cache::{DispatchError, SettingsDispatcher};

/// Path a frame exposes for pushed settings.
pub const SYNC_PATH: &str = "/api/sync";
/// Path a frame exposes for liveness probes.
pub const STATUS_PATH: &str = "/api/status";

// ── Policy ────────────────────────────────────────────────────────────────────

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.  Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(250),
        }
    }
}

// ── Transport port ────────────────────────────────────────────────────────────

/// One outbound GET request to a remote frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub device: DeviceAddress,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
}

impl DispatchRequest {
    /// `GET /api/sync?<field>=<value>`.
    pub fn push_setting(device: &DeviceAddress, field: &str, value: &str) -> Self {
        Self {
            device: device.clone(),
            path: SYNC_PATH,
            query: vec![(field.to_string(), value.to_string())],
        }
    }

    /// `GET /api/status`.
    pub fn probe(device: &DeviceAddress) -> Self {
        Self {
            device: device.clone(),
            path: STATUS_PATH,
            query: Vec::new(),
        }
    }
}

/// Error from a single transport attempt (no response status available).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends one HTTP request and reports the response status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &DispatchRequest) -> Result<u16, TransportError>;
}

// ── Classification ────────────────────────────────────────────────────────────

/// Classification of one attempt's result.
#[derive(Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Delivered,
    /// Worth another attempt; carries a description for logs.
    Transient(String),
    Permanent(DispatchError),
}

/// Sorts one attempt's result into delivered, transient or permanent.
pub fn classify(result: &Result<u16, TransportError>) -> AttemptOutcome {
    match result {
        Ok(status) if (200..300).contains(status) => AttemptOutcome::Delivered,
        Ok(status @ (408 | 429 | 500..=599)) => AttemptOutcome::Transient(format!("HTTP {status}")),
        Ok(status) => AttemptOutcome::Permanent(DispatchError::Rejected { status: *status }),
        Err(TransportError::InvalidRequest(reason)) => {
            AttemptOutcome::Permanent(DispatchError::InvalidRequest(reason.clone()))
        }
        Err(e) => AttemptOutcome::Transient(e.to_string()),
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// [`SettingsDispatcher`] with bounded retries over an [`HttpTransport`].
pub struct RetryingDispatcher<T> {
    transport: T,
    policy: RetryPolicy,
    running: Arc<AtomicBool>,
}

impl<T: HttpTransport> RetryingDispatcher<T> {
    pub fn new(transport: T, policy: RetryPolicy, running: Arc<AtomicBool>) -> Self {
        Self {
            transport,
            policy,
            running,
        }
    }

    /// Sends `request`, retrying transient failures per the policy.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Rejected`] / [`DispatchError::InvalidRequest`] on a
    ///   permanent failure (after exactly one attempt).
    /// - [`DispatchError::RetriesExhausted`] when every attempt was transient.
    /// - [`DispatchError::ShuttingDown`] when the running flag was cleared
    ///   before an attempt could start.
    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if !self.running.load(Ordering::SeqCst) {
                debug!("not contacting {}: shutting down", request.device);
                return Err(DispatchError::ShuttingDown);
            }

            match classify(&self.transport.send(request).await) {
                AttemptOutcome::Delivered => {
                    if attempt > 1 {
                        debug!("{}{} succeeded on attempt {attempt}", request.device, request.path);
                    }
                    return Ok(());
                }
                AttemptOutcome::Permanent(e) => {
                    warn!("{}{}: {e}; not retrying", request.device, request.path);
                    return Err(e);
                }
                AttemptOutcome::Transient(reason) => {
                    debug!(
                        "{}{} attempt {attempt}/{max_attempts} failed: {reason}",
                        request.device, request.path
                    );
                    last_error = reason;
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(DispatchError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

#[async_trait]
impl<T: HttpTransport> SettingsDispatcher for RetryingDispatcher<T> {
    async fn push_setting(
        &self,
        device: &DeviceAddress,
        field: &str,
        value: &str,
    ) -> Result<(), DispatchError> {
        self.dispatch(&DispatchRequest::push_setting(device, field, value))
            .await
    }

    async fn probe(&self, device: &DeviceAddress) -> Result<(), DispatchError> {
        self.dispatch(&DispatchRequest::probe(device)).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
