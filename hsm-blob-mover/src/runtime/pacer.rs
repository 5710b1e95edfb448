/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};
use crate::metrics::Throughput;

/// Burst window: a full bucket holds this much time worth of bytes
const BURST_WINDOW: Duration = Duration::from_secs(1);

/// Rate limiter bounding the aggregate throughput of every transfer that shares it
///
/// The pacer is a token bucket measured in bytes. Waiters are served in the order they
/// arrived (the bucket sits behind a fair [`tokio::sync::Mutex`]). A request larger than the
/// burst is admitted once the bucket is full and leaves it in debt, so the long-run rate holds.
///
/// Pacer is internally reference-counted and can be freely cloned. Clones share one bucket.
#[derive(Debug, Clone)]
pub struct Pacer {
    bucket: Option<Arc<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    bytes_per_sec: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, bytes_per_sec: f64, capacity: f64) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * bytes_per_sec).min(capacity);
        self.last_refill = now;
    }
}

impl Pacer {
    /// Create a pacer limiting throughput to `rate`. A zero rate means unlimited.
    pub fn new(rate: Throughput) -> Self {
        let bytes_per_sec = rate.as_bytes_per_sec();
        if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
            return Self::unlimited();
        }
        let capacity = (bytes_per_sec * BURST_WINDOW.as_secs_f64()).max(1.0);
        Self {
            bucket: Some(Arc::new(Bucket {
                bytes_per_sec,
                capacity,
                state: Mutex::new(BucketState {
                    tokens: capacity,
                    last_refill: Instant::now(),
                }),
            })),
        }
    }

    /// A pacer that never waits
    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    /// Returns true if this pacer never waits
    pub fn is_unlimited(&self) -> bool {
        self.bucket.is_none()
    }

    /// The configured rate, if any
    pub fn rate(&self) -> Option<Throughput> {
        self.bucket
            .as_ref()
            .map(|b| Throughput::new_bytes_per_sec(b.bytes_per_sec as u64))
    }

    /// Wait until `bytes` may be transferred.
    ///
    /// Returns an [`OperationCancelled`](crate::error::ErrorKind::OperationCancelled) error if
    /// `cancel` fires before the bytes are admitted. Nothing is charged in that case.
    pub async fn acquire(&self, bytes: u64, cancel: &CancellationToken) -> Result<(), Error> {
        if cancel.is_cancelled() {
            return Err(error::operation_cancelled());
        }
        let bucket = match &self.bucket {
            Some(bucket) => bucket,
            None => return Ok(()),
        };

        let mut state = tokio::select! {
            guard = bucket.state.lock() => guard,
            _ = cancel.cancelled() => return Err(error::operation_cancelled()),
        };

        let requested = bytes as f64;
        let needed = requested.min(bucket.capacity);
        loop {
            state.refill(bucket.bytes_per_sec, bucket.capacity);
            if state.tokens >= needed - f64::EPSILON {
                state.tokens -= requested;
                return Ok(());
            }

            let deficit = needed - state.tokens;
            let wait = Duration::from_secs_f64(deficit / bucket.bytes_per_sec);
            tracing::trace!(bytes, wait_ms = wait.as_millis() as u64, "pacer waiting");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = cancel.cancelled() => return Err(error::operation_cancelled()),
            }
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::unlimited()
    }
}
