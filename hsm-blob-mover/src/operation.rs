/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};
use crate::path::BlobLocation;
use crate::store::BlobStore;
use crate::types::ProgressListener;

/// Types for archiving a single file
pub mod archive;

/// Types for removing an archived object
pub mod remove;

/// Types for restoring an archived object
pub mod restore;

/// Container for maintaining context required to carry out a single operation/transfer.
#[derive(Debug, Clone)]
pub(crate) struct TransferContext {
    pub(crate) handle: Arc<crate::client::Handle>,
    location: Arc<BlobLocation>,
    cancel: CancellationToken,
    progress: Option<Arc<dyn ProgressListener>>,
}

impl TransferContext {
    pub(crate) fn new(
        handle: Arc<crate::client::Handle>,
        location: BlobLocation,
        cancel: CancellationToken,
        progress: Option<Arc<dyn ProgressListener>>,
    ) -> Self {
        Self {
            handle,
            location: Arc::new(location),
            cancel,
            progress,
        }
    }

    /// The store to use for blob operations
    pub(crate) fn store(&self) -> &dyn BlobStore {
        self.handle.store()
    }

    /// Address of the blob this operation targets
    pub(crate) fn location(&self) -> &BlobLocation {
        &self.location
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for `bytes` of throughput budget
    pub(crate) async fn pace(&self, bytes: u64) -> Result<(), Error> {
        self.handle.pacer().acquire(bytes, &self.cancel).await
    }

    /// Run `fut` unless the operation is cancelled first; the future is dropped on cancellation
    pub(crate) async fn cancellable<T, F>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(error::operation_cancelled()),
            result = fut => result,
        }
    }

    pub(crate) fn report_progress(&self, offset: u64, length: u64) {
        if let Some(listener) = &self.progress {
            listener.on_progress(offset, length);
        }
    }
}
