/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod input;
pub use input::{RestoreInput, RestoreInputBuilder};

/// Fluent builder for restore operations
pub mod builders;

mod service;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::error::Error;
use crate::operation::TransferContext;
use crate::path::normalize_key;

/// Output type for restoring an archived object
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RestoreOutput {
    /// Number of content bytes written to the destination
    pub bytes_transferred: u64,

    /// Key of the blob that was read
    pub object_key: String,

    /// File the content was written to
    pub destination: PathBuf,
}

impl RestoreOutput {
    /// Number of content bytes written to the destination
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Key of the blob that was read
    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    /// File the content was written to
    pub fn destination(&self) -> &std::path::Path {
        &self.destination
    }
}

/// Operation struct for restoring an archived object
#[derive(Clone, Default, Debug)]
pub(crate) struct Restore;

impl Restore {
    /// Execute a single `Restore` operation
    pub(crate) async fn orchestrate(
        handle: Arc<crate::client::Handle>,
        input: RestoreInput,
    ) -> Result<RestoreOutput, Error> {
        let location = handle.mapper.locate(input.object_name())?;
        let destination = match input.destination() {
            Some(path) => path.to_path_buf(),
            None => handle
                .config
                .mount_root()
                .join(normalize_key([input.object_name()])?),
        };
        let span = tracing::info_span!("restore", key = location.key());
        let ctx = TransferContext::new(
            handle,
            location,
            input.cancellation_token.clone(),
            input.progress_listener.clone(),
        );

        async move {
            tracing::info!("restoring {}", input.object_name());
            let result = service::download_content(&ctx, &destination).await;
            match result {
                Ok(bytes_transferred) => {
                    tracing::info!(bytes = bytes_transferred, "restored {}", input.object_name());
                    Ok(RestoreOutput {
                        bytes_transferred,
                        object_key: ctx.location().key().to_owned(),
                        destination,
                    })
                }
                Err(err) => {
                    tracing::error!("restoring {} failed: {err}", input.object_name());
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
