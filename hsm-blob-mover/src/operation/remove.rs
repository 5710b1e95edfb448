/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod input;
pub use input::{RemoveInput, RemoveInputBuilder};

/// Fluent builder for remove operations
pub mod builders;

use std::sync::Arc;

use tracing::Instrument;

use crate::error::Error;
use crate::operation::TransferContext;

/// Output type for removing an archived object
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RemoveOutput {
    /// Key of the deleted blob
    pub object_key: String,
}

impl RemoveOutput {
    /// Key of the deleted blob
    pub fn object_key(&self) -> &str {
        &self.object_key
    }
}

/// Operation struct for removing an archived object
#[derive(Clone, Default, Debug)]
pub(crate) struct Remove;

impl Remove {
    /// Delete the blob and its snapshots with a single request.
    ///
    /// There is no existence check and no retry; a missing blob surfaces as
    /// [`NotFound`](crate::error::ErrorKind::NotFound). Directory placeholders are left alone.
    pub(crate) async fn orchestrate(
        handle: Arc<crate::client::Handle>,
        input: RemoveInput,
    ) -> Result<RemoveOutput, Error> {
        let location = handle.mapper.locate(input.object_name())?;
        let span = tracing::info_span!("remove", key = location.key());
        let ctx = TransferContext::new(handle, location, input.cancellation_token.clone(), None);

        async move {
            tracing::info!("removing {}", input.object_name());
            let result = ctx
                .cancellable(ctx.store().delete_blob(ctx.location()))
                .await;
            match result {
                Ok(()) => Ok(RemoveOutput {
                    object_key: ctx.location().key().to_owned(),
                }),
                Err(err) => {
                    tracing::error!("removing {} failed: {err}", input.object_name());
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}
