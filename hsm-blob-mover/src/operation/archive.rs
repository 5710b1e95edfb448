/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod input;
pub use input::{ArchiveInput, ArchiveInputBuilder};

mod output;
pub use output::ArchiveOutput;

/// Fluent builder for archive operations
pub mod builders;

mod replicate;
mod service;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::error::{self, Error};
use crate::metadata::{FileMetadata, MetadataStrategy};
use crate::operation::TransferContext;
use crate::path::normalize_key;

/// Operation struct for archiving a single file
#[derive(Clone, Default, Debug)]
pub(crate) struct Archive;

impl Archive {
    /// Execute a single `Archive` operation
    pub(crate) async fn orchestrate(
        handle: Arc<crate::client::Handle>,
        input: ArchiveInput,
    ) -> Result<ArchiveOutput, Error> {
        let location = handle.mapper.locate(input.object_name())?;
        let span = tracing::info_span!("archive", key = location.key());
        let ctx = TransferContext::new(
            handle,
            location,
            input.cancellation_token.clone(),
            input.progress_listener.clone(),
        );

        async move {
            tracing::info!("archiving {}", input.object_name());
            let result = archive(&ctx, &input).await;
            match &result {
                Ok(output) => tracing::info!(
                    bytes = output.bytes_transferred(),
                    placeholders = output.placeholders().len(),
                    "archived {}",
                    input.object_name()
                ),
                Err(err) => tracing::error!("archiving {} failed: {err}", input.object_name()),
            }
            result
        }
        .instrument(span)
        .await
    }
}

async fn archive(ctx: &TransferContext, input: &ArchiveInput) -> Result<ArchiveOutput, Error> {
    if ctx.cancel_token().is_cancelled() {
        return Err(error::operation_cancelled());
    }

    // 1. parents first; any failure here aborts before content is read
    let placeholders = replicate::replicate_ancestors(ctx, input.object_name()).await?;

    // 2. stat the file and settle how its permissions travel
    let source = source_path(ctx, input)?;
    let meta = FileMetadata::from_path(&source).await?;
    if meta.is_dir() {
        return Err(error::invalid_input(format!(
            "{} is a directory",
            source.display()
        )));
    }
    let metadata = meta.to_generic();
    let access_control = ctx
        .cancellable(MetadataStrategy::resolve(
            ctx.handle.config.namespace_mode(),
            &meta,
            ctx.store(),
            ctx.location(),
        ))
        .await?
        .access_control()
        .cloned();

    // 3. content
    let bytes_transferred =
        service::upload_content(ctx, &source, meta.len(), &metadata).await?;

    // 4. best effort: content is already committed
    let mut acl_degradation = None;
    if let Some(acl) = access_control {
        let applied = ctx
            .cancellable(ctx.store().set_access_control(ctx.location(), &acl))
            .await;
        if let Err(err) = applied {
            tracing::warn!("archived content but failed to set access control: {err}");
            acl_degradation = Some(err);
        }
    }

    Ok(ArchiveOutput {
        bytes_transferred,
        object_key: ctx.location().key().to_owned(),
        placeholders,
        acl_degradation,
    })
}

fn source_path(ctx: &TransferContext, input: &ArchiveInput) -> Result<PathBuf, Error> {
    match input.source_path() {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let relative = normalize_key([input.object_name()])?;
            Ok(ctx.handle.config.mount_root().join(relative))
        }
    }
}
