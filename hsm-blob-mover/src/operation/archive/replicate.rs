/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;

use crate::error::Error;
use crate::metadata::{FileMetadata, MetadataStrategy, IS_FOLDER_KEY};
use crate::operation::TransferContext;
use crate::path;

/// Write a placeholder blob for every ancestor directory of `object_name`, shallowest first.
///
/// Returns the keys written. Stops at the first failure; placeholders already written stay.
pub(super) async fn replicate_ancestors(
    ctx: &TransferContext,
    object_name: &str,
) -> Result<Vec<String>, Error> {
    let mode = ctx.handle.config.namespace_mode();
    let mount_root = ctx.handle.config.mount_root();
    let mut written = Vec::new();

    for dir in path::ancestors(object_name)? {
        let location = ctx.handle.mapper.locate(&dir)?;
        let meta = FileMetadata::from_path(&mount_root.join(&dir)).await?;
        let strategy = ctx
            .cancellable(MetadataStrategy::resolve(
                mode,
                &meta,
                ctx.store(),
                &location,
            ))
            .await?;

        let mut metadata = strategy.generic_metadata();
        metadata.insert(IS_FOLDER_KEY.to_owned(), "true".to_owned());
        ctx.cancellable(ctx.store().put_blob(&location, Bytes::new(), &metadata))
            .await?;

        if let Some(acl) = strategy.access_control() {
            ctx.cancellable(ctx.store().set_access_control(&location, acl))
                .await?;
        }

        tracing::debug!(placeholder = location.key(), "replicated directory");
        written.push(location.key().to_owned());
    }
    Ok(written)
}
