/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};
use tracing::Instrument;

use crate::error::{self, Error, ErrorKind};
use crate::io::part_reader::{Builder as PartReaderBuilder, PartData, PartReader};
use crate::metadata::Metadata;
use crate::operation::TransferContext;
use crate::store::BlockId;

/// Request/input type for our "stage_block" service.
#[derive(Debug, Clone)]
pub(super) struct StageBlockRequest {
    pub(super) ctx: TransferContext,
    pub(super) part_data: PartData,
}

/// handler (service fn) for a single block
async fn stage_block_handler(request: StageBlockRequest) -> Result<u64, Error> {
    let ctx = request.ctx;
    let part_data = request.part_data;
    let len = part_data.data.len() as u64;
    let block_id = BlockId::for_index(part_data.part_number - 1);

    ctx.pace(len).await?;
    ctx.cancellable(
        ctx.store()
            .stage_block(ctx.location(), &block_id, part_data.data),
    )
    .await?;

    tracing::trace!("staged block number {}", part_data.part_number);
    ctx.report_progress(part_data.offset, len);
    Ok(len)
}

/// Create a new tower::Service for staging individual blocks
pub(super) fn stage_block_service(
    ctx: &TransferContext,
) -> impl Service<StageBlockRequest, Response = u64, Error = Error, Future: Send> + Clone + Send
{
    let svc = service_fn(stage_block_handler);
    ServiceBuilder::new()
        .concurrency_limit(ctx.handle.num_workers())
        .service(svc)
}

/// Upload `len` bytes of `source` to the operation's blob with `metadata` attached.
///
/// Content that fits in one block is sent with a single put. Anything larger is staged block by
/// block across the configured number of workers and committed once every block is staged. If
/// any block fails or the operation is cancelled the remaining workers are aborted and the
/// commit is never issued, so no partial content becomes visible.
pub(super) async fn upload_content(
    ctx: &TransferContext,
    source: &Path,
    len: u64,
    metadata: &Metadata,
) -> Result<u64, Error> {
    let block_size = ctx.handle.block_size();
    let part_reader = PartReaderBuilder::new()
        .path(source)
        .length(len)
        .part_size(block_size)
        .build()?;

    if len <= block_size {
        let data = match part_reader.next_part().await? {
            Some(part_data) => part_data.data,
            None => bytes::Bytes::new(),
        };
        ctx.pace(len).await?;
        ctx.cancellable(ctx.store().put_blob(ctx.location(), data, metadata))
            .await?;
        ctx.report_progress(0, len);
        return Ok(len);
    }

    let total_blocks = PartReader::total_parts(len, block_size);
    let part_reader = Arc::new(part_reader);
    let svc = stage_block_service(ctx);
    let n_workers = ctx.handle.num_workers().min(total_blocks as usize);

    let mut tasks = JoinSet::new();
    for i in 0..n_workers {
        let worker = read_body(part_reader.clone(), ctx.clone(), svc.clone())
            .instrument(tracing::debug_span!("stage-blocks", worker = i));
        tasks.spawn(worker);
    }
    tracing::trace!("work distributed for staging {total_blocks} blocks");

    let mut transferred = 0;
    while let Some(joined) = tasks.join_next().await {
        // dropping the JoinSet on early return aborts the remaining workers
        transferred += joined??;
    }
    if transferred != len {
        return Err(Error::new(
            ErrorKind::RuntimeError,
            format!("staged {transferred} bytes, expected {len}"),
        ));
    }

    let block_ids = (0..total_blocks).map(BlockId::for_index).collect::<Vec<_>>();
    ctx.cancellable(
        ctx.store()
            .commit_block_list(ctx.location(), &block_ids, metadata),
    )
    .await?;
    tracing::debug!(blocks = total_blocks, "committed block list");

    Ok(transferred)
}

/// Worker loop: claim the next block from the reader and stage it until none remain
async fn read_body(
    part_reader: Arc<PartReader>,
    ctx: TransferContext,
    svc: impl Service<StageBlockRequest, Response = u64, Error = Error, Future: Send>
        + Clone
        + Send
        + 'static,
) -> Result<u64, Error> {
    let mut staged = 0;
    loop {
        if ctx.cancel_token().is_cancelled() {
            return Err(error::operation_cancelled());
        }
        let part_data = match part_reader.next_part().await? {
            None => break,
            Some(part_data) => part_data,
        };
        let req = StageBlockRequest {
            ctx: ctx.clone(),
            part_data,
        };
        staged += svc.clone().oneshot(req).await?;
    }
    Ok(staged)
}
