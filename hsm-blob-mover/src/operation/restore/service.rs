/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::task::JoinSet;
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};
use tracing::Instrument;

use crate::error::{self, Error, ErrorKind};
use crate::operation::TransferContext;

/// Request/input type for our "fetch_range" service.
#[derive(Debug, Clone)]
pub(super) struct FetchRangeRequest {
    pub(super) ctx: TransferContext,
    pub(super) offset: u64,
    pub(super) length: u64,
    pub(super) file: Arc<Mutex<File>>,
}

/// handler (service fn) for a single range
async fn fetch_range_handler(request: FetchRangeRequest) -> Result<u64, Error> {
    let ctx = request.ctx;
    let (offset, length) = (request.offset, request.length);

    ctx.pace(length).await?;
    let data = ctx
        .cancellable(ctx.store().get_blob_range(ctx.location(), offset, length))
        .await?;
    if data.len() as u64 != length {
        return Err(error::backend_unavailable(format!(
            "{}: expected {length} bytes at offset {offset}, received {}",
            ctx.location().key(),
            data.len()
        )));
    }

    let file = request.file;
    tokio::task::spawn_blocking(move || write_at(&file, offset, &data)).await??;

    tracing::trace!("restored range at offset {offset}");
    ctx.report_progress(offset, length);
    Ok(length)
}

fn write_at(file: &Mutex<File>, offset: u64, data: &Bytes) -> Result<(), Error> {
    let mut file = file
        .lock()
        .map_err(|_| Error::new(ErrorKind::RuntimeError, "destination file lock poisoned"))?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(())
}

/// Create a new tower::Service for downloading individual ranges
pub(super) fn fetch_range_service(
    ctx: &TransferContext,
) -> impl Service<FetchRangeRequest, Response = u64, Error = Error, Future: Send> + Clone + Send
{
    let svc = service_fn(fetch_range_handler);
    ServiceBuilder::new()
        .concurrency_limit(ctx.handle.num_workers())
        .service(svc)
}

/// Download the operation's blob into `destination`, returning the bytes written.
///
/// The destination is created if needed and sized to the blob before any range is fetched.
/// Ranges of one block each are fetched by the configured number of workers and written at
/// their offsets. On failure or cancellation the remaining workers are aborted and the
/// destination is left partially written.
pub(super) async fn download_content(
    ctx: &TransferContext,
    destination: &Path,
) -> Result<u64, Error> {
    let properties = ctx
        .cancellable(ctx.store().get_properties(ctx.location()))
        .await?;
    let len = properties.len;

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(destination)
        .await?;
    file.set_len(len).await?;
    let file = Arc::new(Mutex::new(file.into_std().await));
    if len == 0 {
        return Ok(0);
    }

    let block_size = ctx.handle.block_size();
    let total_ranges = len.div_ceil(block_size);
    let next_range = Arc::new(AtomicU64::new(0));
    let svc = fetch_range_service(ctx);
    let n_workers = ctx.handle.num_workers().min(total_ranges as usize);

    let mut tasks = JoinSet::new();
    for i in 0..n_workers {
        let worker = fetch_ranges(
            ctx.clone(),
            svc.clone(),
            next_range.clone(),
            file.clone(),
            len,
        )
        .instrument(tracing::debug_span!("fetch-ranges", worker = i));
        tasks.spawn(worker);
    }

    let mut transferred = 0;
    while let Some(joined) = tasks.join_next().await {
        transferred += joined??;
    }

    tokio::task::spawn_blocking(move || {
        let file = file
            .lock()
            .map_err(|_| Error::new(ErrorKind::RuntimeError, "destination file lock poisoned"))?;
        file.sync_all().map_err(Error::from)
    })
    .await??;
    Ok(transferred)
}

/// Worker loop: claim the next range index and fetch it until none remain
async fn fetch_ranges(
    ctx: TransferContext,
    svc: impl Service<FetchRangeRequest, Response = u64, Error = Error, Future: Send>
        + Clone
        + Send
        + 'static,
    next_range: Arc<AtomicU64>,
    file: Arc<Mutex<File>>,
    len: u64,
) -> Result<u64, Error> {
    let block_size = ctx.handle.block_size();
    let mut fetched = 0;
    loop {
        if ctx.cancel_token().is_cancelled() {
            return Err(error::operation_cancelled());
        }
        let offset = next_range.fetch_add(1, Ordering::Relaxed) * block_size;
        if offset >= len {
            break;
        }
        let req = FetchRangeRequest {
            ctx: ctx.clone(),
            offset,
            length: cmp::min(block_size, len - offset),
            file: file.clone(),
        };
        fetched += svc.clone().oneshot(req).await?;
    }
    Ok(fetched)
}
