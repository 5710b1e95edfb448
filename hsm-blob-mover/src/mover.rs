/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::types::ProgressListener;
use crate::Client;

/// Coordinator-facing registration and dispatch
pub mod plugin;

/// Filesystem name reported by [`NoopMover`]
pub const NOOP_FS_NAME: &str = "noop";

/// The kind of action a coordinator asks a mover to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Copy a file into the archive
    Archive,
    /// Copy an archived file back into the filesystem
    Restore,
    /// Delete an archived copy
    Remove,
    /// Cancel another in-flight action
    Cancel,
}

/// Whether a mover has any action in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoverState {
    /// Registered, nothing in flight
    #[default]
    Idle,
    /// At least one archive, restore or remove is running
    Active,
}

/// One action dispatched by the coordinator
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Coordinator-assigned action ID, unique among in-flight actions
    pub id: u64,
    /// Archive backend the action is routed to
    pub archive_id: u32,
    /// What to do
    pub kind: ActionKind,
    /// File name relative to the mount root; empty for [`ActionKind::Cancel`]
    pub object_name: String,
    /// For [`ActionKind::Cancel`], the ID of the action to cancel
    pub target: Option<u64>,
}

impl ActionRequest {
    fn new(id: u64, archive_id: u32, kind: ActionKind, object_name: String) -> Self {
        Self {
            id,
            archive_id,
            kind,
            object_name,
            target: None,
        }
    }

    /// Archive `object_name`
    pub fn archive(id: u64, archive_id: u32, object_name: impl Into<String>) -> Self {
        Self::new(id, archive_id, ActionKind::Archive, object_name.into())
    }

    /// Restore `object_name`
    pub fn restore(id: u64, archive_id: u32, object_name: impl Into<String>) -> Self {
        Self::new(id, archive_id, ActionKind::Restore, object_name.into())
    }

    /// Remove the archived copy of `object_name`
    pub fn remove(id: u64, archive_id: u32, object_name: impl Into<String>) -> Self {
        Self::new(id, archive_id, ActionKind::Remove, object_name.into())
    }

    /// Cancel the in-flight action `target`
    pub fn cancel(id: u64, archive_id: u32, target: u64) -> Self {
        Self {
            target: Some(target),
            ..Self::new(id, archive_id, ActionKind::Cancel, String::new())
        }
    }
}

/// Per-action handles passed to a [`Mover`]
#[derive(Clone, Default)]
pub struct ActionContext {
    cancellation_token: CancellationToken,
    progress_listener: Option<Arc<dyn ProgressListener>>,
}

impl ActionContext {
    /// Create a context cancelled by `token`
    pub fn new(token: CancellationToken) -> Self {
        Self {
            cancellation_token: token,
            progress_listener: None,
        }
    }

    /// Attach a progress listener
    pub fn with_progress(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.progress_listener = Some(listener);
        self
    }

    /// Fires when the action should stop
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Where to report byte progress, if anywhere
    pub fn progress_listener(&self) -> Option<&Arc<dyn ProgressListener>> {
        self.progress_listener.as_ref()
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("cancelled", &self.cancellation_token.is_cancelled())
            .field("progress_listener", &self.progress_listener.is_some())
            .finish()
    }
}

/// A backend that executes actions routed to it by archive ID.
///
/// The identity pair is fixed for the lifetime of the mover.
#[async_trait]
pub trait Mover: Send + Sync + fmt::Debug {
    /// Name of the filesystem this mover serves
    fn fs_name(&self) -> &str;

    /// Archive backend ID the coordinator routes on
    fn archive_id(&self) -> u32;

    /// Archive `object_name`, returning the bytes transferred
    async fn archive(&self, object_name: &str, ctx: &ActionContext) -> Result<u64, Error>;

    /// Restore `object_name`, returning the bytes transferred
    async fn restore(&self, object_name: &str, ctx: &ActionContext) -> Result<u64, Error>;

    /// Remove the archived copy of `object_name`
    async fn remove(&self, object_name: &str, ctx: &ActionContext) -> Result<(), Error>;
}

/// Mover backed by a blob container
#[derive(Debug, Clone)]
pub struct BlobMover {
    fs_name: String,
    archive_id: u32,
    client: Client,
}

impl BlobMover {
    /// Create a mover serving `fs_name` under `archive_id`
    pub fn new(fs_name: impl Into<String>, archive_id: u32, client: Client) -> Self {
        Self {
            fs_name: fs_name.into(),
            archive_id,
            client,
        }
    }

    /// The client used for transfers
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Mover for BlobMover {
    fn fs_name(&self) -> &str {
        &self.fs_name
    }

    fn archive_id(&self) -> u32 {
        self.archive_id
    }

    async fn archive(&self, object_name: &str, ctx: &ActionContext) -> Result<u64, Error> {
        let mut builder = self
            .client
            .archive()
            .object_name(object_name)
            .cancellation_token(ctx.cancellation_token().clone());
        if let Some(listener) = ctx.progress_listener() {
            builder = builder.progress_listener(listener.clone());
        }
        let output = builder.send().await?;
        Ok(output.bytes_transferred())
    }

    async fn restore(&self, object_name: &str, ctx: &ActionContext) -> Result<u64, Error> {
        let mut builder = self
            .client
            .restore()
            .object_name(object_name)
            .cancellation_token(ctx.cancellation_token().clone());
        if let Some(listener) = ctx.progress_listener() {
            builder = builder.progress_listener(listener.clone());
        }
        let output = builder.send().await?;
        Ok(output.bytes_transferred())
    }

    async fn remove(&self, object_name: &str, ctx: &ActionContext) -> Result<(), Error> {
        self.client
            .remove()
            .object_name(object_name)
            .cancellation_token(ctx.cancellation_token().clone())
            .send()
            .await?;
        Ok(())
    }
}

/// Mover that accepts every action and moves nothing
#[derive(Debug, Clone)]
pub struct NoopMover {
    archive_id: u32,
}

impl NoopMover {
    /// Create a no-op mover registered under `archive_id`
    pub fn new(archive_id: u32) -> Self {
        Self { archive_id }
    }
}

#[async_trait]
impl Mover for NoopMover {
    fn fs_name(&self) -> &str {
        NOOP_FS_NAME
    }

    fn archive_id(&self) -> u32 {
        self.archive_id
    }

    async fn archive(&self, object_name: &str, _ctx: &ActionContext) -> Result<u64, Error> {
        tracing::debug!("noop archive of {object_name}");
        Ok(0)
    }

    async fn restore(&self, object_name: &str, _ctx: &ActionContext) -> Result<u64, Error> {
        tracing::debug!("noop restore of {object_name}");
        Ok(0)
    }

    async fn remove(&self, object_name: &str, _ctx: &ActionContext) -> Result<(), Error> {
        tracing::debug!("noop remove of {object_name}");
        Ok(())
    }
}
