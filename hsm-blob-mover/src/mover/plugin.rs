/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{self, Error};
use crate::mover::{ActionContext, ActionKind, ActionRequest, Mover, MoverState};
use crate::types::ProgressListener;

/// Result or progress of a dispatched action, delivered on the plugin's report channel
#[derive(Debug)]
pub enum ActionReport {
    /// Bytes `[offset, offset + length)` of action `id` have been transferred
    Progress {
        /// Action ID
        id: u64,
        /// Start of the transferred range
        offset: u64,
        /// Length of the transferred range
        length: u64,
    },
    /// Action `id` finished successfully
    Completed {
        /// Action ID
        id: u64,
        /// Bytes transferred, zero for remove and cancel
        bytes: u64,
    },
    /// Action `id` failed
    Failed {
        /// Action ID
        id: u64,
        /// Why
        error: Error,
    },
}

impl ActionReport {
    /// The action this report belongs to
    pub fn id(&self) -> u64 {
        match self {
            ActionReport::Progress { id, .. }
            | ActionReport::Completed { id, .. }
            | ActionReport::Failed { id, .. } => *id,
        }
    }

    /// Returns true for [`ActionReport::Completed`] and [`ActionReport::Failed`]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionReport::Progress { .. })
    }
}

#[derive(Debug)]
struct InFlight {
    archive_id: u32,
    cancel: CancellationToken,
}

/// Forwards transfer progress of one action onto the report channel
#[derive(Debug)]
struct ChannelProgress {
    id: u64,
    reports: async_channel::Sender<ActionReport>,
}

impl ProgressListener for ChannelProgress {
    fn on_progress(&self, offset: u64, length: u64) {
        // unbounded channel; only fails once closed
        let _ = self.reports.try_send(ActionReport::Progress {
            id: self.id,
            offset,
            length,
        });
    }
}

/// Registers movers with a coordinator agent and runs the actions it dispatches.
///
/// Each archive, restore or remove runs on its own task. Terminal results and progress are
/// sent on the receiver returned by [`Plugin::new`].
#[derive(Debug)]
pub struct Plugin {
    agent_address: String,
    movers: HashMap<u32, Arc<dyn Mover>>,
    inflight: Arc<Mutex<HashMap<u64, InFlight>>>,
    tasks: Mutex<JoinSet<()>>,
    reports: async_channel::Sender<ActionReport>,
    shutdown: CancellationToken,
}

impl Plugin {
    /// Create a plugin for the agent at `agent_address`
    pub fn new(
        agent_address: impl Into<String>,
    ) -> Result<(Plugin, async_channel::Receiver<ActionReport>), Error> {
        let agent_address = agent_address.into();
        if agent_address.trim().is_empty() {
            return Err(error::invalid_input("agent address is required"));
        }
        let (tx, rx) = async_channel::unbounded();
        let plugin = Plugin {
            agent_address,
            movers: HashMap::new(),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            tasks: Mutex::new(JoinSet::new()),
            reports: tx,
            shutdown: CancellationToken::new(),
        };
        Ok((plugin, rx))
    }

    /// Address of the coordinator agent
    pub fn agent_address(&self) -> &str {
        &self.agent_address
    }

    /// Register a mover under its archive ID. Each archive ID may be registered once.
    pub fn add_mover(&mut self, mover: Arc<dyn Mover>) -> Result<(), Error> {
        let archive_id = mover.archive_id();
        if self.movers.contains_key(&archive_id) {
            return Err(error::invalid_input(format!(
                "a mover is already registered for archive id {archive_id}"
            )));
        }
        tracing::info!(
            archive_id,
            fs_name = mover.fs_name(),
            agent = %self.agent_address,
            "registered mover"
        );
        self.movers.insert(archive_id, mover);
        Ok(())
    }

    /// Whether the mover registered under `archive_id` has actions in flight
    pub fn state(&self, archive_id: u32) -> Option<MoverState> {
        if !self.movers.contains_key(&archive_id) {
            return None;
        }
        let active = lock(&self.inflight)
            .values()
            .any(|action| action.archive_id == archive_id);
        Some(if active {
            MoverState::Active
        } else {
            MoverState::Idle
        })
    }

    /// Start `request` on the mover registered for its archive ID.
    ///
    /// Returns once the action is started; its outcome arrives on the report channel. A
    /// cancel request is handled inline and reported as completed once the target's token has
    /// fired, or as failed if the target is not in flight.
    pub fn dispatch(&self, request: ActionRequest) -> Result<(), Error> {
        if self.shutdown.is_cancelled() {
            return Err(error::invalid_input("plugin is stopped"));
        }
        let mover = self
            .movers
            .get(&request.archive_id)
            .cloned()
            .ok_or_else(|| {
                error::invalid_input(format!(
                    "no mover registered for archive id {}",
                    request.archive_id
                ))
            })?;

        if request.kind == ActionKind::Cancel {
            self.cancel(&request);
            return Ok(());
        }

        let cancel = self.shutdown.child_token();
        {
            let mut inflight = lock(&self.inflight);
            if inflight.contains_key(&request.id) {
                return Err(error::invalid_input(format!(
                    "action {} is already in flight",
                    request.id
                )));
            }
            inflight.insert(
                request.id,
                InFlight {
                    archive_id: request.archive_id,
                    cancel: cancel.clone(),
                },
            );
        }

        let ctx = ActionContext::new(cancel).with_progress(Arc::new(ChannelProgress {
            id: request.id,
            reports: self.reports.clone(),
        }));
        let span = tracing::info_span!(
            "mover-action",
            id = request.id,
            archive_id = request.archive_id,
            kind = ?request.kind,
            object = %request.object_name,
        );
        let task = run_action(
            mover,
            request,
            ctx,
            self.inflight.clone(),
            self.reports.clone(),
        )
        .instrument(span);
        let mut tasks = lock(&self.tasks);
        reap_finished(&mut tasks);
        tasks.spawn(task);
        Ok(())
    }

    fn cancel(&self, request: &ActionRequest) {
        let target = request.target.and_then(|target| {
            lock(&self.inflight)
                .get(&target)
                .filter(|action| action.archive_id == request.archive_id)
                .map(|action| action.cancel.clone())
        });
        let report = match target {
            Some(token) => {
                token.cancel();
                tracing::info!(cancelled = ?request.target, "cancelled action");
                ActionReport::Completed {
                    id: request.id,
                    bytes: 0,
                }
            }
            None => ActionReport::Failed {
                id: request.id,
                error: error::not_found(format!(
                    "action {:?} is not in flight",
                    request.target
                )),
            },
        };
        let _ = self.reports.try_send(report);
    }

    /// Cancel every in-flight action, wait for them to finish and close the report channel
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let mut tasks = std::mem::take(&mut *lock(&self.tasks));
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!("mover action task failed: {err}");
            }
        }
        self.reports.close();
        tracing::info!(agent = %self.agent_address, "plugin stopped");
    }
}

async fn run_action(
    mover: Arc<dyn Mover>,
    request: ActionRequest,
    ctx: ActionContext,
    inflight: Arc<Mutex<HashMap<u64, InFlight>>>,
    reports: async_channel::Sender<ActionReport>,
) {
    let name = request.object_name.as_str();
    let result = match request.kind {
        ActionKind::Archive => mover.archive(name, &ctx).await,
        ActionKind::Restore => mover.restore(name, &ctx).await,
        ActionKind::Remove => mover.remove(name, &ctx).await.map(|_| 0),
        ActionKind::Cancel => Ok(0),
    };
    lock(&inflight).remove(&request.id);

    let report = match result {
        Ok(bytes) => ActionReport::Completed {
            id: request.id,
            bytes,
        },
        Err(error) => {
            tracing::error!("{:?} of {name} failed: {error}", request.kind);
            ActionReport::Failed {
                id: request.id,
                error,
            }
        }
    };
    if reports.send(report).await.is_err() {
        tracing::debug!("report channel closed, dropping report");
    }
}

/// Drop already finished action tasks from `tasks`
fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(err) = joined {
            tracing::error!("mover action task failed: {err}");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{lock, ActionReport, Plugin};
    use crate::error::{self, Error, ErrorKind};
    use crate::mover::{ActionContext, ActionRequest, Mover, MoverState, NoopMover};

    /// Archives that only finish once cancelled
    #[derive(Debug)]
    struct WaitingMover {
        archive_id: u32,
    }

    #[async_trait]
    impl Mover for WaitingMover {
        fn fs_name(&self) -> &str {
            "waiting"
        }

        fn archive_id(&self) -> u32 {
            self.archive_id
        }

        async fn archive(&self, _object_name: &str, ctx: &ActionContext) -> Result<u64, Error> {
            ctx.cancellation_token().cancelled().await;
            Err(error::operation_cancelled())
        }

        async fn restore(&self, _object_name: &str, _ctx: &ActionContext) -> Result<u64, Error> {
            Ok(0)
        }

        async fn remove(&self, _object_name: &str, _ctx: &ActionContext) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn test_duplicate_archive_id_rejected() {
        let (mut plugin, _rx) = Plugin::new("localhost:4242").unwrap();
        plugin.add_mover(Arc::new(NoopMover::new(1))).unwrap();
        let err = plugin.add_mover(Arc::new(NoopMover::new(1))).unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
        plugin.add_mover(Arc::new(NoopMover::new(2))).unwrap();
    }

    #[test]
    fn test_empty_agent_address_rejected() {
        let err = Plugin::new(" ").unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }

    #[tokio::test]
    async fn test_noop_actions_complete() {
        let (mut plugin, rx) = Plugin::new("localhost:4242").unwrap();
        plugin.add_mover(Arc::new(NoopMover::new(7))).unwrap();
        assert_eq!(Some(MoverState::Idle), plugin.state(7));
        assert_eq!(None, plugin.state(8));

        plugin.dispatch(ActionRequest::archive(1, 7, "a/b")).unwrap();
        plugin.dispatch(ActionRequest::remove(2, 7, "a/b")).unwrap();

        let mut completed = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                ActionReport::Completed { id, bytes } => completed.push((id, bytes)),
                other => panic!("unexpected report {other:?}"),
            }
        }
        completed.sort();
        assert_eq!(vec![(1, 0), (2, 0)], completed);

        plugin.stop().await;
        assert!(rx.recv().await.is_err());
        assert_eq!(Some(MoverState::Idle), plugin.state(7));
    }

    #[tokio::test]
    async fn test_unroutable_and_unknown_cancel() {
        let (mut plugin, rx) = Plugin::new("localhost:4242").unwrap();
        plugin.add_mover(Arc::new(NoopMover::new(1))).unwrap();

        let err = plugin
            .dispatch(ActionRequest::archive(1, 9, "x"))
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());

        plugin.dispatch(ActionRequest::cancel(5, 1, 42)).unwrap();
        match rx.recv().await.unwrap() {
            ActionReport::Failed { id, error } => {
                assert_eq!(5, id);
                assert!(error.is_not_found());
            }
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_finished_tasks_are_not_retained() {
        let (mut plugin, rx) = Plugin::new("localhost:4242").unwrap();
        plugin.add_mover(Arc::new(NoopMover::new(7))).unwrap();

        for id in 0..100 {
            plugin
                .dispatch(ActionRequest::archive(id, 7, "a/b"))
                .unwrap();
        }
        for _ in 0..100 {
            assert!(rx.recv().await.unwrap().is_terminal());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        plugin
            .dispatch(ActionRequest::archive(100, 7, "a/b"))
            .unwrap();
        assert_eq!(1, lock(&plugin.tasks).len());

        assert!(rx.recv().await.unwrap().is_terminal());
        plugin.stop().await;
    }

    #[tokio::test]
    async fn test_cancel_requires_matching_archive_id() {
        let (mut plugin, rx) = Plugin::new("localhost:4242").unwrap();
        plugin
            .add_mover(Arc::new(WaitingMover { archive_id: 1 }))
            .unwrap();
        plugin
            .add_mover(Arc::new(WaitingMover { archive_id: 2 }))
            .unwrap();

        plugin.dispatch(ActionRequest::archive(10, 1, "a/b")).unwrap();
        assert_eq!(Some(MoverState::Active), plugin.state(1));

        plugin.dispatch(ActionRequest::cancel(11, 2, 10)).unwrap();
        match rx.recv().await.unwrap() {
            ActionReport::Failed { id, error } => {
                assert_eq!(11, id);
                assert!(error.is_not_found());
            }
            other => panic!("unexpected report {other:?}"),
        }
        assert_eq!(Some(MoverState::Active), plugin.state(1));

        plugin.dispatch(ActionRequest::cancel(12, 1, 10)).unwrap();
        let mut reports = Vec::new();
        for _ in 0..2 {
            reports.push(rx.recv().await.unwrap());
        }
        assert!(reports
            .iter()
            .any(|report| matches!(report, ActionReport::Completed { id: 12, bytes: 0 })));
        assert!(reports
            .iter()
            .any(|report| matches!(report, ActionReport::Failed { id: 10, .. })));
        assert_eq!(Some(MoverState::Idle), plugin.state(1));

        plugin.stop().await;
    }
}
