/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! In-memory implementation of [`BlobStore`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::error::{self, Error};
use crate::metadata::{AccessControl, Metadata};
use crate::path::BlobLocation;
use crate::store::{BlobProperties, BlobStore, BlockId};

/// ACL assigned to new paths in a hierarchical container
const DEFAULT_OWNER: &str = "$superuser";
const DEFAULT_ACL: &str = "user::rw-,group::r--,other::---";

/// The store call recorded in the journal or targeted by an injected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    /// [`BlobStore::put_blob`]
    PutBlob,
    /// [`BlobStore::stage_block`]
    StageBlock,
    /// [`BlobStore::commit_block_list`]
    CommitBlockList,
    /// [`BlobStore::get_properties`]
    GetProperties,
    /// [`BlobStore::get_blob_range`]
    GetBlobRange,
    /// [`BlobStore::delete_blob`]
    DeleteBlob,
    /// [`BlobStore::get_access_control`]
    GetAccessControl,
    /// [`BlobStore::set_access_control`]
    SetAccessControl,
}

/// One call received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Which operation was invoked
    pub call: StoreCall,
    /// Blob key it addressed
    pub key: String,
}

/// A committed blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Content
    pub data: Bytes,
    /// User-defined metadata
    pub metadata: Metadata,
    /// Native ACL, hierarchical containers only
    pub access_control: Option<AccessControl>,
}

#[derive(Debug, Default)]
struct State {
    blobs: HashMap<String, StoredBlob>,
    snapshots: HashMap<String, Vec<StoredBlob>>,
    // key -> block id -> content
    staged: HashMap<String, HashMap<BlockId, Bytes>>,
    journal: Vec<JournalEntry>,
    // None matches every key
    failures: Vec<(StoreCall, Option<String>)>,
}

/// A [`BlobStore`] held entirely in memory.
///
/// Models a flat or hierarchical container, keeps a journal of every call it receives and
/// supports failure injection and artificial latency for exercising error and cancellation
/// paths.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    hierarchical: bool,
    latency: Option<Duration>,
    state: Mutex<State>,
}

impl InMemoryBlobStore {
    /// Create an empty flat container
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container with a hierarchical namespace
    pub fn hierarchical() -> Self {
        Self {
            hierarchical: true,
            ..Default::default()
        }
    }

    /// Delay every call by `latency` before it takes effect
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every `call` addressed to `key` with a backend error
    pub fn fail_on(&self, call: StoreCall, key: impl Into<String>) {
        self.lock().failures.push((call, Some(key.into())));
    }

    /// Fail every `call` regardless of key
    pub fn fail_all(&self, call: StoreCall) {
        self.lock().failures.push((call, None));
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Calls received so far, in arrival order
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock().journal.clone()
    }

    /// Keys of journal entries for `call`, in arrival order
    pub fn calls(&self, call: StoreCall) -> Vec<String> {
        self.lock()
            .journal
            .iter()
            .filter(|entry| entry.call == call)
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// The committed blob at `key`, if any
    pub fn blob(&self, key: &str) -> Option<StoredBlob> {
        self.lock().blobs.get(key).cloned()
    }

    /// Keys of all committed blobs, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.lock().blobs.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    /// Take a snapshot of the committed blob at `key`
    pub fn snapshot(&self, key: &str) -> Result<(), Error> {
        let mut state = self.lock();
        let blob = state
            .blobs
            .get(key)
            .cloned()
            .ok_or_else(|| blob_not_found(key))?;
        state.snapshots.entry(key.to_owned()).or_default().push(blob);
        Ok(())
    }

    /// Number of snapshots held for `key`
    pub fn snapshot_count(&self, key: &str) -> usize {
        self.lock().snapshots.get(key).map_or(0, Vec::len)
    }

    /// Number of uncommitted blocks staged for `key`
    pub fn staged_block_count(&self, key: &str) -> usize {
        self.lock().staged.get(key).map_or(0, HashMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a poisoned journal is still usable
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: StoreCall, key: &str) -> Result<(), Error> {
        self.lock().journal.push(JournalEntry {
            call,
            key: key.to_owned(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let injected = self
            .lock()
            .failures
            .iter()
            .any(|(c, k)| *c == call && k.as_deref().map_or(true, |k| k == key));
        if injected {
            return Err(error::backend_unavailable(format!(
                "{key}: injected {call:?} failure (HTTP 503 ServerBusy)"
            )));
        }
        Ok(())
    }

    fn require_namespace(&self, key: &str) -> Result<(), Error> {
        if self.hierarchical {
            Ok(())
        } else {
            Err(error::backend_unavailable(format!(
                "{key}: HTTP 409 HierarchicalNamespaceNotEnabled"
            )))
        }
    }

    fn commit(&self, key: &str, data: Bytes, metadata: &Metadata) {
        let mut state = self.lock();
        let access_control = match state.blobs.get(key) {
            Some(existing) => existing.access_control.clone(),
            None if self.hierarchical => Some(AccessControl::new(
                DEFAULT_OWNER,
                DEFAULT_OWNER,
                DEFAULT_ACL,
            )),
            None => None,
        };
        state.blobs.insert(
            key.to_owned(),
            StoredBlob {
                data,
                metadata: metadata.clone(),
                access_control,
            },
        );
    }
}

fn blob_not_found(key: &str) -> Error {
    error::not_found(format!("{key}: HTTP 404 BlobNotFound"))
}

fn path_not_found(key: &str) -> Error {
    error::not_found(format!("{key}: HTTP 404 PathNotFound"))
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_blob(
        &self,
        location: &BlobLocation,
        body: Bytes,
        metadata: &Metadata,
    ) -> Result<(), Error> {
        self.enter(StoreCall::PutBlob, location.key()).await?;
        self.commit(location.key(), body, metadata);
        Ok(())
    }

    async fn stage_block(
        &self,
        location: &BlobLocation,
        block_id: &BlockId,
        body: Bytes,
    ) -> Result<(), Error> {
        self.enter(StoreCall::StageBlock, location.key()).await?;
        self.lock()
            .staged
            .entry(location.key().to_owned())
            .or_default()
            .insert(block_id.clone(), body);
        Ok(())
    }

    async fn commit_block_list(
        &self,
        location: &BlobLocation,
        blocks: &[BlockId],
        metadata: &Metadata,
    ) -> Result<(), Error> {
        let key = location.key();
        self.enter(StoreCall::CommitBlockList, key).await?;

        let staged = self.lock().staged.remove(key).unwrap_or_default();
        let mut combined = BytesMut::new();
        for id in blocks {
            let block = staged.get(id).ok_or_else(|| {
                error::backend_unavailable(format!("{key}: HTTP 400 InvalidBlockList ({id})"))
            })?;
            combined.extend_from_slice(block);
        }
        self.commit(key, combined.freeze(), metadata);
        Ok(())
    }

    async fn get_properties(&self, location: &BlobLocation) -> Result<BlobProperties, Error> {
        let key = location.key();
        self.enter(StoreCall::GetProperties, key).await?;
        let state = self.lock();
        let blob = state.blobs.get(key).ok_or_else(|| blob_not_found(key))?;
        Ok(BlobProperties {
            len: blob.data.len() as u64,
            metadata: blob.metadata.clone(),
        })
    }

    async fn get_blob_range(
        &self,
        location: &BlobLocation,
        offset: u64,
        length: u64,
    ) -> Result<Bytes, Error> {
        let key = location.key();
        self.enter(StoreCall::GetBlobRange, key).await?;
        let state = self.lock();
        let data = &state.blobs.get(key).ok_or_else(|| blob_not_found(key))?.data;
        let len = data.len() as u64;
        if offset >= len {
            return Err(error::backend_unavailable(format!(
                "{key}: HTTP 416 InvalidRange"
            )));
        }
        let end = offset.saturating_add(length).min(len);
        Ok(data.slice(offset as usize..end as usize))
    }

    async fn delete_blob(&self, location: &BlobLocation) -> Result<(), Error> {
        let key = location.key();
        self.enter(StoreCall::DeleteBlob, key).await?;
        let mut state = self.lock();
        if state.blobs.remove(key).is_none() {
            return Err(blob_not_found(key));
        }
        state.snapshots.remove(key);
        Ok(())
    }

    async fn get_access_control(&self, location: &BlobLocation) -> Result<AccessControl, Error> {
        let key = location.key();
        self.enter(StoreCall::GetAccessControl, key).await?;
        self.require_namespace(key)?;
        let state = self.lock();
        let blob = state.blobs.get(key).ok_or_else(|| path_not_found(key))?;
        Ok(blob.access_control.clone().unwrap_or_default())
    }

    async fn set_access_control(
        &self,
        location: &BlobLocation,
        access_control: &AccessControl,
    ) -> Result<(), Error> {
        let key = location.key();
        self.enter(StoreCall::SetAccessControl, key).await?;
        self.require_namespace(key)?;
        let mut state = self.lock();
        let blob = state
            .blobs
            .get_mut(key)
            .ok_or_else(|| path_not_found(key))?;
        blob.access_control = Some(access_control.clone());
        Ok(())
    }
}
