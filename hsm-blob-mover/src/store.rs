/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

use crate::error::Error;
use crate::metadata::{AccessControl, Metadata};
use crate::path::BlobLocation;

/// Blob REST API over HTTPS
pub mod http;

/// In-process store for tests and dry runs
pub mod in_memory;

/// Identifier of one staged block.
///
/// All block IDs of a blob must have the same length, so the ID is the base64 encoding of a
/// fixed-width rendering of the block index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId(String);

impl BlockId {
    /// Block ID for the zero-based block `index`
    pub fn for_index(index: u64) -> Self {
        BlockId(BASE64.encode(format!("block-{index:010}")))
    }

    /// The encoded identifier as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Properties of a committed blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobProperties {
    /// Content length in bytes
    pub len: u64,
    /// User-defined metadata
    pub metadata: Metadata,
}

/// Operations the mover needs from an object store.
///
/// Every call addresses one blob through a [`BlobLocation`]. Content and metadata calls use
/// the flat endpoint; access control calls use the namespace-aware endpoint. A missing blob or
/// path is reported as [`NotFound`](crate::error::ErrorKind::NotFound); every other failure as
/// [`BackendUnavailable`](crate::error::ErrorKind::BackendUnavailable).
///
/// Dropping a returned future abandons the request.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Create or replace a blob with `body` in a single request
    async fn put_blob(
        &self,
        location: &BlobLocation,
        body: Bytes,
        metadata: &Metadata,
    ) -> Result<(), Error>;

    /// Upload one uncommitted block. Staged blocks are invisible until committed.
    async fn stage_block(
        &self,
        location: &BlobLocation,
        block_id: &BlockId,
        body: Bytes,
    ) -> Result<(), Error>;

    /// Commit previously staged blocks, in the given order, as the blob's content
    async fn commit_block_list(
        &self,
        location: &BlobLocation,
        blocks: &[BlockId],
        metadata: &Metadata,
    ) -> Result<(), Error>;

    /// Read the length and metadata of a blob
    async fn get_properties(&self, location: &BlobLocation) -> Result<BlobProperties, Error>;

    /// Read `length` bytes starting at `offset`
    async fn get_blob_range(
        &self,
        location: &BlobLocation,
        offset: u64,
        length: u64,
    ) -> Result<Bytes, Error>;

    /// Delete a blob together with all of its snapshots
    async fn delete_blob(&self, location: &BlobLocation) -> Result<(), Error>;

    /// Read the native ACL of a path
    async fn get_access_control(&self, location: &BlobLocation) -> Result<AccessControl, Error>;

    /// Replace the native ACL of a path
    async fn set_access_control(
        &self,
        location: &BlobLocation,
        access_control: &AccessControl,
    ) -> Result<(), Error>;
}
