/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::error::Error;
use crate::operation::archive::builders::ArchiveFluentBuilder;
use crate::operation::remove::builders::RemoveFluentBuilder;
use crate::operation::restore::builders::RestoreFluentBuilder;
use crate::path::PathMapper;
use crate::runtime::pacer::Pacer;
use crate::store::http::AzureBlobStore;
use crate::store::BlobStore;
use crate::Config;

/// Mover client for archiving, restoring and removing files
///
/// Client is internally reference-counted and can be freely cloned.
///
/// # Examples
///
/// Archive, then remove, against an in-memory container
///
/// ```no_run
/// use std::sync::Arc;
/// use hsm_blob_mover::store::in_memory::InMemoryBlobStore;
///
/// # async fn example() -> Result<(), hsm_blob_mover::error::Error> {
/// let config = hsm_blob_mover::Config::builder()
///     .account_name("hsmacct")
///     .container_name("archive")
///     .mount_root("/mnt/fs")
///     .build()?;
/// let client = hsm_blob_mover::Client::with_store(config, Arc::new(InMemoryBlobStore::new()))?;
///
/// client.archive().object_name("a/b/file.txt").send().await?;
/// client.remove().object_name("a/b/file.txt").send().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    handle: Arc<Handle>,
}

/// Whatever is needed to carry out operations, e.g. the store client, config, etc
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) config: Config,
    pub(crate) store: Arc<dyn BlobStore>,
    pub(crate) mapper: PathMapper,
}

impl Handle {
    /// Number of concurrent block transfers per operation
    pub(crate) fn num_workers(&self) -> usize {
        self.config.num_workers()
    }

    /// Block size in bytes
    pub(crate) fn block_size(&self) -> u64 {
        self.config.block_size_bytes()
    }

    pub(crate) fn pacer(&self) -> &Pacer {
        self.config.pacer()
    }

    pub(crate) fn store(&self) -> &dyn BlobStore {
        self.store.as_ref()
    }
}

impl Client {
    /// Creates a new client talking to the Azure endpoints named by `config`
    pub fn new(config: Config) -> Result<Client, Error> {
        Self::with_store(config, Arc::new(AzureBlobStore::new()?))
    }

    /// Creates a new client using an explicit store backend
    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Result<Client, Error> {
        let mapper = PathMapper::new(&config)?;
        let handle = Handle {
            config,
            store,
            mapper,
        };
        Ok(Client {
            handle: Arc::new(handle),
        })
    }

    /// Returns the client's configuration
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Returns the path mapper used to address blobs
    pub fn path_mapper(&self) -> &PathMapper {
        &self.handle.mapper
    }

    /// Archive a single file from the mount into the container.
    ///
    /// Every ancestor directory of the object name is first replicated as a placeholder blob.
    ///
    /// # Examples
    /// ```no_run
    /// # async fn example(client: &hsm_blob_mover::Client) -> Result<(), hsm_blob_mover::error::Error> {
    /// let output = client
    ///     .archive()
    ///     .object_name("projects/alpha/results.dat")
    ///     .send()
    ///     .await?;
    ///
    /// if let Some(err) = output.acl_degradation() {
    ///     eprintln!("content archived but ACL not applied: {err}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn archive(&self) -> ArchiveFluentBuilder {
        ArchiveFluentBuilder::new(self.handle.clone())
    }

    /// Delete a previously archived object, including its snapshots.
    pub fn remove(&self) -> RemoveFluentBuilder {
        RemoveFluentBuilder::new(self.handle.clone())
    }

    /// Download a previously archived object back into the mount.
    pub fn restore(&self) -> RestoreFluentBuilder {
        RestoreFluentBuilder::new(self.handle.clone())
    }
}
